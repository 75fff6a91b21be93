//! The CPU's runtime error taxonomy. Every step-time failure the core can
//! raise is one of these — assembler/lexer errors live in `austro-asm` and
//! never appear here.

use std::fmt;

use crate::memory::AddressOutOfRange;
use crate::register::RegisterWordError;

/// An error raised while stepping the CPU. Any of these moves the CPU to
/// `Stage::Stopped`; the caller sees it returned from the `step()` call that
/// raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuError {
    /// A memory access fell outside `[0, ADDRESS_SPACE)`.
    AddressOutOfRange { address: usize },
    /// `PC` itself ran past the end of the address space at fetch time.
    PcOutOfRange { pc: usize },
    /// `Cpu::load` was asked to place more words than fit before the end of
    /// memory.
    LoadBlockTooLarge { start: usize, len: usize },
    /// An ALU division or modulo saw a zero divisor.
    ArithmeticError,
    /// `set_word` targeted a register narrower than the word it was given.
    RegisterWordReadOnly,
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CpuError::AddressOutOfRange { address } => {
                write!(f, "address {} is out of range", address)
            }
            CpuError::PcOutOfRange { pc } => {
                write!(f, "PC register ({}) is greater than the address space", pc)
            }
            CpuError::LoadBlockTooLarge { start, len } => write!(
                f,
                "tried to load {} words at offset {}, past the end of memory",
                len, start
            ),
            CpuError::ArithmeticError => write!(f, "division or modulo by zero"),
            CpuError::RegisterWordReadOnly => {
                write!(f, "word data too large for the destination register")
            }
        }
    }
}

impl std::error::Error for CpuError {}

impl From<AddressOutOfRange> for CpuError {
    fn from(err: AddressOutOfRange) -> CpuError {
        CpuError::AddressOutOfRange {
            address: err.address,
        }
    }
}

impl From<RegisterWordError> for CpuError {
    fn from(_: RegisterWordError) -> CpuError {
        CpuError::RegisterWordReadOnly
    }
}

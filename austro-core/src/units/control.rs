//! Control Unit: `NOP`, `HALT`, `MOV`, every jump, and the synthetic
//! `UC_LOAD` action the STORE stage uses to write a computed result back
//! into a register.

use crate::opcodes;
use crate::register::{RegisterFile, RegisterId};

/// Synthetic operation code the STORE stage invokes through [`load`]; not
/// reachable from assembly, since no opcode field is wide enough to encode
/// it (it's chosen well past the 5-bit opcode range).
pub const UC_LOAD: u16 = 128;

/// What happened when the Control Unit ran one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Neither a jump nor a halt — the driver's generic post-EXECUTE logic
    /// decides whether to advance `PC` and go to FETCH or STORE.
    Continue,
    /// `PC` was set to the branch target; the driver goes straight to
    /// FETCH without its own `PC` increment.
    Jumped,
    /// `HALT` executed; the driver stops here.
    Halted,
}

/// Runs one Control Unit instruction. `operation` is the raw opcode (unlike
/// the ALU/Shift units, the Control Unit needs no extra packed bits).
pub fn execute(
    operation: u16,
    op1: Option<usize>,
    op2: Option<usize>,
    registers: &mut RegisterFile,
) -> Outcome {
    let opcode = operation as u8;

    if opcode == opcodes::HALT {
        return Outcome::Halted;
    }

    if opcode == opcodes::MOV {
        if let (Some(dst), Some(src)) = (op1, op2) {
            let value = registers.get(src);
            registers.set(dst, value);
        }
        return Outcome::Continue;
    }

    let n = registers.get(RegisterId::N.index()) == 1;
    let z = registers.get(RegisterId::Z.index()) == 1;
    let v = registers.get(RegisterId::V.index()) == 1;
    let t = registers.get(RegisterId::T.index()) == 1;

    let condition = if opcode == opcodes::JZ {
        Some(z)
    } else if opcode == opcodes::JNZ {
        Some(!z)
    } else if opcode == opcodes::JN {
        Some(n)
    } else if opcode == opcodes::JP {
        Some(!z && !n)
    } else if opcode == opcodes::JGE {
        // JLE shares this opcode and would otherwise read `z || n`; see
        // opcodes::JGE's doc comment for why only one condition survives.
        Some(!n)
    } else if opcode == opcodes::JV {
        Some(v)
    } else if opcode == opcodes::JT {
        Some(t)
    } else if opcode == opcodes::JMP {
        Some(true)
    } else {
        None
    };

    match condition {
        Some(true) => {
            if let Some(target_reg) = op1 {
                let target = registers.get(target_reg);
                registers.set(RegisterId::PC.index(), target);
            }
            Outcome::Jumped
        }
        // Untaken branch, NOP, or an undefined opcode in the Control
        // Unit's range: no-op.
        Some(false) | None => Outcome::Continue,
    }
}

/// Writes `value` into register `index`, as the STORE stage's `UC_LOAD`
/// does for the ALU/Shift units' results.
pub fn load(registers: &mut RegisterFile, index: usize, value: u16) {
    registers.set(index, value);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn halt_reports_halted() {
        let mut regs = RegisterFile::new();
        assert_eq!(
            execute(u16::from(opcodes::HALT), None, None, &mut regs),
            Outcome::Halted
        );
    }

    #[test]
    fn mov_copies_directly_and_continues() {
        let mut regs = RegisterFile::new();
        regs.set(RegisterId::BX.index(), 42);
        let outcome = execute(
            u16::from(opcodes::MOV),
            Some(RegisterId::AX.index()),
            Some(RegisterId::BX.index()),
            &mut regs,
        );
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(regs.get(RegisterId::AX.index()), 42);
    }

    #[test]
    fn taken_jump_sets_pc_from_target_register() {
        let mut regs = RegisterFile::new();
        regs.set(RegisterId::Z.index(), 1);
        regs.set(RegisterId::AX.index(), 4);
        let outcome = execute(
            u16::from(opcodes::JZ),
            Some(RegisterId::AX.index()),
            None,
            &mut regs,
        );
        assert_eq!(outcome, Outcome::Jumped);
        assert_eq!(regs.get(RegisterId::PC.index()), 4);
    }

    #[test]
    fn untaken_jump_continues_without_touching_pc() {
        let mut regs = RegisterFile::new();
        regs.set(RegisterId::PC.index(), 10);
        let outcome = execute(
            u16::from(opcodes::JZ),
            Some(RegisterId::AX.index()),
            None,
            &mut regs,
        );
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(regs.get(RegisterId::PC.index()), 10);
    }
}

//! Translates the instruction word latched in `RI` into a [`Decode`] record
//! the CPU driver's EXECUTE/STORE stages can act on, without itself
//! knowing how to execute anything.
//!
//! Decoding has side effects: operand shapes other than `reg, reg` walk the
//! next memory word through `MAR`/`MBR`/`TMP` exactly as the fetch stage
//! does, so by the time decoding finishes those scratch registers (and
//! `PC`, which is nudged forward and restored around the indirect read)
//! hold the values EXECUTE and STORE expect to find.

use crate::error::CpuError;
use crate::memory::Memory;
use crate::opcodes::{self, ArgType};
use crate::register::{RegisterFile, RegisterId, TMP_INDEX};
use crate::word::Word;

const PC: usize = RegisterId::PC as usize;
const MAR: usize = RegisterId::MAR as usize;
const MBR: usize = RegisterId::MBR as usize;

/// Which execution unit a decoded instruction dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Alu,
    Uc,
    Shift,
}

/// What the STORE stage should do with the computed result, if anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Store {
    /// No writeback (jumps, `NOP`, `CMP`, and any instruction whose unit
    /// already wrote its result directly during EXECUTE).
    None,
    /// Write the result into register `op1` via the synthetic `UC_LOAD`
    /// operation.
    Register,
    /// Write the result into this memory address, in addition to (for
    /// non-UC units) the `UC_LOAD` register write.
    Address(usize),
}

/// The decoded form of one instruction, ready for EXECUTE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decode {
    pub unit: Unit,
    pub operation: u16,
    pub op1: Option<usize>,
    pub op2: Option<usize>,
    pub store: Store,
}

/// Reads the word one past `registers[PC]` through `MAR`/`MBR`, as the
/// fetch stage does, leaving `PC` restored to `MAR` afterward. Returns the
/// raw value that landed in `MBR`.
fn fetch_next_word(registers: &mut RegisterFile, memory: &Memory) -> Result<u16, CpuError> {
    registers.set(PC, registers.get(PC).wrapping_add(1));
    registers.set(MAR, registers.get(PC));
    let value = memory.get(registers.get(MAR) as usize)?;
    registers.set(MBR, value);
    Ok(value)
}

/// Reads `memory[address]` into `TMP` through a `PC`/`MAR` save-and-restore
/// dance, reusing the fetch machinery for indirect operand resolution.
/// Returns the value read.
fn fetch_indirect(
    registers: &mut RegisterFile,
    memory: &Memory,
    address: u16,
) -> Result<u16, CpuError> {
    registers.set(MAR, registers.get(PC));
    registers.set(PC, address);
    let value = memory.get(registers.get(PC) as usize)?;
    registers.set(TMP_INDEX, value);
    registers.set(PC, registers.get(MAR));
    Ok(value)
}

/// Decodes the instruction word in `ri`, mutating `registers` as indirect
/// operand fetches require.
pub fn decode(ri: Word, registers: &mut RegisterFile, memory: &Memory) -> Result<Decode, CpuError> {
    // Raw, untagged field extraction: a program that runs off its own code
    // into untouched memory still has to decode *something* there, and
    // that word was never marked an instruction.
    let opcode = ri.raw_opcode();
    let flags = ri.raw_flags();
    let operand = ri.raw_operand();
    let argtype = opcodes::arg_type(opcode);

    let mut op1 = None;
    let mut op2 = None;
    let mut store = Store::None;

    match argtype {
        ArgType::DstOri | ArgType::Op1Op2 => {
            store = Store::Register;
            let order = flags & 0b011;
            if order == 0 {
                op1 = Some((operand >> 4) as usize);
                op2 = Some((operand & 0b1111) as usize);
            } else {
                let mbr = fetch_next_word(registers, memory)?;
                match order {
                    1 => {
                        // reg, [addr]
                        op1 = Some((operand >> 4) as usize);
                        fetch_indirect(registers, memory, mbr)?;
                        op2 = Some(TMP_INDEX);
                    }
                    2 => {
                        // reg, imm
                        op1 = Some((operand >> 4) as usize);
                        op2 = Some(MBR);
                    }
                    _ => {
                        // [addr], reg
                        op2 = Some((operand >> 4) as usize);
                        fetch_indirect(registers, memory, mbr)?;
                        op1 = Some(TMP_INDEX);
                        store = Store::Address(mbr as usize);
                    }
                }
            }
        }
        ArgType::OpQnt => {
            let order = flags & 0b001;
            if order == 0 {
                op1 = Some((operand >> 4) as usize);
                store = Store::Register;
            } else {
                fetch_indirect(registers, memory, u16::from(operand))?;
                op1 = Some(TMP_INDEX);
                store = Store::Address(operand as usize);
            }
            fetch_next_word(registers, memory)?;
            op2 = Some(MBR);
        }
        ArgType::Jump => {
            let order = flags & 0b011;
            match order {
                0 => op1 = Some((operand >> 4) as usize),
                1 => {
                    fetch_indirect(registers, memory, u16::from(operand))?;
                    op1 = Some(TMP_INDEX);
                }
                2 => {
                    registers.set(TMP_INDEX, u16::from(operand));
                    op1 = Some(TMP_INDEX);
                }
                _ => {}
            }
        }
        ArgType::Op => {
            let order = flags & 0b001;
            if order == 0 {
                op1 = Some((operand >> 4) as usize);
                store = Store::Register;
            } else {
                fetch_indirect(registers, memory, u16::from(operand))?;
                op1 = Some(TMP_INDEX);
                store = Store::Address(operand as usize);
            }
        }
        ArgType::NoArg => {}
    }

    let (unit, operation) = if opcode == opcodes::SHR || opcode == opcodes::SHL {
        let is_8bit = op1.map(|idx| idx < 8).unwrap_or(false);
        (Unit::Shift, (u16::from(opcode) << 1) | u16::from(is_8bit))
    } else if opcode >= 16 {
        let signed = (flags & 0b100) >> 2;
        let is_8bit = op1.map(|idx| idx < 8).unwrap_or(false);
        let alu_flags = (u16::from(is_8bit) << 1) | u16::from(signed);
        (Unit::Alu, (u16::from(opcode) << 2) | alu_flags)
    } else {
        if store == Store::Register {
            store = Store::None;
        }
        (Unit::Uc, u16::from(opcode))
    };

    Ok(Decode {
        unit,
        operation,
        op1,
        op2,
        store,
    })
}

//! Arithmetic and Logic Unit: the twelve opcodes with `opcode >= 16`.
//!
//! `operation` packs `opcode<<2 | is_8bit<<1 | signed`, exactly as the
//! decoder produces it, so the unit never needs to see the instruction word
//! itself — only the two operand values already pulled out of the register
//! file.

use crate::error::CpuError;
use crate::opcodes;
use crate::register::{RegisterFile, RegisterId};

fn overflowed(result: i64, bits: u32) -> bool {
    (result >> bits) != 0
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

/// Runs one ALU operation, applying flag side effects directly to
/// `registers` and returning the computed result — or `None` for `CMP`,
/// which never writes one back (`store` is cleared by the caller whenever
/// it sees `None`, the shared "no writeback" signal).
///
/// # Errors
/// `DIV`/`MOD` (and their signed aliases) fail with
/// [`CpuError::ArithmeticError`] on a zero divisor.
pub fn compute(
    operation: u16,
    in1: u16,
    in2: u16,
    registers: &mut RegisterFile,
) -> Result<Option<i64>, CpuError> {
    let opcode = (operation >> 2) as u8;
    let bits: u32 = if operation & 0b10 != 0 { 8 } else { 16 };
    let signed = operation & 0b1 != 0;
    let mask: i64 = if bits == 8 { 0xFF } else { 0xFFFF };

    let (a, b): (i64, i64) = if signed {
        if bits == 8 {
            (in1 as u8 as i8 as i64, in2 as u8 as i8 as i64)
        } else {
            (in1 as i16 as i64, in2 as i16 as i64)
        }
    } else {
        (i64::from(in1), i64::from(in2))
    };

    let v_index = RegisterId::V.index();
    let n_index = RegisterId::N.index();
    let z_index = RegisterId::Z.index();
    let t_index = RegisterId::T.index();
    let sp_index = RegisterId::SP.index();

    let result: Option<i64> = match opcode {
        opcodes::OR => Some(a | b),
        opcodes::AND => Some(a & b),
        opcodes::NOT => Some(!a),
        opcodes::XOR => Some(a ^ b),
        opcodes::INC => {
            let r = a + 1;
            registers.set(v_index, u16::from(overflowed(r, bits)));
            Some(r)
        }
        opcodes::DEC => {
            let r = a - 1;
            registers.set(v_index, u16::from(overflowed(r, bits)));
            Some(r)
        }
        opcodes::ADD => {
            let r = a + b;
            registers.set(v_index, u16::from(overflowed(r, bits)));
            Some(r)
        }
        opcodes::SUB => {
            let r = a - b;
            registers.set(v_index, u16::from(overflowed(r, bits)));
            Some(r)
        }
        opcodes::MUL => {
            let r = a * b;
            if !signed {
                let transport = r >> bits;
                let t = transport > 0;
                registers.set(t_index, u16::from(t));
                if t {
                    registers.set(sp_index, transport as u16);
                }
            } else {
                registers.set(n_index, u16::from(r < 0));
                registers.set(v_index, u16::from(overflowed(r, bits)));
            }
            Some(r)
        }
        opcodes::DIV => {
            if b == 0 {
                return Err(CpuError::ArithmeticError);
            }
            let r = floor_div(a, b);
            if signed {
                registers.set(n_index, u16::from(r < 0));
            }
            Some(r)
        }
        opcodes::MOD => {
            if b == 0 {
                return Err(CpuError::ArithmeticError);
            }
            let r = floor_mod(a, b);
            if signed {
                registers.set(n_index, u16::from(r < 0));
            }
            Some(r)
        }
        opcodes::CMP => {
            let t = a - b;
            registers.set(n_index, u16::from(t < 0));
            registers.set(z_index, u16::from(t == 0));
            None
        }
        // Any other bit pattern in the ALU's opcode range is not a defined
        // instruction; it behaves as a no-op.
        _ => None,
    };

    if let Some(r) = result {
        registers.set(z_index, u16::from((r & mask) == 0));
    }

    Ok(result)
}

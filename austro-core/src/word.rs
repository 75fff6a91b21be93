//! The 16-bit [`Word`] shared by main memory, registers and the assembler's
//! output stream.
//!
//! A word is either an *instruction* word, bit-packed as
//! `opcode:5 | flags:3 | operand:8` (opcode in the high bits), or a *data*
//! word holding an opaque `u16`. Both modes are backed by the same 16-bit
//! cell so a word can always be read back as a raw value regardless of how
//! it is currently tagged — the decoder relies on this when it walks past an
//! instruction to fetch an immediate or address that follows it in memory.

use crate::constants::{FLAGS_MASK, FLAGS_OFFSET, OPCODE_MASK, OPCODE_OFFSET, OPERAND_MASK};

/// A 16-bit memory or register cell, optionally tagged as holding an
/// instruction.
///
/// `opcode`/`flags`/`operand` are only meaningful when [`Word::is_instruction`]
/// is `true` — reading them on a data word is a logic error and panics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Word {
    value: u16,
    is_instruction: bool,
    lineno: u32,
}

impl Word {
    /// Builds a data word from a raw 16-bit value.
    pub fn data(value: u16) -> Word {
        Word {
            value,
            is_instruction: false,
            lineno: 0,
        }
    }

    /// Builds an instruction word from its three fields and the source line
    /// it was assembled from (`0` if unknown).
    pub fn instruction(opcode: u8, flags: u8, operand: u8, lineno: u32) -> Word {
        let value = (u16::from(opcode & OPCODE_MASK as u8) << OPCODE_OFFSET)
            | (u16::from(flags & FLAGS_MASK as u8) << FLAGS_OFFSET)
            | u16::from(operand);
        Word {
            value,
            is_instruction: true,
            lineno,
        }
    }

    /// The word's raw 16-bit value, valid regardless of its tag.
    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn is_instruction(&self) -> bool {
        self.is_instruction
    }

    pub fn set_is_instruction(&mut self, is_instruction: bool) {
        self.is_instruction = is_instruction;
    }

    /// Source line this word was assembled from, or `0` if unknown.
    pub fn lineno(&self) -> u32 {
        self.lineno
    }

    pub fn set_lineno(&mut self, lineno: u32) {
        self.lineno = lineno;
    }

    /// Sets the raw value without touching the tag, as a plain data store
    /// to this cell (`mem[addr] = value`) does.
    pub fn set_value(&mut self, value: u16) {
        self.value = value;
    }

    /// # Panics
    /// Panics if this word is not tagged as an instruction.
    pub fn opcode(&self) -> u8 {
        assert!(self.is_instruction, "word is not an instruction");
        self.raw_opcode()
    }

    /// # Panics
    /// Panics if this word is not tagged as an instruction.
    pub fn flags(&self) -> u8 {
        assert!(self.is_instruction, "word is not an instruction");
        self.raw_flags()
    }

    /// # Panics
    /// Panics if this word is not tagged as an instruction.
    pub fn operand(&self) -> u8 {
        assert!(self.is_instruction, "word is not an instruction");
        self.raw_operand()
    }

    /// Extracts the opcode bit field regardless of the word's tag. The
    /// decoder uses this instead of [`Word::opcode`]: a program that falls
    /// off the end of its code into untouched memory still has *some* bit
    /// pattern sitting in `RI`, tagged or not, and decoding it should never
    /// panic just because nothing ever marked that word an instruction.
    pub fn raw_opcode(&self) -> u8 {
        ((self.value >> OPCODE_OFFSET) & OPCODE_MASK) as u8
    }

    /// See [`Word::raw_opcode`].
    pub fn raw_flags(&self) -> u8 {
        ((self.value >> FLAGS_OFFSET) & FLAGS_MASK) as u8
    }

    /// See [`Word::raw_opcode`].
    pub fn raw_operand(&self) -> u8 {
        (self.value & OPERAND_MASK) as u8
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instruction_round_trip() {
        let word = Word::instruction(0b10110, 0b101, 0b1010_0110, 7);
        assert_eq!(word.opcode(), 0b10110);
        assert_eq!(word.flags(), 0b101);
        assert_eq!(word.operand(), 0b1010_0110);
        assert_eq!(word.lineno(), 7);
    }

    #[test]
    fn instruction_bit_layout_packs_opcode_flags_operand_in_order() {
        // opcode in bits 15-11, flags in bits 10-8, operand in bits 7-0.
        let word = Word::instruction(0b00001, 0b010, 0b0000_0011, 0);
        assert_eq!(word.value(), 0b00001_010_00000011);
    }

    #[test]
    fn data_word_keeps_raw_value() {
        let word = Word::data(0xBEEF);
        assert!(!word.is_instruction());
        assert_eq!(word.value(), 0xBEEF);
    }

    #[test]
    #[should_panic]
    fn opcode_of_data_word_panics() {
        Word::data(0).opcode();
    }

    #[test]
    fn value_fits_in_16_bits_for_any_fields() {
        for opcode in [0u8, 0b11111] {
            for flags in [0u8, 0b111] {
                for operand in [0u8, 0xFF] {
                    let word = Word::instruction(opcode, flags, operand, 0);
                    assert_eq!(word.opcode(), opcode);
                    assert_eq!(word.flags(), flags);
                    assert_eq!(word.operand(), operand);
                }
            }
        }
    }
}

//! Assembler for the Austro 16-bit processor's assembly language.
//!
//! The main entry point is [`assemble`], which accepts a program written in
//! Austro assembly and returns an [`Assembled`] image: a flat sequence of
//! [`Word`](austro_core::Word)s ready to hand to
//! [`austro_core::Cpu::load`], plus the label table that produced it. There
//! is no separate `.data`/`.instructions` split — a program is a flat list
//! of statements, and any position can be named with a label for later
//! statements to jump to.
//!
//! # Syntax
//!
//! A line is either empty, a comment (`#` to end of line), a label
//! definition, or one instruction. Labels and instructions may also share a
//! line (`loop: add ax, 2`).
//!
//! ```text
//! loop:
//!     add ax, 2
//!     inc bx
//!     cmp bx, 5
//!     jnz loop
//!     halt
//! ```
//!
//! ## Labels
//!
//! `name:` binds `name` to the address of the word that follows it.
//! Forward references are allowed — a jump may name a label defined later
//! in the source — since the whole source is tokenized and every label's
//! address is known before any jump operand is resolved. A label name may
//! contain `.` in addition to the identifier charset below (`loop.body:`);
//! every other identifier may not.
//!
//! ## Registers
//!
//! The sixteen assembly-visible registers (`al ah bl bh cl ch dl dh ax bx
//! cx dx sp bp si di`, case-insensitive) name themselves directly, with no
//! sigil — `mov ax, bx`, not `mov $ax, $bx`. `pc`, `ri`, `mar`, `mbr` and
//! the flag registers are CPU-internal and cannot be named from assembly.
//!
//! ## Operands
//!
//! - A bare register name: `ax`.
//! - A numeric literal: decimal, `0x` hex, `0o` octal, a legacy leading-zero
//!   octal (`017`), or `0b` binary, optionally `-`-prefixed.
//! - A `[address]` memory reference, e.g. `mov [128], ax`.
//! - For jump mnemonics only, a label name, resolved to the address it was
//!   bound to.
//!
//! ## Instructions
//!
//! Each mnemonic and its accepted operand shapes are listed in
//! [`austro_core::opcodes`]; `I`-prefixed variants (`iadd`, `isub`, `imul`,
//! `idiv`, `imod`, `icmp`) select the signed form of the same opcode. `je`
//! and `jz` assemble identically, as do `jne`/`jnz`, `jlt`/`jn`, `jgt`/`jp`
//! and `jge`/`jle` — see [`austro_core::opcodes::lookup`] for the full
//! alias table.

pub mod assembler;
pub mod error;
pub mod lexer;

pub use assembler::Assembled;
pub use error::Error;

/// Tokenizes and assembles `source` into a flat sequence of words and a
/// label table.
///
/// Assembly fails on the first lexical or assembly error encountered; there
/// is no error recovery.
pub fn assemble(source: &str) -> Result<Assembled, Error> {
    let tokens = lexer::tokenize(source)?;
    let assembled = assembler::assemble_tokens(tokens)?;
    Ok(assembled)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_the_count_up_loop_example() {
        let program = "\
            mov ax, 0xffff\n\
            mov bx, 0\n\
            loop:\n\
            add ax, 2\n\
            inc bx\n\
            cmp bx, 5\n\
            jnz loop\n\
            halt\n\
        ";
        let assembled = assemble(program).unwrap();
        assert_eq!(assembled.labels.get("loop"), Some(&4));
        assert!(assembled.words.last().unwrap().is_instruction());
    }

    #[test]
    fn count_up_loop_runs_to_completion_through_the_resolved_jump() {
        // Unlike austro-core's own hand-encoded cpu.rs tests, this feeds a
        // real assembled program through the CPU, so the resolved label's
        // immediate-jump encoding (flags 0b010, decoder's `order == 2`) gets
        // exercised end-to-end instead of only the register-form jump shape.
        let program = "\
            mov ax, 0xffff\n\
            mov bx, 0\n\
            loop:\n\
            add ax, 2\n\
            inc bx\n\
            cmp bx, 5\n\
            jnz loop\n\
            halt\n\
        ";
        let assembled = assemble(program).unwrap();

        let mut cpu = austro_core::Cpu::new();
        cpu.load(&assembled.words, 0).unwrap();
        assert!(cpu.start().unwrap());

        assert_eq!(cpu.registers().get(austro_core::RegisterId::AX.index()), 9);
        assert_eq!(cpu.registers().get(austro_core::RegisterId::BX.index()), 5);
        assert_eq!(cpu.registers().get(austro_core::RegisterId::Z.index()), 1);
    }

    #[test]
    fn reports_the_line_of_a_lexical_error() {
        let err = assemble("mov ax, 1\n$bad").unwrap_err();
        match err {
            Error::Lexer(e) => assert_eq!(e.line, 2),
            Error::Assemble(_) => panic!("expected a lexer error"),
        }
    }

    #[test]
    fn reports_the_line_of_an_assembly_error() {
        let err = assemble("nop\njmp nowhere").unwrap_err();
        match err {
            Error::Assemble(e) => assert_eq!(e.line(), 2),
            Error::Lexer(_) => panic!("expected an assemble error"),
        }
    }
}

//! Turns a token stream into a sequence of [`Word`]s plus a label table.
//!
//! Label binding and word emission both happen in one forward pass over
//! the tokens. The one place that can't be resolved in a single pass is a
//! jump whose `NAME` operand isn't a register: it might name a label
//! defined later in the source, so such a jump is emitted as a
//! placeholder immediate-target word and noted in `deferred`; once the
//! whole source has been walked and the label table is complete, a short
//! second pass patches each placeholder's operand in from the final
//! table: resolve after emission, using the final label map.

use std::collections::HashMap;

use austro_core::opcodes::{self, ArgType};
use austro_core::register::parse_register_name;
use austro_core::word::Word;

use crate::error::AssembleError;
use crate::lexer::{Token, TokenKind};

/// The output of [`crate::assemble`]: the assembled memory image and the
/// label table that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembled {
    pub words: Vec<Word>,
    pub labels: HashMap<String, u16>,
}

struct Deferred {
    word_index: usize,
    label: String,
    line: u32,
}

pub fn assemble_tokens(tokens: Vec<Token>) -> Result<Assembled, AssembleError> {
    let mut labels: HashMap<String, u16> = HashMap::new();
    let mut words: Vec<Word> = Vec::new();
    let mut deferred: Vec<Deferred> = Vec::new();
    let mut pending_labels: Vec<(String, u32)> = Vec::new();

    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        match token.kind {
            TokenKind::Label(name) => pending_labels.push((name, token.line)),
            TokenKind::Opcode(mnemonic) => {
                bind_pending_labels(&mut pending_labels, &mut labels, words.len())?;

                let mut operand_tokens = Vec::new();
                while let Some(next) = iter.peek() {
                    match next.kind {
                        TokenKind::Label(_) | TokenKind::Opcode(_) => break,
                        _ => operand_tokens.push(iter.next().unwrap()),
                    }
                }

                encode_statement(&mnemonic, token.line, operand_tokens, &mut words, &mut deferred)?;
            }
            TokenKind::Name(name) => {
                return Err(AssembleError::InvalidInstruction {
                    name,
                    line: token.line,
                })
            }
            TokenKind::Number(_) | TokenKind::Reference(_) | TokenKind::Comma => {
                return Err(AssembleError::InvalidSyntax { line: token.line })
            }
        }
    }

    if let Some((_, line)) = pending_labels.first() {
        return Err(AssembleError::InvalidSyntax { line: *line });
    }

    for item in deferred {
        let addr = labels
            .get(&item.label)
            .copied()
            .ok_or_else(|| AssembleError::UndefinedLabel {
                name: item.label.clone(),
                line: item.line,
            })?;
        let word = words[item.word_index];
        words[item.word_index] =
            Word::instruction(word.opcode(), word.flags(), addr as u8, word.lineno());
    }

    Ok(Assembled { words, labels })
}

fn bind_pending_labels(
    pending: &mut Vec<(String, u32)>,
    labels: &mut HashMap<String, u16>,
    address: usize,
) -> Result<(), AssembleError> {
    for (name, line) in pending.drain(..) {
        if labels.contains_key(&name) {
            return Err(AssembleError::DuplicateLabel { name, line });
        }
        labels.insert(name, address as u16);
    }
    Ok(())
}

/// Validates comma placement among a statement's raw operand tokens and
/// returns the 0, 1 or 2 actual operand tokens (commas stripped).
fn split_operands(line: u32, raw: Vec<Token>) -> Result<Vec<Token>, AssembleError> {
    match raw.len() {
        0 => Ok(Vec::new()),
        1 => {
            if matches!(raw[0].kind, TokenKind::Comma) {
                Err(AssembleError::InvalidSyntax { line })
            } else {
                Ok(raw)
            }
        }
        2 => {
            if matches!(raw[0].kind, TokenKind::Comma) || matches!(raw[1].kind, TokenKind::Comma) {
                Err(AssembleError::InvalidSyntax { line })
            } else {
                Err(AssembleError::MissingComma { line })
            }
        }
        3 => {
            if matches!(raw[1].kind, TokenKind::Comma)
                && !matches!(raw[0].kind, TokenKind::Comma)
                && !matches!(raw[2].kind, TokenKind::Comma)
            {
                Ok(vec![raw[0].clone(), raw[2].clone()])
            } else {
                Err(AssembleError::InvalidSyntax { line })
            }
        }
        _ => Err(AssembleError::InvalidSyntax { line }),
    }
}

fn reg_index(name: &str, line: u32) -> Result<u8, AssembleError> {
    parse_register_name(name)
        .map(|id| id.index() as u8)
        .map_err(|_| AssembleError::BadRegister {
            name: name.to_string(),
            line,
        })
}

fn encode_statement(
    mnemonic: &str,
    line: u32,
    raw_operands: Vec<Token>,
    words: &mut Vec<Word>,
    deferred: &mut Vec<Deferred>,
) -> Result<(), AssembleError> {
    let (opcode, signed) = opcodes::lookup(mnemonic).expect("lexer only emits recognized mnemonics");
    let operands = split_operands(line, raw_operands)?;
    let missing = || AssembleError::MissingOperand {
        mnemonic: mnemonic.to_string(),
        line,
    };
    let invalid = || AssembleError::InvalidOperandForOpcode {
        mnemonic: mnemonic.to_string(),
        line,
    };

    match opcodes::arg_type(opcode) {
        ArgType::NoArg => {
            if !operands.is_empty() {
                return Err(invalid());
            }
            words.push(Word::instruction(opcode, 0, 0, line));
        }
        ArgType::Jump => {
            let op1 = operands.first().ok_or_else(missing)?;
            if operands.len() > 1 {
                return Err(invalid());
            }
            match &op1.kind {
                TokenKind::Name(name) => {
                    if let Ok(reg) = reg_index(name, line) {
                        words.push(Word::instruction(opcode, 0b000, reg << 4, line));
                    } else {
                        let word_index = words.len();
                        words.push(Word::instruction(opcode, 0b010, 0, line));
                        deferred.push(Deferred {
                            word_index,
                            label: name.clone(),
                            line,
                        });
                    }
                }
                TokenKind::Reference(addr) => {
                    words.push(Word::instruction(opcode, 0b001, *addr as u8, line));
                }
                TokenKind::Number(imm) => {
                    words.push(Word::instruction(opcode, 0b010, *imm as u8, line));
                }
                _ => return Err(invalid()),
            }
        }
        ArgType::Op => {
            let op1 = operands.first().ok_or_else(missing)?;
            if operands.len() > 1 {
                return Err(invalid());
            }
            match &op1.kind {
                TokenKind::Name(name) => {
                    let reg = reg_index(name, line)?;
                    words.push(Word::instruction(opcode, 0b000, reg << 4, line));
                }
                TokenKind::Reference(addr) => {
                    words.push(Word::instruction(opcode, 0b001, *addr as u8, line));
                }
                _ => return Err(invalid()),
            }
        }
        ArgType::OpQnt => {
            if operands.len() < 2 {
                return Err(missing());
            }
            if operands.len() > 2 {
                return Err(invalid());
            }
            let quantity = match &operands[1].kind {
                TokenKind::Number(n) => *n,
                _ => return Err(invalid()),
            };
            match &operands[0].kind {
                TokenKind::Name(name) => {
                    let reg = reg_index(name, line)?;
                    words.push(Word::instruction(opcode, 0b000, reg << 4, line));
                }
                TokenKind::Reference(addr) => {
                    words.push(Word::instruction(opcode, 0b001, *addr as u8, line));
                }
                _ => return Err(invalid()),
            }
            words.push(Word::data(quantity as u16));
        }
        ArgType::DstOri | ArgType::Op1Op2 => {
            if operands.len() < 2 {
                return Err(missing());
            }
            if operands.len() > 2 {
                return Err(invalid());
            }
            let signed_bit = if signed { 0b100 } else { 0b000 };
            match (&operands[0].kind, &operands[1].kind) {
                (TokenKind::Name(dest), TokenKind::Name(src)) => {
                    let dest = reg_index(dest, line)?;
                    let src = reg_index(src, line)?;
                    words.push(Word::instruction(opcode, signed_bit, (dest << 4) | src, line));
                }
                (TokenKind::Name(dest), TokenKind::Reference(addr)) => {
                    let dest = reg_index(dest, line)?;
                    words.push(Word::instruction(opcode, signed_bit | 0b001, dest << 4, line));
                    words.push(Word::data(*addr as u16));
                }
                (TokenKind::Name(dest), TokenKind::Number(imm)) => {
                    let dest = reg_index(dest, line)?;
                    words.push(Word::instruction(opcode, signed_bit | 0b010, dest << 4, line));
                    words.push(Word::data(*imm as u16));
                }
                (TokenKind::Reference(addr), TokenKind::Name(src)) => {
                    let src = reg_index(src, line)?;
                    words.push(Word::instruction(opcode, signed_bit | 0b011, src << 4, line));
                    words.push(Word::data(*addr as u16));
                }
                _ => return Err(invalid()),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;
    use austro_core::register::RegisterId;

    fn assemble(src: &str) -> Assembled {
        assemble_tokens(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn reg_reg_add_encodes_one_word() {
        let a = assemble("add ax, bx");
        assert_eq!(a.words.len(), 1);
        assert_eq!(a.words[0].opcode(), opcodes::ADD);
        assert_eq!(a.words[0].flags(), 0);
        assert_eq!(
            a.words[0].operand(),
            (RegisterId::AX.index() as u8) << 4 | RegisterId::BX.index() as u8
        );
    }

    #[test]
    fn signed_alias_sets_signed_flag_bit() {
        let a = assemble("iadd ax, bx");
        assert_eq!(a.words[0].flags() & 0b100, 0b100);
    }

    #[test]
    fn reg_imm_emits_a_data_word() {
        let a = assemble("mov ax, 0xffff");
        assert_eq!(a.words.len(), 2);
        assert!(!a.words[1].is_instruction());
        assert_eq!(a.words[1].value(), 0xffff);
    }

    #[test]
    fn forward_jump_label_resolves_to_address() {
        let a = assemble("cmp ax,0\nje quit\nquit: halt");
        assert_eq!(a.words.len(), 4);
        assert_eq!(a.labels.get("quit"), Some(&3));
        assert_eq!(a.words[2].operand(), 3);
        assert_eq!(a.words[2].flags(), 0b010);
    }

    #[test]
    fn backward_jump_label_resolves_to_address() {
        let a = assemble("loop: nop\njmp loop");
        assert_eq!(a.labels.get("loop"), Some(&0));
        assert_eq!(a.words[1].operand(), 0);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let err = assemble_tokens(tokenize("a: nop\na: nop").unwrap()).unwrap_err();
        assert!(matches!(err, AssembleError::DuplicateLabel { .. }));
    }

    #[test]
    fn undefined_label_is_rejected() {
        let err = assemble_tokens(tokenize("jmp nowhere").unwrap()).unwrap_err();
        assert!(matches!(err, AssembleError::UndefinedLabel { .. }));
    }

    #[test]
    fn missing_comma_between_operands_is_rejected() {
        let err = assemble_tokens(tokenize("mov ax bx").unwrap()).unwrap_err();
        assert!(matches!(err, AssembleError::MissingComma { .. }));
    }

    #[test]
    fn bad_register_name_is_rejected() {
        let err = assemble_tokens(tokenize("mov nope, 1").unwrap()).unwrap_err();
        assert!(matches!(err, AssembleError::BadRegister { .. }));
    }

    #[test]
    fn jump_register_form_uses_order_zero() {
        let a = assemble("jmp ax");
        assert_eq!(a.words[0].flags(), 0);
        assert_eq!(a.words[0].operand(), (RegisterId::AX.index() as u8) << 4);
    }

    #[test]
    fn shift_reg_imm_emits_data_word_with_count() {
        let a = assemble("shl al, 3");
        assert_eq!(a.words.len(), 2);
        assert_eq!(a.words[1].value(), 3);
    }

    #[test]
    fn memory_operand_forms_round_trip_address() {
        let a = assemble("mov [128], ax");
        assert_eq!(a.words[0].flags() & 0b011, 0b011);
        assert_eq!(a.words[1].value(), 128);
    }
}

//! The assembler's two error taxonomies: lexical failures (an illegal
//! character) and assembly failures (everything from a duplicate label to
//! an operand shape no opcode accepts). Every variant carries the 1-based
//! source line it was raised from, so a front-end can point a user at the
//! offending statement directly.

use std::fmt;

/// Raised by the lexer on a character no token rule accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerError {
    pub character: char,
    pub line: u32,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "illegal character '{}' at line {}",
            self.character, self.line
        )
    }
}

impl std::error::Error for LexerError {}

/// Raised while assembling a token stream into words. The assembler aborts
/// on the first one of these it hits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssembleError {
    /// A `NAME` operand that should have named one of the sixteen
    /// assembly-visible registers didn't.
    BadRegister { name: String, line: u32 },
    /// A statement began with an identifier that isn't a recognized
    /// mnemonic.
    InvalidInstruction { name: String, line: u32 },
    /// An operand's token kind (or combination of operand kinds) isn't one
    /// this opcode's encoder table accepts.
    InvalidOperandForOpcode { mnemonic: String, line: u32 },
    /// An opcode that requires an operand didn't get enough of them.
    MissingOperand { mnemonic: String, line: u32 },
    /// Two operands were given with no `,` separating them.
    MissingComma { line: u32 },
    /// A token appeared somewhere no statement grammar allows it (e.g. an
    /// operand with no preceding opcode, or a dangling label at EOF).
    InvalidSyntax { line: u32 },
    /// A jump operand named a label no `LABEL:` in the source ever bound.
    UndefinedLabel { name: String, line: u32 },
    /// The same label name was bound twice.
    DuplicateLabel { name: String, line: u32 },
}

impl AssembleError {
    /// The source line this error was raised from, regardless of variant.
    pub fn line(&self) -> u32 {
        match self {
            AssembleError::BadRegister { line, .. } => *line,
            AssembleError::InvalidInstruction { line, .. } => *line,
            AssembleError::InvalidOperandForOpcode { line, .. } => *line,
            AssembleError::MissingOperand { line, .. } => *line,
            AssembleError::MissingComma { line } => *line,
            AssembleError::InvalidSyntax { line } => *line,
            AssembleError::UndefinedLabel { line, .. } => *line,
            AssembleError::DuplicateLabel { line, .. } => *line,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssembleError::BadRegister { name, line } => {
                write!(f, "line {}: '{}' is not a register", line, name)
            }
            AssembleError::InvalidInstruction { name, line } => {
                write!(f, "line {}: '{}' is not an instruction", line, name)
            }
            AssembleError::InvalidOperandForOpcode { mnemonic, line } => write!(
                f,
                "line {}: operand shape not valid for {}",
                line, mnemonic
            ),
            AssembleError::MissingOperand { mnemonic, line } => {
                write!(f, "line {}: {} is missing an operand", line, mnemonic)
            }
            AssembleError::MissingComma { line } => {
                write!(f, "line {}: expected ',' between operands", line)
            }
            AssembleError::InvalidSyntax { line } => {
                write!(f, "line {}: invalid syntax", line)
            }
            AssembleError::UndefinedLabel { name, line } => {
                write!(f, "line {}: undefined label '{}'", line, name)
            }
            AssembleError::DuplicateLabel { name, line } => {
                write!(f, "line {}: label '{}' is already defined", line, name)
            }
        }
    }
}

impl std::error::Error for AssembleError {}

/// Either half of the assembler's error taxonomy, so callers of
/// [`crate::assemble`] have a single error type to match on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Lexer(LexerError),
    Assemble(AssembleError),
}

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Error {
        Error::Lexer(err)
    }
}

impl From<AssembleError> for Error {
    fn from(err: AssembleError) -> Error {
        Error::Assemble(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Lexer(err) => write!(f, "{}", err),
            Error::Assemble(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

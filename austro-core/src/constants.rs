//! Bit layout of the 16-bit Austro instruction word and the fixed sizes of
//! the machine (address space, register count).

/// Total addressable words of main memory. Fixed by design — no paging, no
/// memory-mapped I/O, no dynamic sizing.
pub const ADDRESS_SPACE: usize = 256;

pub const OPCODE_WIDTH: u32 = 5;
pub const FLAGS_WIDTH: u32 = 3;
pub const OPERAND_WIDTH: u32 = 8;
pub const WORD_WIDTH: u32 = OPCODE_WIDTH + FLAGS_WIDTH + OPERAND_WIDTH;

pub const OPCODE_OFFSET: u32 = FLAGS_WIDTH + OPERAND_WIDTH;
pub const FLAGS_OFFSET: u32 = OPERAND_WIDTH;
pub const OPERAND_OFFSET: u32 = 0;

pub const OPCODE_MASK: u16 = 0b0001_1111;
pub const FLAGS_MASK: u16 = 0b0000_0111;
pub const OPERAND_MASK: u16 = 0b1111_1111;

/// Flag bit that selects signed ALU semantics (the `I`-prefixed mnemonics).
pub const SIGNED_FLAG: u8 = 0b100;

/// Low two flag bits that select operand order/location for two-operand and
/// jump instructions.
pub const ORDER_FLAGS: u8 = 0b011;

/// Number of user-addressable registers (general, extra, special and flags).
/// `TMP` is allocated its own index outside this contiguous range since it is
/// never named in assembly.
pub const USER_REGISTER_COUNT: usize = 24;

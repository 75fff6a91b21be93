//! The fetch/decode/execute/store driver that ties memory, the register
//! file, the decoder and the three execution units together into a single
//! stepwise machine.
//!
//! A subtlety worth calling out: `step()` does
//! much more than its name suggests. The very first call (from `Initial`)
//! only performs a fetch. Every call after that performs the *previous*
//! fetch's decode, execute and (if needed) store, and then immediately
//! fetches the *next* instruction before returning — so the CPU is always
//! left parked in `Decode` (one instruction fully latched into `RI`,
//! nothing about it inspected yet) whenever `step()` returns normally.
//! `Halted` and `Stopped` are the only stages that persist across calls
//! without a pending fetch behind them.

use crate::constants::ADDRESS_SPACE;
use crate::decoder::{self, Store, Unit};
use crate::error::CpuError;
use crate::memory::Memory;
use crate::register::{RegisterFile, RegisterId};
use crate::units::{alu, control, shift};

/// Where the CPU is in the fetch/decode/execute/store cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Initial,
    Fetch,
    Decode,
    Execute,
    Store,
    Halted,
    Stopped,
}

/// Observes the CPU's state immediately after each fetch.
///
/// Implementations get read-only views — there is no way to mutate the CPU
/// from within a notification, and no back-pointer from the notification
/// to the CPU that raised it.
pub trait FetchListener {
    fn on_fetch(&mut self, registers: &RegisterFile, memory: &Memory);
}

/// The Austro CPU: 256 words of memory, the aliased register file, and the
/// stage machine that drives them.
pub struct Cpu {
    memory: Memory,
    registers: RegisterFile,
    stage: Stage,
    listeners: Vec<Box<dyn FetchListener>>,
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu {
            memory: Memory::new(),
            registers: RegisterFile::new(),
            stage: Stage::Initial,
            listeners: Vec::new(),
        }
    }
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu::default()
    }

    pub fn add_listener(&mut self, listener: Box<dyn FetchListener>) {
        self.listeners.push(listener);
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Copies `words` into memory starting at `start`, preserving each
    /// word's instruction tag and line number.
    ///
    /// # Errors
    /// Fails with [`CpuError::LoadBlockTooLarge`] if the block runs past
    /// the end of the address space; nothing is written in that case.
    pub fn load(&mut self, words: &[crate::word::Word], start: usize) -> Result<(), CpuError> {
        let len = words.len();
        let fits = start
            .checked_add(len)
            .map(|end| end <= self.memory.size())
            .unwrap_or(false);
        if !fits {
            return Err(CpuError::LoadBlockTooLarge { start, len });
        }
        self.memory
            .load_block(words, start)
            .expect("bounds already checked above");
        Ok(())
    }

    /// Stops the CPU; observed at the next `step()` call, which will
    /// return `Ok(false)` without mutating any further state.
    pub fn stop(&mut self) {
        self.stage = Stage::Stopped;
    }

    /// Zeroes memory and registers and returns to `Initial`.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.registers.clear();
        self.stage = Stage::Initial;
    }

    /// Runs `step()` until the CPU halts or is stopped.
    ///
    /// Returns `true` if it halted normally, `false` if it was stopped.
    pub fn start(&mut self) -> Result<bool, CpuError> {
        while self.stage != Stage::Halted && self.stage != Stage::Stopped {
            self.step()?;
        }
        Ok(self.stage == Stage::Halted)
    }

    /// Advances the CPU. Returns `false` once stopped or halted (without
    /// mutating state); returns `true` otherwise, having fetched at least
    /// one instruction word.
    ///
    /// Any error stops the CPU — a subsequent call returns `Ok(false)`.
    pub fn step(&mut self) -> Result<bool, CpuError> {
        match self.run_step() {
            Ok(advanced) => Ok(advanced),
            Err(err) => {
                self.stage = Stage::Stopped;
                Err(err)
            }
        }
    }

    fn run_step(&mut self) -> Result<bool, CpuError> {
        match self.stage {
            Stage::Stopped | Stage::Halted => return Ok(false),
            Stage::Initial => {
                self.registers.set(RegisterId::PC.index(), 0);
                return self.fetch();
            }
            Stage::Decode => {}
            other => unreachable!("CPU never parks in stage {:?} across step() calls", other),
        }

        let ri = self.registers.get_word(RegisterId::RI.index());
        let decode = decoder::decode(ri, &mut self.registers, &self.memory)?;
        let op1_val = decode.op1.map(|i| self.registers.get(i)).unwrap_or(0);
        let op2_val = decode.op2.map(|i| self.registers.get(i)).unwrap_or(0);
        self.stage = Stage::Execute;

        let mut store = decode.store;
        let mut result: Option<i64> = None;

        match decode.unit {
            Unit::Alu => {
                let computed = alu::compute(decode.operation, op1_val, op2_val, &mut self.registers)?;
                if computed.is_none() {
                    store = Store::None;
                }
                result = computed;
            }
            Unit::Shift => {
                result = Some(i64::from(shift::compute(
                    decode.operation,
                    op1_val,
                    op2_val,
                    &mut self.registers,
                )));
            }
            Unit::Uc => match control::execute(decode.operation, decode.op1, decode.op2, &mut self.registers) {
                control::Outcome::Halted => {
                    self.stage = Stage::Halted;
                    return Ok(true);
                }
                control::Outcome::Jumped => {
                    self.stage = Stage::Fetch;
                }
                control::Outcome::Continue => {}
            },
        }

        if self.stage == Stage::Fetch {
            return self.fetch();
        }

        if store == Store::None {
            self.advance_pc();
            return self.fetch();
        }
        self.stage = Stage::Store;

        if decode.unit != Unit::Uc {
            let dest = decode
                .op1
                .expect("a pending store always has a destination operand");
            control::load(&mut self.registers, dest, result.unwrap_or(0) as u16);
        }
        if let Store::Address(addr) = store {
            let src = decode
                .op1
                .expect("a memory store always has a source operand");
            let value = self.registers.get(src);
            self.memory.set(addr, value)?;
        }

        self.advance_pc();
        self.fetch()
    }

    fn advance_pc(&mut self) {
        let idx = RegisterId::PC.index();
        let pc = self.registers.get(idx);
        self.registers.set(idx, pc.wrapping_add(1));
    }

    fn fetch(&mut self) -> Result<bool, CpuError> {
        let pc = self.registers.get(RegisterId::PC.index()) as usize;
        if pc >= ADDRESS_SPACE {
            return Err(CpuError::PcOutOfRange { pc });
        }

        self.registers.set(RegisterId::MAR.index(), pc as u16);
        let word = self.memory.get_word(pc)?;
        self.registers.set_word(RegisterId::MBR.index(), word)?;
        let mbr_word = self.registers.get_word(RegisterId::MBR.index());
        self.registers.set_word(RegisterId::RI.index(), mbr_word)?;

        for listener in &mut self.listeners {
            listener.on_fetch(&self.registers, &self.memory);
        }

        self.stage = Stage::Decode;
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::opcodes;
    use crate::word::Word;

    fn two_reg(opcode: u8, flags: u8, dest: u8, src: u8) -> Word {
        Word::instruction(opcode, flags, (dest << 4) | src, 0)
    }

    #[test]
    fn halt_stops_the_cpu_and_subsequent_steps_return_false() {
        let mut cpu = Cpu::new();
        cpu.load(&[Word::instruction(opcodes::HALT, 0, 0, 0)], 0)
            .unwrap();
        assert!(cpu.start().unwrap());
        assert_eq!(cpu.stage(), Stage::Halted);
        assert_eq!(cpu.step().unwrap(), false);
    }

    #[test]
    fn count_up_loop_matches_expected_final_registers() {
        let mut cpu = Cpu::new();
        let ax = RegisterId::AX.index() as u8;
        let bx = RegisterId::BX.index() as u8;
        let mut words = vec![
            two_reg(opcodes::MOV, 0b010, ax, 0), // mov ax, 0xffff
            Word::data(0xFFFF),
            two_reg(opcodes::MOV, 0b010, bx, 0), // mov bx, 0
            Word::data(0),
            two_reg(opcodes::ADD, 0b010, ax, 0), // loop: add ax, 2
            Word::data(2),
            Word::instruction(opcodes::INC, 0, bx << 4, 0), // inc bx
            two_reg(opcodes::CMP, 0b010, bx, 0), // cmp bx, 5
            Word::data(5),
            Word::instruction(opcodes::JNZ, 0, 4, 0), // jne loop (target addr 4 via register? see below)
        ];
        words.push(Word::instruction(opcodes::HALT, 0, 0, 0));

        // Jumps take their target from a register per the decoder, so
        // rewrite the jne operand to read the loop address out of CX,
        // pre-seeded with the label's address - this exercises the same
        // "reg contains target" jump shape the encoder emits for resolved
        // labels is register based; loading a literal loop index keeps the
        // test self-contained without depending on the assembler crate.
        let cx = RegisterId::CX.index() as u8;
        words[9] = Word::instruction(opcodes::JNZ, 0, cx << 4, 0);

        cpu.load(&words, 0).unwrap();
        cpu.registers_mut().set(RegisterId::CX.index(), 4);

        cpu.start().unwrap();

        assert_eq!(cpu.registers().get(RegisterId::AX.index()), 9);
        assert_eq!(cpu.registers().get(RegisterId::BX.index()), 5);
        assert_eq!(cpu.registers().get(RegisterId::Z.index()), 1);
    }

    #[test]
    fn register_aliasing_keeps_byte_and_word_views_coherent() {
        let mut cpu = Cpu::new();
        let al = RegisterId::AL.index() as u8;
        let ah = RegisterId::AH.index() as u8;
        let ax = RegisterId::AX.index() as u8;
        let words = vec![
            two_reg(opcodes::MOV, 0b010, al, 0),
            Word::data(0x9A),
            two_reg(opcodes::MOV, 0b010, ah, 0),
            Word::data(0x10),
            two_reg(opcodes::MOV, 0b010, ax, 0),
            Word::data(0x9F8D),
            Word::instruction(opcodes::HALT, 0, 0, 0),
        ];
        cpu.load(&words, 0).unwrap();

        cpu.step().unwrap(); // fetch mov al, imm
        cpu.step().unwrap(); // run it, fetch mov ah, imm
        assert_eq!(cpu.registers().get(RegisterId::AX.index()), 0x009A);

        cpu.step().unwrap(); // run it, fetch mov ax, imm
        assert_eq!(cpu.registers().get(RegisterId::AX.index()), 0x109A);

        cpu.step().unwrap(); // run it, fetch halt
        assert_eq!(cpu.registers().get(RegisterId::AX.index()), 0x9F8D);
        assert_eq!(cpu.registers().get(RegisterId::AH.index()), 0x9F);
        assert_eq!(cpu.registers().get(RegisterId::AL.index()), 0x8D);
    }

    #[test]
    fn memory_round_trip_through_indirect_operands() {
        let mut cpu = Cpu::new();
        let ax = RegisterId::AX.index() as u8;
        let bx = RegisterId::BX.index() as u8;
        let words = vec![
            two_reg(opcodes::MOV, 0b010, ax, 0), // mov ax, 7
            Word::data(7),
            two_reg(opcodes::MOV, 0b011, ax, 0), // mov [128], ax
            Word::data(128),
            two_reg(opcodes::MOV, 0b001, bx, 0), // mov bx, [128]
            Word::data(128),
            Word::instruction(opcodes::HALT, 0, 0, 0),
        ];
        cpu.load(&words, 0).unwrap();
        cpu.start().unwrap();

        assert_eq!(cpu.registers().get(RegisterId::BX.index()), 7);
        assert_eq!(cpu.memory().get(128).unwrap(), 7);
    }

    #[test]
    fn load_rejects_a_block_that_overruns_memory() {
        let mut cpu = Cpu::new();
        let program = vec![Word::instruction(opcodes::NOP, 0, 0, 0); 2];
        let err = cpu.load(&program, ADDRESS_SPACE - 1).unwrap_err();
        assert_eq!(
            err,
            CpuError::LoadBlockTooLarge {
                start: ADDRESS_SPACE - 1,
                len: 2
            }
        );
    }

    #[test]
    fn running_off_the_end_of_memory_reports_pc_out_of_range() {
        let mut cpu = Cpu::new();
        let program: Vec<Word> = (0..ADDRESS_SPACE)
            .map(|_| Word::instruction(opcodes::NOP, 0, 0, 0))
            .collect();
        cpu.load(&program, 0).unwrap();

        let err = cpu.start().unwrap_err();
        assert_eq!(err, CpuError::PcOutOfRange { pc: ADDRESS_SPACE });
        assert_eq!(cpu.stage(), Stage::Stopped);
        assert_eq!(cpu.step().unwrap(), false);
    }
}

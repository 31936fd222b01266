//! The execution engine: a fetch-decode-execute loop over a `Program`, with its own register
//! file and data memory.

use std::fmt::{Display, Formatter};

use prettytable::Table;
use tracing::{debug, info, trace, warn};

use crate::bytecode::{Instruction, Opcode, Program, TABLE_DISPLAY_FORMAT};
use crate::error::Fault;
use crate::memory::{Memory, RegisterFile, Word};

pub const DEFAULT_MEMORY_SIZE: usize = 65_536;
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

/// Shift amounts at or above this width clear the value entirely.
const SHIFT_WIDTH: Word = 32;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VmConfig {
  /// Number of words of data memory.
  pub memory_size : usize,
  /// Maximum instructions per run. `None` runs to completion.
  pub step_limit  : Option<u64>,
}

impl Default for VmConfig {
  fn default() -> VmConfig {
    VmConfig {
      memory_size : DEFAULT_MEMORY_SIZE,
      step_limit  : Some(DEFAULT_STEP_LIMIT),
    }
  }
}

/**
  Life cycle of a run:
  ```text
  Ready ─start─> Running ─┬─> Halted            (ran off the end of the program)
                          ├─> Faulted           (bad instruction or address)
                          └─> StepLimitReached  (ceiling hit, nothing corrupted)
  ```
  The last three are terminal until `reset`.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
  Ready,
  Running,
  Halted,
  Faulted(Fault),
  StepLimitReached,
}

impl State {
  pub fn is_terminal(&self) -> bool {
    match self {
      State::Ready | State::Running => false,
      _                             => true
    }
  }
}

impl Display for State {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      State::Ready            => write!(f, "Ready"),
      State::Running          => write!(f, "Running"),
      State::Halted           => write!(f, "Halted"),
      State::Faulted(fault)   => write!(f, "Faulted: {}", fault),
      State::StepLimitReached => write!(f, "Step limit reached"),
    }
  }
}

/// How a run that did not fault came to an end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
  Halted,
  StepLimitReached,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunSummary {
  pub outcome : Outcome,
  pub steps   : u64,
}

pub struct Engine {
  config    : VmConfig,
  program   : Program,

  // Machine state
  registers : RegisterFile,
  memory    : Memory,
  pc        : usize, // Byte offset of the next instruction
  steps     : u64,   // Instructions executed since reset
  state     : State,
}

impl Engine {

  pub fn new(program: Program, config: VmConfig) -> Engine {
    Engine {
      config,
      program,
      registers : RegisterFile::new(),
      memory    : Memory::new(config.memory_size),
      pc        : 0,
      steps     : 0,
      state     : State::Ready,
    }
  }

  // region Accessors

  pub fn config(&self) -> &VmConfig {
    &self.config
  }

  pub fn program(&self) -> &Program {
    &self.program
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  /// Memory is writable before a run so that callers can supply input data.
  pub fn memory_mut(&mut self) -> &mut Memory {
    &mut self.memory
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn state(&self) -> &State {
    &self.state
  }

  // endregion

  /// Zeroes registers and memory and rewinds to the first instruction.
  pub fn reset(&mut self) {
    self.registers = RegisterFile::new();
    self.memory.clear();
    self.pc    = 0;
    self.steps = 0;
    self.state = State::Ready;
  }

  /**
    Executes one instruction. Returns `Ok(true)` while there is more to run and `Ok(false)`
    once the engine has stopped without a fault. A fault moves the engine to
    `State::Faulted` and is returned; no further instruction will execute.
  */
  pub fn step(&mut self) -> Result<bool, Fault> {
    match self.state {
      State::Ready   => self.state = State::Running,
      State::Running => {}
      State::Faulted(ref fault) => return Err(fault.clone()),
      _ => return Ok(false)
    }

    if self.pc >= self.program.len() {
      debug!(pc = self.pc, steps = self.steps, "end of program");
      self.state = State::Halted;
      return Ok(false);
    }

    let pc = self.pc;
    let result =
      self.program
          .fetch(pc)
          .map_err(Fault::from)
          .and_then(|(instruction, size)| {
            debug!(pc, %instruction, "execute");
            self.pc += size;
            self.execute(pc, &instruction)
          });

    match result {
      Ok(()) => {
        self.steps += 1;
        trace!(registers = %self.registers, "step {}", self.steps);
        Ok(true)
      }
      Err(fault) => {
        self.state = State::Faulted(fault.clone());
        Err(fault)
      }
    }
  }

  /// Runs until the program ends, faults, or reaches the configured step limit.
  pub fn run(&mut self) -> Result<RunSummary, Fault> {
    loop {
      if let Some(limit) = self.config.step_limit {
        if self.steps >= limit && self.pc < self.program.len() && !self.state.is_terminal() {
          warn!(limit, pc = self.pc, "step limit reached, stopping");
          self.state = State::StepLimitReached;
        }
      }

      if !self.step()? {
        break;
      }
    }

    let outcome =
      match self.state {
        State::StepLimitReached => Outcome::StepLimitReached,
        _                       => Outcome::Halted
      };

    info!(steps = self.steps, ?outcome, "run finished");
    Ok(RunSummary { outcome, steps: self.steps })
  }

  // region Instruction semantics

  fn execute(&mut self, pc: usize, instruction: &Instruction) -> Result<(), Fault> {
    let opcode = instruction.opcode();

    match *instruction {

      Instruction::LoadConst { reg, constant } => {
        self.registers.set(reg, constant as Word);
      }

      Instruction::ReadMem { offset, dst_reg, base_reg } => {
        let address = self.registers.get(base_reg).saturating_add(offset as Word);
        let value = self.load(address, opcode, pc)?;
        self.registers.set(dst_reg, value);
      }

      Instruction::WriteMem { src_reg, addr_reg } => {
        let address = self.registers.get(addr_reg);
        self.store(address, self.registers.get(src_reg), opcode, pc)?;
      }

      Instruction::ShiftRight { val_reg, amount_addr, offset, base_reg } => {
        let amount  = self.load(amount_addr as Word, opcode, pc)?;
        let value   = self.registers.get(val_reg);
        let result  = shift_right_logical(value, amount);
        if amount < 0 {
          warn!(pc, amount, "negative shift amount, result forced to 0");
        }

        let address = self.registers.get(base_reg).saturating_add(offset as Word);
        self.store(address, result, opcode, pc)?;
      }

    }

    Ok(())
  }

  fn load(&self, address: Word, opcode: Opcode, pc: usize) -> Result<Word, Fault> {
    self.memory
        .read(address)
        .ok_or_else(|| self.out_of_bounds(address, opcode, pc))
  }

  fn store(&mut self, address: Word, value: Word, opcode: Opcode, pc: usize) -> Result<(), Fault> {
    match self.memory.write(address, value) {
      Some(()) => Ok(()),
      None     => Err(self.out_of_bounds(address, opcode, pc))
    }
  }

  fn out_of_bounds(&self, address: Word, opcode: Opcode, pc: usize) -> Fault {
    Fault::OutOfBounds { address, opcode, pc, size: self.memory.len() }
  }

  // endregion

  // region Display methods

  fn make_register_table(registers: &RegisterFile) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for (i, value) in registers.as_slice().iter().enumerate() {
      table.add_row(row![r->format!("R{} =", i), value]);
    }
    table
  }

  // endregion
}

/**
  Logical right shift of the low 32 bits of `value`. Amounts of 32 or more, and negative
  amounts, produce 0.
*/
pub fn shift_right_logical(value: Word, amount: Word) -> Word {
  if amount < 0 || amount >= SHIFT_WIDTH {
    return 0;
  }
  ((value as u32) >> amount) as Word
}


impl Display for Engine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let register_table = Engine::make_register_table(&self.registers);
    write!(
      f,
      "State: {}\tPC: {}\tSteps: {}\n{}",
      self.state, self.pc, self.steps, register_table
    )
  }
}

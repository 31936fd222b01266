use super::binary::{decode_instruction, disassemble, encode_program};
use super::instruction::Instruction;
use crate::error::{DecodeError, EncodeError};

/// An encoded program: the raw instruction bytes, back to back, no header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  bytes: Vec<u8>
}

impl Program {

  pub fn new(bytes: Vec<u8>) -> Program {
    Program { bytes }
  }

  pub fn from_instructions(instructions: &[Instruction]) -> Result<Program, EncodeError> {
    encode_program(instructions).map(Program::new)
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Decodes the instruction at byte offset `pc`.
  pub fn fetch(&self, pc: usize) -> Result<(Instruction, usize), DecodeError> {
    decode_instruction(&self.bytes, pc)
  }

  pub fn disassemble(&self) -> Result<Vec<(usize, Instruction)>, DecodeError> {
    disassemble(&self.bytes)
  }
}

impl From<Vec<u8>> for Program {
  fn from(bytes: Vec<u8>) -> Program {
    Program::new(bytes)
  }
}

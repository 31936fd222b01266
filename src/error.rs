//! Error types for every stage: parsing, encoding, decoding and execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::bytecode::Opcode;

pub type Result<T> = std::result::Result<T, Error>;

/// A byte that is not one of the four opcodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpcode(pub u8);

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseErrorKind {
  #[error("`{0}` is not a mnemonic or opcode")]
  UnknownMnemonic(String),

  #[error("{opcode} takes {expected} operands but was given {found}")]
  WrongOperandCount { opcode: Opcode, expected: usize, found: usize },

  #[error("`{0}` is not an integer")]
  InvalidOperand(String),

  #[error("malformed row near `{0}`")]
  Syntax(String),
}

/// A source line that could not be translated.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("error on line {line}: {kind}")]
pub struct ParseError {
  pub line : usize,
  pub kind : ParseErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EncodeError {
  #[error("field overflow: {opcode} field {field} = {value} is outside [{min}, {max}]")]
  FieldOverflow { opcode: Opcode, field: char, value: i64, min: i64, max: i64 },

  #[error("{opcode} takes {expected} operands but was given {found}")]
  OperandCount { opcode: Opcode, expected: usize, found: usize },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DecodeError {
  #[error("unknown opcode {code} at offset {offset}")]
  UnknownOpcode { offset: usize, code: u8 },

  #[error("truncated {opcode} at offset {offset}: needs {needed} bytes, {available} remain")]
  TruncatedInstruction { offset: usize, opcode: Opcode, needed: usize, available: usize },

  #[error("offset {offset} is past the end of the program ({len} bytes)")]
  OutOfRange { offset: usize, len: usize },

  /// Decoded fields that do not form a valid instruction. Every field the table can extract is in
  /// range, so this only fires if the table and `Instruction` disagree.
  #[error("{opcode} at offset {offset} has invalid operands: {source}")]
  InvalidOperands { offset: usize, opcode: Opcode, source: EncodeError },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AssemblyError {
  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error("error on line {line}: {source}")]
  Encode { line: usize, source: EncodeError },
}

/// A fatal condition raised while executing a program.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Fault {
  #[error("decode failure: {0}")]
  Decode(#[from] DecodeError),

  #[error("{opcode} at pc {pc} accessed address {address}, outside memory of {size} words")]
  OutOfBounds { address: i64, opcode: Opcode, pc: usize, size: usize },
}

/// A malformed `start-end` address range.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RangeError {
  #[error("expected `start-end`, found `{0}`")]
  Malformed(String),

  #[error("range {start}-{end} is empty")]
  Empty { start: usize, end: usize },

  #[error("range starts at {start}, past the last address {last}")]
  OutOfMemory { start: usize, last: usize },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Assembly(#[from] AssemblyError),

  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error("runtime fault: {0}")]
  Fault(#[from] Fault),

  #[error("invalid address range: {0}")]
  Range(#[from] RangeError),

  #[error("{}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("could not serialize memory dump: {0}")]
  Json(#[from] serde_json::Error),
}

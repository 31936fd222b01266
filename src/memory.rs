//! The register file and the data memory of the machine.

use std::fmt::{Display, Formatter};

use crate::bytecode::Register;

/// Contents of a register or memory cell.
pub type Word = i64;

pub const REGISTER_COUNT: usize = 8;

/// Eight integer registers, all zero at reset.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RegisterFile([Word; REGISTER_COUNT]);

impl RegisterFile {

  pub fn new() -> RegisterFile {
    RegisterFile::default()
  }

  /// Only the low three bits of `register` select a register.
  pub fn get(&self, register: Register) -> Word {
    self.0[register as usize % REGISTER_COUNT]
  }

  pub fn set(&mut self, register: Register, value: Word) {
    self.0[register as usize % REGISTER_COUNT] = value;
  }

  pub fn as_slice(&self) -> &[Word] {
    &self.0
  }
}

/**
  Flat, word-addressed data memory. Program bytes live elsewhere (see `bytecode::Program`);
  this store holds data only, so no instruction can overwrite code.

  Addresses are signed so that a base register plus a negative offset can be represented and
  then rejected; any address outside `0..len()` is out of bounds.
*/
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Memory {
  words: Vec<Word>
}

impl Memory {

  pub fn new(size: usize) -> Memory {
    Memory { words: vec![0; size] }
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }

  /// Converts `address` into an index, or `None` if it lies outside memory.
  pub fn index(&self, address: i64) -> Option<usize> {
    if address < 0 || address as u64 >= self.words.len() as u64 {
      return None;
    }
    Some(address as usize)
  }

  pub fn read(&self, address: i64) -> Option<Word> {
    self.index(address).map(|i| self.words[i])
  }

  /// Returns `None`, leaving memory untouched, if `address` is out of bounds.
  pub fn write(&mut self, address: i64, value: Word) -> Option<()> {
    let i = self.index(address)?;
    self.words[i] = value;
    Some(())
  }

  /// The words at the addresses `start..=end`, or `None` if any of them is out of bounds.
  pub fn slice(&self, start: usize, end: usize) -> Option<&[Word]> {
    self.words.get(start..=end)
  }

  pub fn clear(&mut self) {
    for word in self.words.iter_mut() {
      *word = 0;
    }
  }
}

impl Display for RegisterFile {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}",
      self.0.iter()
            .enumerate()
            .map(|(i, value)| format!("R{}={}", i, value))
            .collect::<Vec<String>>()
            .join(" ")
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registers_start_at_zero() {
    let mut registers = RegisterFile::new();
    assert_eq!(registers.as_slice(), &[0; 8]);
    registers.set(7, -3);
    assert_eq!(registers.get(7), -3);
    assert_eq!(registers.to_string(), "R0=0 R1=0 R2=0 R3=0 R4=0 R5=0 R6=0 R7=-3");
  }

  #[test]
  fn bounds() {
    let mut memory = Memory::new(16);
    assert_eq!(memory.write(15, 9), Some(()));
    assert_eq!(memory.read(15), Some(9));
    assert_eq!(memory.write(16, 1), None);
    assert_eq!(memory.read(16), None);
    assert_eq!(memory.read(-1), None);
    assert_eq!(memory.read(i64::MAX), None);
  }

  #[test]
  fn slices() {
    let mut memory = Memory::new(4);
    memory.write(1, 10);
    memory.write(2, 20);
    assert_eq!(memory.slice(1, 2), Some(&[10, 20][..]));
    assert_eq!(memory.slice(3, 4), None);

    memory.clear();
    assert_eq!(memory.slice(0, 3), Some(&[0, 0, 0, 0][..]));
  }
}

/*!
  Memory dumps. A dump is a JSON array holding the words of a contiguous address range in
  address order; the first element is the word at the start of the range. There is no other
  dump format.
*/

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, RangeError};
use crate::memory::{Memory, Word};

/// An inclusive range of data memory addresses, written `start-end`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AddressRange {
  pub start : usize,
  pub end   : usize,
}

impl AddressRange {

  /// The whole of `memory`, or `None` if it has no words.
  pub fn all(memory: &Memory) -> Option<AddressRange> {
    match memory.len() {
      0   => None,
      len => Some(AddressRange { start: 0, end: len - 1 })
    }
  }

  /// Trims the end of the range to the last address of `memory`.
  pub fn clamp(self, memory: &Memory) -> Result<AddressRange, RangeError> {
    let last =
      match memory.len() {
        0   => return Err(RangeError::OutOfMemory { start: self.start, last: 0 }),
        len => len - 1
      };

    if self.start > last {
      return Err(RangeError::OutOfMemory { start: self.start, last });
    }
    Ok(AddressRange { start: self.start, end: self.end.min(last) })
  }
}

impl FromStr for AddressRange {
  type Err = RangeError;

  fn from_str(text: &str) -> Result<AddressRange, RangeError> {
    let malformed = || RangeError::Malformed(text.to_string());

    let mut parts = text.trim().splitn(2, '-');
    let start = parts.next().and_then(|s| s.trim().parse::<usize>().ok()).ok_or_else(malformed)?;
    let end   = parts.next().and_then(|s| s.trim().parse::<usize>().ok()).ok_or_else(malformed)?;

    if start > end {
      return Err(RangeError::Empty { start, end });
    }
    Ok(AddressRange { start, end })
  }
}

/// The words of `range`, with the range first clamped to `memory`.
pub fn dump_words(memory: &Memory, range: AddressRange) -> Result<Vec<Word>, RangeError> {
  let range = range.clamp(memory)?;
  memory.slice(range.start, range.end)
        .map(<[Word]>::to_vec)
        .ok_or(RangeError::OutOfMemory { start: range.start, last: memory.len().saturating_sub(1) })
}

/// Renders the dump as pretty-printed JSON.
pub fn dump_json(memory: &Memory, range: AddressRange) -> Result<String, Error> {
  let words = dump_words(memory, range)?;
  Ok(serde_json::to_string_pretty(&words)?)
}

/// Writes the dump of `range` (or of all memory when `range` is `None`) to `path`.
pub fn write_dump(path: &Path, memory: &Memory, range: Option<AddressRange>) -> Result<(), Error> {
  let range =
    match range.or_else(|| AddressRange::all(memory)) {
      Some(range) => range,
      None => return Err(RangeError::OutOfMemory { start: 0, last: 0 }.into())
    };

  let json = dump_json(memory, range)?;
  fs::write(path, json).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;

  info!(path = %path.display(), start = range.start, end = range.end, "memory dump written");
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_ranges() {
    assert_eq!("1000-1010".parse::<AddressRange>(), Ok(AddressRange { start: 1000, end: 1010 }));
    assert_eq!(" 5 - 5 ".parse::<AddressRange>(), Ok(AddressRange { start: 5, end: 5 }));
    assert_eq!("7-3".parse::<AddressRange>(), Err(RangeError::Empty { start: 7, end: 3 }));
    assert!("10".parse::<AddressRange>().is_err());
    assert!("a-b".parse::<AddressRange>().is_err());
    assert!("-3-4".parse::<AddressRange>().is_err());
  }

  #[test]
  fn clamps_to_memory() {
    let memory = Memory::new(8);
    let range = AddressRange { start: 6, end: 100 };
    assert_eq!(range.clamp(&memory), Ok(AddressRange { start: 6, end: 7 }));
    assert_eq!(
      AddressRange { start: 8, end: 9 }.clamp(&memory),
      Err(RangeError::OutOfMemory { start: 8, last: 7 })
    );
  }

  #[test]
  fn json_is_a_positional_array() {
    let mut memory = Memory::new(8);
    memory.write(2, 40);
    memory.write(3, -1);

    let words = dump_words(&memory, AddressRange { start: 2, end: 4 }).unwrap();
    assert_eq!(words, vec![40, -1, 0]);

    let json = dump_json(&memory, AddressRange { start: 2, end: 4 }).unwrap();
    let parsed: Vec<Word> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, vec![40, -1, 0]);
  }

  #[test]
  fn writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");

    let mut memory = Memory::new(4);
    memory.write(0, 9);
    write_dump(&path, &memory, None).unwrap();

    let parsed: Vec<Word> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, vec![9, 0, 0, 0]);
  }

  #[test]
  fn unwritable_path_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("dump.json");
    let memory = Memory::new(4);
    assert!(matches!(write_dump(&path, &memory, None), Err(Error::Io { .. })));
  }
}

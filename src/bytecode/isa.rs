/*!
  The instruction table: for every opcode, its encoded length and the bit fields packed into
  it. Both the encoder and the decoder read this table and nothing else, so the two can never
  disagree about where a field lives.

  Bit 0 is the least significant bit of the first byte. A field may straddle byte boundaries.

  | Opcode | Bytes | Fields                                                         |
  |--------|-------|----------------------------------------------------------------|
  | 234    | 3     | A[0..=7] op, B[8..=10] reg, C[11..=23] signed                  |
  | 102    | 4     | A[0..=7] op, B[8..=20] signed, C[21..=23] reg, D[24..=26] reg  |
  | 90     | 2     | A[0..=7] op, B[8..=10] reg, C[11..=13] reg                     |
  | 224    | 7     | A[0..=7] op, B[8..=10] reg, C[11..=33] unsigned,               |
  |        |       | D[34..=46] signed, E[47..=49] reg                              |
*/

use std::collections::HashMap;
use std::convert::TryFrom;

use strum::IntoEnumIterator;

use super::instruction::Opcode;
use crate::error::{EncodeError, UnknownOpcode};

lazy_static! {
  pub static ref INSTRUCTION_SPEC: InstructionSpec = InstructionSpec::new();
}

/// How the bits of a field are to be read.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldKind {
  /// The opcode byte itself.
  Opcode,
  /// A register index.
  Register,
  /// A two's complement quantity, sign-extended on decode.
  Signed,
  /// A plain unsigned quantity.
  Unsigned,
}

/// A named, inclusive bit range within an encoded instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Field {
  pub name  : char,
  pub start : u32,
  pub end   : u32,
  pub kind  : FieldKind,
}

impl Field {

  pub const fn new(name: char, start: u32, end: u32, kind: FieldKind) -> Field {
    Field { name, start, end, kind }
  }

  pub fn width(&self) -> u32 {
    self.end - self.start + 1
  }

  pub fn mask(&self) -> u64 {
    (1u64 << self.width()) - 1
  }

  pub fn is_signed(&self) -> bool {
    self.kind == FieldKind::Signed
  }

  /// Smallest value the field can hold.
  pub fn min(&self) -> i64 {
    match self.is_signed() {
      true  => -(1i64 << (self.width() - 1)),
      false => 0
    }
  }

  /// Largest value the field can hold.
  pub fn max(&self) -> i64 {
    match self.is_signed() {
      true  => (1i64 << (self.width() - 1)) - 1,
      false => self.mask() as i64
    }
  }

  pub fn contains(&self, value: i64) -> bool {
    self.min() <= value && value <= self.max()
  }

  /**
    Places `value` into `accumulator` at this field's offset. The value is masked to the field
    width first, which turns a negative number into its two's complement bit pattern. Range
    checking is the caller's job.
  */
  pub fn insert(&self, accumulator: u64, value: i64) -> u64 {
    accumulator | (((value as u64) & self.mask()) << self.start)
  }

  /// Reads this field out of `accumulator`, sign-extending signed fields.
  pub fn extract(&self, accumulator: u64) -> i64 {
    let raw = (accumulator >> self.start) & self.mask();
    let sign_bit = 1u64 << (self.width() - 1);

    match self.is_signed() && raw & sign_bit != 0 {
      true  => raw as i64 - (1i64 << self.width()),
      false => raw as i64
    }
  }
}

/// Encoded length and field layout of one opcode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
  pub opcode : Opcode,
  pub size   : usize,
  pub fields : Vec<Field>,
}

impl Layout {
  /// Every field except the opcode byte, in encoding order.
  pub fn operand_fields(&self) -> &[Field] {
    &self.fields[1..]
  }
}

/// The immutable opcode table. Use the shared `INSTRUCTION_SPEC` instance.
#[derive(Debug)]
pub struct InstructionSpec {
  layouts: HashMap<Opcode, Layout>
}

const OPCODE_FIELD: Field = Field::new('A', 0, 7, FieldKind::Opcode);

impl InstructionSpec {

  fn new() -> InstructionSpec {
    let layouts =
      Opcode::iter().map(|opcode| {
        let (size, operands) =
          match opcode {
            Opcode::LoadConst => (3, vec![
              Field::new('B', 8, 10, FieldKind::Register),
              Field::new('C', 11, 23, FieldKind::Signed),
            ]),
            Opcode::ReadMem => (4, vec![
              Field::new('B', 8, 20, FieldKind::Signed),
              Field::new('C', 21, 23, FieldKind::Register),
              Field::new('D', 24, 26, FieldKind::Register),
            ]),
            Opcode::WriteMem => (2, vec![
              Field::new('B', 8, 10, FieldKind::Register),
              Field::new('C', 11, 13, FieldKind::Register),
            ]),
            Opcode::ShiftRight => (7, vec![
              Field::new('B', 8, 10, FieldKind::Register),
              Field::new('C', 11, 33, FieldKind::Unsigned),
              Field::new('D', 34, 46, FieldKind::Signed),
              Field::new('E', 47, 49, FieldKind::Register),
            ]),
          };

        let mut fields = vec![OPCODE_FIELD];
        fields.extend(operands);
        (opcode, Layout { opcode, size, fields })
      }).collect();

    InstructionSpec { layouts }
  }

  /// Every opcode has a layout, so this lookup cannot fail.
  pub fn layout(&self, opcode: Opcode) -> &Layout {
    &self.layouts[&opcode]
  }

  /// Looks up the layout for a raw opcode byte.
  pub fn lookup(&self, code: u8) -> Result<&Layout, UnknownOpcode> {
    Opcode::try_from(code)
      .map(|opcode| self.layout(opcode))
      .map_err(|_| UnknownOpcode(code))
  }

  /// Encoded length in bytes of the instruction with opcode byte `code`.
  pub fn size_of(&self, code: u8) -> Result<usize, UnknownOpcode> {
    self.lookup(code).map(|layout| layout.size)
  }

  /// The fields of `opcode` in encoding order, opcode byte first.
  pub fn fields_of(&self, opcode: Opcode) -> &[Field] {
    &self.layout(opcode).fields
  }

  /// Checks that `operands` has one in-range value per operand field of `opcode`.
  pub fn check_operands(&self, opcode: Opcode, operands: &[i64]) -> Result<(), EncodeError> {
    let fields = self.layout(opcode).operand_fields();

    if fields.len() != operands.len() {
      return Err(EncodeError::OperandCount {
        opcode,
        expected : fields.len(),
        found    : operands.len()
      });
    }

    for (field, &value) in fields.iter().zip(operands) {
      if !field.contains(value) {
        return Err(EncodeError::FieldOverflow {
          opcode,
          field : field.name,
          value,
          min   : field.min(),
          max   : field.max()
        });
      }
    }

    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sizes() {
    assert_eq!(INSTRUCTION_SPEC.size_of(234), Ok(3));
    assert_eq!(INSTRUCTION_SPEC.size_of(102), Ok(4));
    assert_eq!(INSTRUCTION_SPEC.size_of(90),  Ok(2));
    assert_eq!(INSTRUCTION_SPEC.size_of(224), Ok(7));
    assert_eq!(INSTRUCTION_SPEC.size_of(1),   Err(UnknownOpcode(1)));
  }

  #[test]
  fn field_table_is_exact() {
    let ranges = |opcode| -> Vec<(char, u32, u32)> {
      INSTRUCTION_SPEC.fields_of(opcode).iter().map(|f| (f.name, f.start, f.end)).collect()
    };
    assert_eq!(ranges(Opcode::LoadConst),  vec![('A', 0, 7), ('B', 8, 10), ('C', 11, 23)]);
    assert_eq!(ranges(Opcode::ReadMem),    vec![('A', 0, 7), ('B', 8, 20), ('C', 21, 23), ('D', 24, 26)]);
    assert_eq!(ranges(Opcode::WriteMem),   vec![('A', 0, 7), ('B', 8, 10), ('C', 11, 13)]);
    assert_eq!(
      ranges(Opcode::ShiftRight),
      vec![('A', 0, 7), ('B', 8, 10), ('C', 11, 33), ('D', 34, 46), ('E', 47, 49)]
    );
  }

  #[test]
  fn fields_are_contiguous_and_fit() {
    for opcode in Opcode::iter() {
      let layout = INSTRUCTION_SPEC.layout(opcode);
      let mut next = 0;
      for field in &layout.fields {
        assert_eq!(field.start, next, "{} field {}", opcode, field.name);
        next = field.end + 1;
      }
      assert!(next as usize <= layout.size * 8, "{} overruns its size", opcode);
      assert!(next as usize > (layout.size - 1) * 8, "{} has a spare byte", opcode);
    }
  }

  #[test]
  fn register_fields_are_three_bits() {
    for opcode in Opcode::iter() {
      for field in INSTRUCTION_SPEC.fields_of(opcode) {
        match field.kind {
          FieldKind::Register => assert_eq!(field.width(), 3),
          FieldKind::Signed   => assert_eq!(field.width(), 13),
          FieldKind::Opcode   => assert_eq!(field.width(), 8),
          FieldKind::Unsigned => assert_eq!(field.width(), 23),
        }
      }
    }
  }

  #[test]
  fn sign_extension() {
    let field = Field::new('C', 11, 23, FieldKind::Signed);
    assert_eq!(field.extract(4096 << 11), -4096);
    assert_eq!(field.extract(4095 << 11), 4095);
    assert_eq!(field.extract(0x1FFF << 11), -1);

    let unsigned = Field::new('C', 11, 23, FieldKind::Unsigned);
    assert_eq!(unsigned.extract(4096 << 11), 4096);
  }

  #[test]
  fn insert_masks_twos_complement() {
    let field = Field::new('D', 34, 46, FieldKind::Signed);
    let packed = field.insert(0, -1);
    assert_eq!(packed, 0x1FFFu64 << 34);
    assert_eq!(field.extract(packed), -1);
  }

  #[test]
  fn ranges() {
    let signed = Field::new('B', 8, 20, FieldKind::Signed);
    assert_eq!((signed.min(), signed.max()), (-4096, 4095));
    let register = Field::new('B', 8, 10, FieldKind::Register);
    assert_eq!((register.min(), register.max()), (0, 7));
    let wide = Field::new('C', 11, 33, FieldKind::Unsigned);
    assert_eq!((wide.min(), wide.max()), (0, 8_388_607));
  }
}

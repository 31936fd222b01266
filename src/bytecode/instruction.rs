use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

use super::isa::INSTRUCTION_SPEC;
use crate::error::EncodeError;

/// Index into the register file. Only the low three bits are meaningful.
pub type Register = u8;

/**
  Opcodes of the virtual machine.

  The discriminant of each variant is the opcode byte itself, so `num_enum` gives us the
  byte <-> opcode conversion for free and `strum` gives us the mnemonic <-> opcode
  conversion. Sizes and field layouts live in `isa::INSTRUCTION_SPEC`, never here.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "LOAD_CONST")]
  LoadConst  = 234,  // load_const( reg, const )
  #[strum(serialize = "READ_MEM")]
  ReadMem    = 102,  // read_mem( offset, dst, base )
  #[strum(serialize = "WRITE_MEM")]
  WriteMem   = 90,   // write_mem( src, addr )
  #[strum(serialize = "SHIFT_RIGHT")]
  ShiftRight = 224,  // shift_right( val, amount_addr, offset, base )
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn from_code(code: u8) -> Option<Opcode> {
    Opcode::try_from(code).ok()
  }

  /// Mnemonics are matched without regard to ASCII case.
  pub fn from_mnemonic(text: &str) -> Option<Opcode> {
    Opcode::from_str(&text.to_ascii_uppercase()).ok()
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  /// Number of operands, i.e. every field except the opcode byte.
  pub fn arity(&self) -> usize {
    INSTRUCTION_SPEC.layout(*self).operand_fields().len()
  }

  /// Encoded length in bytes.
  pub fn size(&self) -> usize {
    INSTRUCTION_SPEC.layout(*self).size
  }
}

/**
  A decoded instruction. Each variant holds its operands as plain integers in the order the
  fields appear in the encoding (B, C, D, E).

  The field types are wider than the encoded fields, so a value can be constructed that does
  not fit. The encoder rejects such values rather than truncating them.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// `registers[reg] = constant`
  LoadConst {
    reg      : Register,
    constant : i16
  },
  /// `registers[dst_reg] = memory[registers[base_reg] + offset]`
  ReadMem {
    offset   : i16,
    dst_reg  : Register,
    base_reg : Register
  },
  /// `memory[registers[addr_reg]] = registers[src_reg]`
  WriteMem {
    src_reg  : Register,
    addr_reg : Register
  },
  /**
    `memory[registers[base_reg] + offset] = registers[val_reg] >> memory[amount_addr]`

    The amount is read from memory at the 23-bit address `amount_addr`, not taken from a
    register plus an offset as in the register-operand reading of this instruction.
  */
  ShiftRight {
    val_reg     : Register,
    amount_addr : u32,
    offset      : i16,
    base_reg    : Register
  },
}

impl Instruction {

  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::LoadConst  { .. } => Opcode::LoadConst,
      Instruction::ReadMem    { .. } => Opcode::ReadMem,
      Instruction::WriteMem   { .. } => Opcode::WriteMem,
      Instruction::ShiftRight { .. } => Opcode::ShiftRight,
    }
  }

  /// The operand values in field order, ready for packing.
  pub fn operands(&self) -> Vec<i64> {
    match *self {
      Instruction::LoadConst { reg, constant } => {
        vec![reg as i64, constant as i64]
      }
      Instruction::ReadMem { offset, dst_reg, base_reg } => {
        vec![offset as i64, dst_reg as i64, base_reg as i64]
      }
      Instruction::WriteMem { src_reg, addr_reg } => {
        vec![src_reg as i64, addr_reg as i64]
      }
      Instruction::ShiftRight { val_reg, amount_addr, offset, base_reg } => {
        vec![val_reg as i64, amount_addr as i64, offset as i64, base_reg as i64]
      }
    }
  }

  /**
    Builds an instruction from operand values given in field order. Every value is checked
    against the width and signedness of its field, so a successful result always encodes
    without loss.
  */
  pub fn from_operands(opcode: Opcode, operands: &[i64]) -> Result<Instruction, EncodeError> {
    INSTRUCTION_SPEC.check_operands(opcode, operands)?;

    // The range check above guarantees every conversion below succeeds.
    let register = |i: usize| -> Register { operands[i] as Register };
    let signed   = |i: usize| -> i16 { operands[i] as i16 };

    let instruction =
      match opcode {
        Opcode::LoadConst => Instruction::LoadConst {
          reg      : register(0),
          constant : signed(1),
        },
        Opcode::ReadMem => Instruction::ReadMem {
          offset   : signed(0),
          dst_reg  : register(1),
          base_reg : register(2),
        },
        Opcode::WriteMem => Instruction::WriteMem {
          src_reg  : register(0),
          addr_reg : register(1),
        },
        Opcode::ShiftRight => Instruction::ShiftRight {
          val_reg     : register(0),
          amount_addr : operands[1] as u32,
          offset      : signed(2),
          base_reg    : register(3),
        },
      };

    Ok(instruction)
  }
}

/// Renders the instruction as a row of assembly source, e.g. `LOAD_CONST, 2, 455`.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.opcode())?;
    for operand in self.operands() {
      write!(f, ", {}", operand)?;
    }
    Ok(())
  }
}

/*!
  This module is responsible for the encoding and decoding of binary instructions.

  An instruction's bytes are read as one little-endian integer, the accumulator: byte `i`
  supplies bits `8*i ..= 8*i + 7`. Fields are then inserted into or extracted from the
  accumulator purely from the layout in `isa::INSTRUCTION_SPEC`. The longest instruction is
  seven bytes, so a `u64` accumulator always suffices.
*/

use super::instruction::Instruction;
use super::isa::{Layout, INSTRUCTION_SPEC};
use crate::error::{DecodeError, EncodeError};

/// Packs `values`, one per field of `layout` (opcode byte included), into the layout's bytes.
pub fn pack(layout: &Layout, values: &[i64]) -> Vec<u8> {
  let accumulator =
    layout.fields.iter()
          .zip(values)
          .fold(0u64, |acc, (field, &value)| field.insert(acc, value));

  accumulator.to_le_bytes()[..layout.size].to_vec()
}

/// Inverse of `pack`. `bytes` must hold at least `layout.size` bytes; extra bytes are ignored.
pub fn unpack(layout: &Layout, bytes: &[u8]) -> Vec<i64> {
  let accumulator =
    bytes[..layout.size].iter()
                        .enumerate()
                        .fold(0u64, |acc, (i, &byte)| acc | (byte as u64) << (8 * i));

  layout.fields.iter().map(|field| field.extract(accumulator)).collect()
}

/**
  Encodes the instruction into bytecode. Fails with `EncodeError::FieldOverflow` if any
  operand does not fit its field; nothing is ever silently truncated.
*/
pub fn encode_instruction(instruction: &Instruction) -> Result<Vec<u8>, EncodeError> {
  let opcode   = instruction.opcode();
  let operands = instruction.operands();
  INSTRUCTION_SPEC.check_operands(opcode, &operands)?;

  let mut values = vec![opcode.code() as i64];
  values.extend(operands);

  Ok(pack(INSTRUCTION_SPEC.layout(opcode), &values))
}

/// Encodes a sequence of instructions back to back, with no header or padding.
pub fn encode_program(instructions: &[Instruction]) -> Result<Vec<u8>, EncodeError> {
  let mut bytes = Vec::new();
  for instruction in instructions {
    bytes.extend(encode_instruction(instruction)?);
  }
  Ok(bytes)
}

/**
  Decodes the instruction starting at `buffer[offset]`, returning it along with the number of
  bytes it occupies.

  Bits not covered by any field are ignored.
*/
pub fn decode_instruction(buffer: &[u8], offset: usize) -> Result<(Instruction, usize), DecodeError> {
  let code =
    match buffer.get(offset) {
      Some(&code) => code,
      None => return Err(DecodeError::OutOfRange { offset, len: buffer.len() })
    };

  let layout = INSTRUCTION_SPEC.lookup(code)
                               .map_err(|_| DecodeError::UnknownOpcode { offset, code })?;

  let available = buffer.len() - offset;
  if available < layout.size {
    return Err(DecodeError::TruncatedInstruction {
      offset,
      opcode : layout.opcode,
      needed : layout.size,
      available
    });
  }

  let values = unpack(layout, &buffer[offset..]);
  let instruction =
    Instruction::from_operands(layout.opcode, &values[1..])
      .map_err(|source| DecodeError::InvalidOperands { offset, opcode: layout.opcode, source })?;

  Ok((instruction, layout.size))
}

/// Decodes every instruction of `buffer`, pairing each with its byte offset.
pub fn disassemble(buffer: &[u8]) -> Result<Vec<(usize, Instruction)>, DecodeError> {
  let mut offset = 0;
  let mut instructions = Vec::new();

  while offset < buffer.len() {
    let (instruction, size) = decode_instruction(buffer, offset)?;
    instructions.push((offset, instruction));
    offset += size;
  }

  Ok(instructions)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::Opcode;

  fn encode(instruction: Instruction) -> Vec<u8> {
    encode_instruction(&instruction).unwrap()
  }

  #[test]
  fn write_mem_vector() {
    let bytes = encode(Instruction::WriteMem { src_reg: 5, addr_reg: 2 });
    assert_eq!(bytes, vec![0x5A, 0x15]);
  }

  #[test]
  fn shift_right_vector() {
    let bytes = encode(Instruction::ShiftRight {
      val_reg     : 5,
      amount_addr : 420,
      offset      : 593,
      base_reg    : 3
    });
    assert_eq!(bytes, vec![0xE0, 0x25, 0x0D, 0x00, 0x44, 0x89, 0x01]);
  }

  #[test]
  fn load_const_packs_fields_only() {
    let bytes = encode(Instruction::LoadConst { reg: 2, constant: 455 });
    assert_eq!(bytes, vec![0xEA, 0x3A, 0x0E]);

    // The reference bytes carry two extra bits inside field C.
    let (decoded, size) = decode_instruction(&[0xEA, 0x3A, 0x6E], 0).unwrap();
    assert_eq!(size, 3);
    assert_eq!(decoded, Instruction::LoadConst { reg: 2, constant: 3527 });
  }

  #[test]
  fn read_mem_ignores_undeclared_bits() {
    let bytes = encode(Instruction::ReadMem { offset: 486, dst_reg: 6, base_reg: 1 });
    assert_eq!(bytes, vec![0x66, 0xE6, 0xC1, 0x01]);

    // Bit 31 of the reference encoding lies outside every field.
    let (decoded, size) = decode_instruction(&[0x66, 0xE6, 0xC1, 0x81], 0).unwrap();
    assert_eq!(size, 4);
    assert_eq!(decoded, Instruction::ReadMem { offset: 486, dst_reg: 6, base_reg: 1 });
  }

  #[test]
  fn signed_fields_decode_negative() {
    // Raw 4096 in field C has the sign bit set.
    let raw = 234u32 | (1 << 8) | (4096 << 11);
    let bytes = &raw.to_le_bytes()[..3];
    assert_eq!(
      decode_instruction(bytes, 0).unwrap().0,
      Instruction::LoadConst { reg: 1, constant: -4096 }
    );

    let raw = 234u32 | (1 << 8) | (4095 << 11);
    let bytes = &raw.to_le_bytes()[..3];
    assert_eq!(
      decode_instruction(bytes, 0).unwrap().0,
      Instruction::LoadConst { reg: 1, constant: 4095 }
    );
  }

  #[test]
  fn round_trip_field_extremes() {
    let mut cases = vec![];
    for &reg in &[0u8, 3, 7] {
      for &signed in &[-4096i16, -1, 0, 1, 4095] {
        cases.push(Instruction::LoadConst { reg, constant: signed });
        cases.push(Instruction::ReadMem { offset: signed, dst_reg: reg, base_reg: 7 - reg });
        cases.push(Instruction::WriteMem { src_reg: reg, addr_reg: 7 - reg });
        for &amount_addr in &[0u32, 1, 420, (1 << 23) - 1] {
          cases.push(Instruction::ShiftRight {
            val_reg  : reg,
            amount_addr,
            offset   : signed,
            base_reg : 7 - reg
          });
        }
      }
    }

    for instruction in cases {
      let bytes = encode(instruction);
      assert_eq!(bytes.len(), instruction.opcode().size());
      assert_eq!(decode_instruction(&bytes, 0), Ok((instruction, bytes.len())));
    }
  }

  #[test]
  fn round_trip_every_write_mem() {
    for src_reg in 0..8u8 {
      for addr_reg in 0..8u8 {
        let instruction = Instruction::WriteMem { src_reg, addr_reg };
        let bytes = encode(instruction);
        assert_eq!(decode_instruction(&bytes, 0), Ok((instruction, 2)));
      }
    }
  }

  #[test]
  fn round_trip_every_load_const() {
    for reg in 0..8u8 {
      for constant in -4096i16..=4095 {
        let instruction = Instruction::LoadConst { reg, constant };
        let bytes = encode(instruction);
        assert_eq!(decode_instruction(&bytes, 0), Ok((instruction, 3)));
      }
    }
  }

  #[test]
  fn invalid_operands_name_the_offset() {
    let error = DecodeError::InvalidOperands {
      offset : 5,
      opcode : Opcode::WriteMem,
      source : EncodeError::OperandCount { opcode: Opcode::WriteMem, expected: 2, found: 1 },
    };
    assert_eq!(
      error.to_string(),
      "WRITE_MEM at offset 5 has invalid operands: WRITE_MEM takes 2 operands but was given 1"
    );
  }

  #[test]
  fn encode_rejects_overflow() {
    assert_eq!(
      encode_instruction(&Instruction::WriteMem { src_reg: 8, addr_reg: 0 }),
      Err(EncodeError::FieldOverflow {
        opcode : Opcode::WriteMem,
        field  : 'B',
        value  : 8,
        min    : 0,
        max    : 7
      })
    );
    assert!(encode_instruction(&Instruction::LoadConst { reg: 0, constant: 4096 }).is_err());
    assert!(encode_instruction(&Instruction::ShiftRight {
      val_reg: 0, amount_addr: 1 << 23, offset: 0, base_reg: 0
    }).is_err());
  }

  #[test]
  fn unknown_opcode() {
    assert_eq!(
      decode_instruction(&[0x5A, 0x15, 0x00], 2),
      Err(DecodeError::UnknownOpcode { offset: 2, code: 0 })
    );
  }

  #[test]
  fn truncated_instruction() {
    assert_eq!(
      decode_instruction(&[0xE0, 0x25, 0x0D], 0),
      Err(DecodeError::TruncatedInstruction {
        offset    : 0,
        opcode    : Opcode::ShiftRight,
        needed    : 7,
        available : 3
      })
    );
  }

  #[test]
  fn offset_past_end() {
    assert_eq!(
      decode_instruction(&[0x5A, 0x15], 2),
      Err(DecodeError::OutOfRange { offset: 2, len: 2 })
    );
  }

  #[test]
  fn program_round_trip() {
    let program = vec![
      Instruction::LoadConst { reg: 1, constant: 100 },
      Instruction::ShiftRight { val_reg: 1, amount_addr: 7, offset: -3, base_reg: 2 },
      Instruction::ReadMem { offset: -5, dst_reg: 4, base_reg: 1 },
      Instruction::WriteMem { src_reg: 4, addr_reg: 1 },
    ];
    let bytes = encode_program(&program).unwrap();
    assert_eq!(bytes.len(), 3 + 7 + 4 + 2);

    let decoded = disassemble(&bytes).unwrap();
    assert_eq!(
      decoded.iter().map(|(offset, _)| *offset).collect::<Vec<_>>(),
      vec![0, 3, 10, 14]
    );
    assert_eq!(decoded.into_iter().map(|(_, i)| i).collect::<Vec<_>>(), program);
  }
}

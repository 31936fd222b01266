/*!
  The human readable form of a program is a comma separated table, one instruction per line:

  ```text
  # copy the value at address 10 into address 20
  LOAD_CONST,  1, 10
  READ_MEM,    0, 2, 1
  LOAD_CONST,  3, 20
  WRITE_MEM,   2, 3
  ```

  The first cell names the operation, either by mnemonic (any ASCII case) or by its decimal
  opcode byte. The remaining cells are integer operands in field order. Integers are decimal
  with an optional sign, or hexadecimal with a `0x` prefix. Blank lines are skipped, and `#`
  starts a comment that runs to the end of the line.
*/

use nom::{
  IResult,
  branch::alt,
  bytes::complete::{is_not, tag_no_case},
  character::complete::{char as one_char, digit1, hex_digit1, one_of},
  combinator::{all_consuming, map_res, opt, recognize, rest},
  multi::separated_list,
  sequence::{pair, preceded, terminated},
};

use super::binary::encode_instruction;
use super::instruction::{Instruction, Opcode};
use crate::error::{AssemblyError, ParseError, ParseErrorKind};

/// One parsed line of source, before range checking.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
  /// 1-based line number in the source text.
  pub line     : usize,
  pub opcode   : Opcode,
  pub operands : Vec<i64>,
}

/// An instruction together with where it came from and where it landed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssembledInstruction {
  pub line        : usize,
  pub offset      : usize,
  pub instruction : Instruction,
  pub bytes       : Vec<u8>,
}

/// The result of assembling a whole source text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Assembled {
  pub instructions : Vec<AssembledInstruction>,
  pub bytes        : Vec<u8>,
}

// region Parsers

fn decimal(input: &str) -> IResult<&str, i64> {
  map_res(
    recognize(pair(opt(one_of("+-")), digit1)),
    |text: &str| text.parse::<i64>()
  )(input)
}

fn hexadecimal(input: &str) -> IResult<&str, i64> {
  map_res(
    pair(opt(one_of("+-")), preceded(tag_no_case("0x"), hex_digit1)),
    |(sign, digits): (Option<char>, &str)| {
      i64::from_str_radix(digits, 16).map(|value| {
        match sign {
          Some('-') => -value,
          _         => value
        }
      })
    }
  )(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
  alt((hexadecimal, decimal))(input)
}

/// Splits a line into its cells, dropping a trailing comment.
fn cells(input: &str) -> IResult<&str, Vec<&str>> {
  all_consuming(
    terminated(
      separated_list(one_char(','), is_not(",#")),
      opt(preceded(one_char('#'), rest))
    )
  )(input)
}

// endregion

/// Parses one cell as a complete integer.
fn parse_integer(cell: &str) -> Option<i64> {
  all_consuming(integer)(cell).ok().map(|(_, value)| value)
}

fn parse_opcode(cell: &str) -> Option<Opcode> {
  match parse_integer(cell) {
    Some(code) if 0 <= code && code <= u8::MAX as i64 => Opcode::from_code(code as u8),
    Some(_) => None,
    None    => Opcode::from_mnemonic(cell)
  }
}

/// Parses a single line. Blank and comment-only lines yield `Ok(None)`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<SourceLine>, ParseError> {
  let error = |kind| ParseError { line, kind };

  let cells: Vec<&str> =
    match cells(text.trim()) {
      Ok((_, cells)) => cells.into_iter().map(str::trim).collect(),
      Err(nom::Err::Error((remaining, _))) | Err(nom::Err::Failure((remaining, _))) => {
        return Err(error(ParseErrorKind::Syntax(remaining.to_string())));
      }
      Err(nom::Err::Incomplete(_)) => {
        return Err(error(ParseErrorKind::Syntax(text.to_string())));
      }
    };

  let (name, operand_cells) =
    match cells.split_first() {
      None => return Ok(None),
      Some(split) => split
    };

  let opcode = parse_opcode(name)
    .ok_or_else(|| error(ParseErrorKind::UnknownMnemonic(name.to_string())))?;

  if operand_cells.len() != opcode.arity() {
    return Err(error(ParseErrorKind::WrongOperandCount {
      opcode,
      expected : opcode.arity(),
      found    : operand_cells.len()
    }));
  }

  let operands =
    operand_cells.iter()
                 .map(|cell| {
                   parse_integer(cell)
                     .ok_or_else(|| error(ParseErrorKind::InvalidOperand(cell.to_string())))
                 })
                 .collect::<Result<Vec<i64>, ParseError>>()?;

  Ok(Some(SourceLine { line, opcode, operands }))
}

/// Parses a whole source text, stopping at the first bad line.
pub fn parse_assembly(text: &str) -> Result<Vec<SourceLine>, ParseError> {
  let mut lines = Vec::new();
  for (index, line_text) in text.lines().enumerate() {
    if let Some(line) = parse_line(index + 1, line_text)? {
      lines.push(line);
    }
  }
  Ok(lines)
}

/**
  Translates source text into a binary program. Either every line assembles or nothing is
  produced: the first parse error or out-of-range operand aborts the whole translation.
*/
pub fn assemble(text: &str) -> Result<Assembled, AssemblyError> {
  let mut assembled = Assembled::default();

  for SourceLine { line, opcode, operands } in parse_assembly(text)? {
    let instruction = Instruction::from_operands(opcode, &operands)
      .map_err(|source| AssemblyError::Encode { line, source })?;
    let bytes = encode_instruction(&instruction)
      .map_err(|source| AssemblyError::Encode { line, source })?;

    assembled.instructions.push(AssembledInstruction {
      line,
      offset: assembled.bytes.len(),
      instruction,
      bytes: bytes.clone(),
    });
    assembled.bytes.extend(bytes);
  }

  Ok(assembled)
}

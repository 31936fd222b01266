//! Tabular listings of assembled programs, for verbose output.

use prettytable::{format as TableFormat, Table};

use super::assembly::AssembledInstruction;

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Formats bytes as `0xEA, 0x3A, 0x0E`.
pub fn hex_bytes(bytes: &[u8]) -> String {
  bytes.iter()
       .map(|byte| format!("0x{:02X}", byte))
       .collect::<Vec<String>>()
       .join(", ")
}

/// One row per instruction: source line, byte offset, encoded bytes and the instruction.
pub fn listing_table(instructions: &[AssembledInstruction]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Line", ubr->"Offset", ubl->"Bytes", ubl->"Instruction"]);

  for entry in instructions {
    table.add_row(row![
      r->entry.line,
      r->entry.offset,
      hex_bytes(&entry.bytes),
      entry.instruction
    ]);
  }

  table
}

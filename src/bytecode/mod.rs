/*!

  The VM has four instructions, each with its own length: 2, 3, 4 or 7 bytes. The first byte
  of every instruction is its opcode, and the opcode alone determines the length and the
  layout of the remaining bits. Operand fields are not byte aligned; a field can start in the
  middle of one byte and end in the middle of another. Sizes of the instruction components:

    Opcode:            8 bits
    Register:          3 bits
    Signed constant:  13 bits
    Signed offset:    13 bits
    Memory address:   23 bits

  The field table in `isa` is the single description of that layout. `binary` packs and
  unpacks fields using nothing but that table, `assembly` turns source text into
  `Instruction`s, and `listing` renders what came out.

  Unlike the encoded form, an `Instruction` is a plain enum with one variant per opcode and
  the operands stored as ordinary integers, so the interpreter can match on it exhaustively
  once per step.

*/

mod assembly;
mod binary;
mod instruction;
mod isa;
mod listing;
mod program;

pub use assembly::{assemble, parse_assembly, parse_line, AssembledInstruction, Assembled, SourceLine};
pub use binary::{decode_instruction, disassemble, encode_instruction, encode_program, pack, unpack};
pub use instruction::{Instruction, Opcode, Register};
pub use isa::{Field, FieldKind, InstructionSpec, Layout, INSTRUCTION_SPEC};
pub use listing::{hex_bytes, listing_table};
pub(crate) use listing::TABLE_DISPLAY_FORMAT;
pub use program::Program;

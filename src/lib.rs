//! An assembler and interpreter for a small virtual machine whose instructions are packed into
//! variable-length, non-byte-aligned binary words.

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod dump;
pub mod error;
pub mod memory;
pub mod vm;

pub use bytecode::{assemble, Instruction, Opcode, Program, INSTRUCTION_SPEC};
pub use error::{Error, Result};
pub use vm::{Engine, Outcome, RunSummary, State, VmConfig};

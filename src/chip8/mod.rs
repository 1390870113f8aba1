//! The full implementation of the chip8 interpreter, the machine state with
//! its scheduler and the opcode table.
mod chipset;
mod opcodes;

/// reexport chipset structs and data for simpler usage
pub use chipset::*;

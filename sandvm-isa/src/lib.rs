//! # sandvm instruction set
//!
//! Byte-level instruction definitions for the sandvm register machine.
//!
//! ## Key Features
//! - Four 64-bit registers (R1-R4), no stack, no call/return
//! - One-byte opcodes, little-endian inline operands
//! - Absolute 64-bit memory addresses and jump targets
//! - Host syscalls addressed by 64-bit id

pub mod opcode;
pub mod register;
pub mod writer;

pub use opcode::{Opcode, OpcodeFamily};
pub use register::{Register, NUM_REGISTERS};
pub use writer::BytecodeWriter;

/// Opcode value 0 is reserved and never decodes to an instruction.
pub const RESERVED_OPCODE: u8 = 0;

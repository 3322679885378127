//! Runtime error types for the sandvm interpreter
//!
//! The first error aborts the current `execute()` call and is returned to
//! the host; registers and memory keep all effects up to the failing
//! instruction.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Operand bytes would run past the end of the bytecode
    #[error("Instruction at offset {offset:#x} is missing operand bytes")]
    InvalidInstructionArgument { offset: u64 },

    /// Memory access or taken-jump target out of range
    #[error("Memory location {address:#x} is outside of the addressable range")]
    InvalidMemoryLocation { address: u64 },

    /// Syscall id not present in the table
    #[error("Invalid syscall: {id}")]
    InvalidSyscall { id: u64 },

    /// The deadline watcher fired before this instruction dispatched
    #[error("CPU time is exhausted")]
    CpuTimeExhausted,

    /// Opcode byte does not name a defined instruction
    #[error("Unknown instruction {opcode:#04x} at offset {offset:#x}")]
    UnknownInstruction { opcode: u8, offset: u64 },

    /// The deadline watcher thread could not be spawned
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host-defined syscall failure, propagated verbatim
    #[error("{0}")]
    Host(String),
}

impl ExecError {
    /// Build the pass-through error a syscall handler reports to the guest
    pub fn host(message: impl Into<String>) -> Self {
        ExecError::Host(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;

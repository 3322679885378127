//! Bytecode emission
//!
//! [`BytecodeWriter`] appends one encoded instruction per call, with operands
//! written little-endian. Jump targets are absolute byte offsets; use
//! [`BytecodeWriter::position`] to capture the offset of the next
//! instruction before emitting it.

use crate::opcode::Opcode;

/// Append-only encoder for sandvm instruction streams
#[derive(Debug, Default, Clone)]
pub struct BytecodeWriter {
    buf: Vec<u8>,
}

impl BytecodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Byte offset at which the next instruction will be emitted
    #[inline]
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Emit a bare opcode byte. Operand-taking opcodes have dedicated
    /// methods; emitting one here produces a truncated instruction.
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.buf.push(opcode.to_u8());
        self
    }

    /// Emit raw bytes verbatim
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // ========== Immediate loads ==========

    pub fn load_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(Opcode::LoadU8.to_u8());
        self.buf.push(value);
        self
    }

    pub fn load_u16(&mut self, value: u16) -> &mut Self {
        self.buf.push(Opcode::LoadU16.to_u8());
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn load_u32(&mut self, value: u32) -> &mut Self {
        self.buf.push(Opcode::LoadU32.to_u8());
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn load_u64(&mut self, value: u64) -> &mut Self {
        self.buf.push(Opcode::LoadU64.to_u8());
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    // ========== Memory loads ==========

    pub fn mem_load_u8(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::MemLoadU8, addr)
    }

    pub fn mem_load_u16(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::MemLoadU16, addr)
    }

    pub fn mem_load_u32(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::MemLoadU32, addr)
    }

    pub fn mem_load_u64(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::MemLoadU64, addr)
    }

    // ========== Register moves ==========

    pub fn mov_r1_r2(&mut self) -> &mut Self {
        self.op(Opcode::MoveR1R2)
    }

    pub fn mov_r1_r3(&mut self) -> &mut Self {
        self.op(Opcode::MoveR1R3)
    }

    pub fn mov_r2_r1(&mut self) -> &mut Self {
        self.op(Opcode::MoveR2R1)
    }

    pub fn mov_r2_r3(&mut self) -> &mut Self {
        self.op(Opcode::MoveR2R3)
    }

    pub fn mov_r3_r1(&mut self) -> &mut Self {
        self.op(Opcode::MoveR3R1)
    }

    pub fn mov_r3_r2(&mut self) -> &mut Self {
        self.op(Opcode::MoveR3R2)
    }

    pub fn mov_r4_r1(&mut self) -> &mut Self {
        self.op(Opcode::MoveR4R1)
    }

    pub fn mov_r4_r2(&mut self) -> &mut Self {
        self.op(Opcode::MoveR4R2)
    }

    pub fn mov_r4_r3(&mut self) -> &mut Self {
        self.op(Opcode::MoveR4R3)
    }

    // ========== Memory stores ==========

    pub fn dump_u8(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::DumpU8, addr)
    }

    pub fn dump_u16(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::DumpU16, addr)
    }

    pub fn dump_u32(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::DumpU32, addr)
    }

    pub fn dump_u64(&mut self, addr: u64) -> &mut Self {
        self.with_addr(Opcode::DumpU64, addr)
    }

    // ========== Arithmetic ==========

    pub fn unsigned_add(&mut self) -> &mut Self {
        self.op(Opcode::UnsignedAdd)
    }

    pub fn signed_add(&mut self) -> &mut Self {
        self.op(Opcode::SignedAdd)
    }

    pub fn unsigned_sub(&mut self) -> &mut Self {
        self.op(Opcode::UnsignedSub)
    }

    pub fn signed_sub(&mut self) -> &mut Self {
        self.op(Opcode::SignedSub)
    }

    pub fn unsigned_div(&mut self) -> &mut Self {
        self.op(Opcode::UnsignedDiv)
    }

    pub fn signed_div(&mut self) -> &mut Self {
        self.op(Opcode::SignedDiv)
    }

    pub fn unsigned_mod(&mut self) -> &mut Self {
        self.op(Opcode::UnsignedMod)
    }

    pub fn signed_mod(&mut self) -> &mut Self {
        self.op(Opcode::SignedMod)
    }

    // ========== Bitwise ==========

    pub fn and(&mut self) -> &mut Self {
        self.op(Opcode::And)
    }

    pub fn or(&mut self) -> &mut Self {
        self.op(Opcode::Or)
    }

    pub fn xor(&mut self) -> &mut Self {
        self.op(Opcode::Xor)
    }

    pub fn left_shift(&mut self) -> &mut Self {
        self.op(Opcode::LeftShift)
    }

    pub fn right_shift(&mut self) -> &mut Self {
        self.op(Opcode::RightShift)
    }

    // ========== Jumps ==========

    pub fn jmp(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::Jmp, target)
    }

    pub fn jmp_if_eq(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::JmpIfEq, target)
    }

    pub fn jmp_if_ne(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::JmpIfNe, target)
    }

    pub fn jmp_if_gt(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::JmpIfGt, target)
    }

    pub fn jmp_if_lt(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::JmpIfLt, target)
    }

    pub fn jmp_if_ge(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::JmpIfGe, target)
    }

    pub fn jmp_if_le(&mut self, target: u64) -> &mut Self {
        self.with_addr(Opcode::JmpIfLe, target)
    }

    // ========== System ==========

    pub fn syscall(&mut self, id: u64) -> &mut Self {
        self.with_addr(Opcode::Syscall, id)
    }

    fn with_addr(&mut self, opcode: Opcode, value: u64) -> &mut Self {
        self.buf.push(opcode.to_u8());
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }
}

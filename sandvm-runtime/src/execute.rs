//! The fetch/decode/execute loop
//!
//! One iteration per instruction: sample the stop flag (only when a
//! deadline is armed), decode the opcode byte, prove the operand bytes lie
//! inside the bytecode, execute, advance. Taken jumps re-enter the loop top
//! so jump-only loops still observe the stop flag.
//!
//! Every instruction is all-or-nothing: its checks run before any register
//! or memory write, so an aborted instruction leaves the machine exactly as
//! the previous one did.

use crate::error::{ExecError, Result};
use crate::vm::Vm;
use sandvm_isa::{Opcode, Register};
use std::sync::atomic::{AtomicBool, Ordering};

use Register::{R1, R2, R3, R4};

/// Run `bytecode` to completion on `vm`.
///
/// The loop halts with success when the instruction pointer reaches the
/// bytecode length exactly; empty bytecode succeeds immediately.
pub(crate) fn run(vm: &mut Vm, bytecode: &[u8], stop: Option<&AtomicBool>) -> Result<()> {
    let len = bytecode.len();
    let mut ip = 0usize;

    while ip != len {
        if let Some(flag) = stop {
            if flag.load(Ordering::Acquire) {
                return Err(ExecError::CpuTimeExhausted);
            }
        }

        let byte = bytecode[ip];
        let op = match Opcode::from_u8(byte) {
            Some(op) => op,
            None => {
                return Err(ExecError::UnknownInstruction {
                    opcode: byte,
                    offset: ip as u64,
                })
            }
        };

        // Operand containment: the whole instruction must end at or before
        // the end of the bytecode, checked before any operand byte is read.
        let next = ip + 1 + op.operand_len();
        if next > len {
            return Err(ExecError::InvalidInstructionArgument { offset: ip as u64 });
        }
        let operands = &bytecode[ip + 1..next];

        if vm.config.trace {
            eprintln!("[{:#08x}] {}", ip, op);
        }

        match op {
            // ========== Immediate loads ==========
            Opcode::LoadU8 => {
                vm.registers.write(R1, u64::from(operands[0]));
                vm.registers.write(R4, 0);
            }
            Opcode::LoadU16 => {
                vm.registers.write(R1, u64::from(le_u16(operands)));
                vm.registers.write(R4, 0);
            }
            Opcode::LoadU32 => {
                vm.registers.write(R1, u64::from(le_u32(operands)));
                vm.registers.write(R4, 0);
            }
            Opcode::LoadU64 => {
                vm.registers.write(R1, le_u64(operands));
                vm.registers.write(R4, 0);
            }

            // ========== Memory loads ==========
            Opcode::MemLoadU8 => {
                let value = vm.memory.read_u8(le_u64(operands))?;
                vm.registers.write(R1, u64::from(value));
                vm.registers.write(R4, 0);
            }
            Opcode::MemLoadU16 => {
                let value = vm.memory.read_u16(le_u64(operands))?;
                vm.registers.write(R1, u64::from(value));
                vm.registers.write(R4, 0);
            }
            Opcode::MemLoadU32 => {
                let value = vm.memory.read_u32(le_u64(operands))?;
                vm.registers.write(R1, u64::from(value));
                vm.registers.write(R4, 0);
            }
            Opcode::MemLoadU64 => {
                let value = vm.memory.read_u64(le_u64(operands))?;
                vm.registers.write(R1, value);
                vm.registers.write(R4, 0);
            }

            // ========== Register moves ==========
            Opcode::MoveR1R2 => {
                vm.registers.write(R2, vm.registers.read(R1));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR1R3 => {
                vm.registers.write(R3, vm.registers.read(R1));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR2R1 => {
                vm.registers.write(R1, vm.registers.read(R2));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR2R3 => {
                vm.registers.write(R3, vm.registers.read(R2));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR3R1 => {
                vm.registers.write(R1, vm.registers.read(R3));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR3R2 => {
                vm.registers.write(R2, vm.registers.read(R3));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR4R1 => {
                vm.registers.write(R1, vm.registers.read(R4));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR4R2 => {
                vm.registers.write(R2, vm.registers.read(R4));
                vm.registers.write(R4, 0);
            }
            Opcode::MoveR4R3 => {
                vm.registers.write(R3, vm.registers.read(R4));
                vm.registers.write(R4, 0);
            }

            // ========== Memory stores ==========
            Opcode::DumpU8 => {
                let value = vm.registers.read(R1) as u8;
                vm.memory.write_u8(le_u64(operands), value)?;
                vm.registers.write(R4, 0);
            }
            Opcode::DumpU16 => {
                let value = vm.registers.read(R1) as u16;
                vm.memory.write_u16(le_u64(operands), value)?;
                vm.registers.write(R4, 0);
            }
            Opcode::DumpU32 => {
                let value = vm.registers.read(R1) as u32;
                vm.memory.write_u32(le_u64(operands), value)?;
                vm.registers.write(R4, 0);
            }
            Opcode::DumpU64 => {
                let value = vm.registers.read(R1);
                vm.memory.write_u64(le_u64(operands), value)?;
                vm.registers.write(R4, 0);
            }

            // ========== Addition / subtraction ==========
            Opcode::UnsignedAdd => {
                let sum = vm.registers.read(R1).wrapping_add(vm.registers.read(R2));
                vm.registers.write(R1, sum);
                vm.registers.write(R4, 0);
            }
            Opcode::SignedAdd => {
                let sum = (vm.registers.read(R1) as i64).wrapping_add(vm.registers.read(R2) as i64);
                vm.registers.write(R1, sum as u64);
                vm.registers.write(R4, 0);
            }
            Opcode::UnsignedSub => {
                let diff = vm.registers.read(R1).wrapping_sub(vm.registers.read(R2));
                vm.registers.write(R1, diff);
                vm.registers.write(R4, 0);
            }
            Opcode::SignedSub => {
                let diff =
                    (vm.registers.read(R1) as i64).wrapping_sub(vm.registers.read(R2) as i64);
                vm.registers.write(R1, diff as u64);
                vm.registers.write(R4, 0);
            }

            // ========== Division / modulo ==========
            // Zero divisor: R1 untouched, R4 = 1. The signed wrapping forms
            // also keep i64::MIN / -1 from trapping.
            Opcode::UnsignedDiv => {
                let divisor = vm.registers.read(R2);
                if divisor == 0 {
                    vm.registers.write(R4, 1);
                } else {
                    let quotient = vm.registers.read(R1) / divisor;
                    vm.registers.write(R1, quotient);
                    vm.registers.write(R4, 0);
                }
            }
            Opcode::SignedDiv => {
                let divisor = vm.registers.read(R2);
                if divisor == 0 {
                    vm.registers.write(R4, 1);
                } else {
                    let quotient = (vm.registers.read(R1) as i64).wrapping_div(divisor as i64);
                    vm.registers.write(R1, quotient as u64);
                    vm.registers.write(R4, 0);
                }
            }
            Opcode::UnsignedMod => {
                let divisor = vm.registers.read(R2);
                if divisor == 0 {
                    vm.registers.write(R4, 1);
                } else {
                    let remainder = vm.registers.read(R1) % divisor;
                    vm.registers.write(R1, remainder);
                    vm.registers.write(R4, 0);
                }
            }
            Opcode::SignedMod => {
                let divisor = vm.registers.read(R2);
                if divisor == 0 {
                    vm.registers.write(R4, 1);
                } else {
                    let remainder = (vm.registers.read(R1) as i64).wrapping_rem(divisor as i64);
                    vm.registers.write(R1, remainder as u64);
                    vm.registers.write(R4, 0);
                }
            }

            // ========== Bitwise ==========
            Opcode::And => {
                let value = vm.registers.read(R1) & vm.registers.read(R2);
                vm.registers.write(R1, value);
                vm.registers.write(R4, 0);
            }
            Opcode::Or => {
                let value = vm.registers.read(R1) | vm.registers.read(R2);
                vm.registers.write(R1, value);
                vm.registers.write(R4, 0);
            }
            Opcode::Xor => {
                let value = vm.registers.read(R1) ^ vm.registers.read(R2);
                vm.registers.write(R1, value);
                vm.registers.write(R4, 0);
            }
            Opcode::LeftShift => {
                let shamt = (vm.registers.read(R2) & 63) as u32;
                let value = vm.registers.read(R1) << shamt;
                vm.registers.write(R1, value);
                vm.registers.write(R4, 0);
            }
            Opcode::RightShift => {
                let shamt = (vm.registers.read(R2) & 63) as u32;
                let value = vm.registers.read(R1) >> shamt;
                vm.registers.write(R1, value);
                vm.registers.write(R4, 0);
            }

            // ========== Jumps ==========
            // Jumps never touch R4. A not-taken conditional jump falls
            // through without validating its target.
            Opcode::Jmp => {
                ip = jump_target(le_u64(operands), len)?;
                continue;
            }
            Opcode::JmpIfEq => {
                if vm.registers.read(R1) == vm.registers.read(R3) {
                    ip = jump_target(le_u64(operands), len)?;
                    continue;
                }
            }
            Opcode::JmpIfNe => {
                if vm.registers.read(R1) != vm.registers.read(R3) {
                    ip = jump_target(le_u64(operands), len)?;
                    continue;
                }
            }
            Opcode::JmpIfGt => {
                if vm.registers.read(R1) > vm.registers.read(R3) {
                    ip = jump_target(le_u64(operands), len)?;
                    continue;
                }
            }
            Opcode::JmpIfLt => {
                if vm.registers.read(R1) < vm.registers.read(R3) {
                    ip = jump_target(le_u64(operands), len)?;
                    continue;
                }
            }
            Opcode::JmpIfGe => {
                if vm.registers.read(R1) >= vm.registers.read(R3) {
                    ip = jump_target(le_u64(operands), len)?;
                    continue;
                }
            }
            Opcode::JmpIfLe => {
                if vm.registers.read(R1) <= vm.registers.read(R3) {
                    ip = jump_target(le_u64(operands), len)?;
                    continue;
                }
            }

            // ========== Syscall ==========
            Opcode::Syscall => {
                let id = le_u64(operands);
                let handler = match vm.syscalls.get(id) {
                    Some(handler) => handler,
                    None => return Err(ExecError::InvalidSyscall { id }),
                };
                vm.registers.write(R4, 0);
                (*handler)(vm)?;
            }
        }

        ip = next;
    }

    Ok(())
}

/// Validate a taken-jump target: it must land strictly inside the bytecode
#[inline]
fn jump_target(target: u64, len: usize) -> Result<usize> {
    if target >= len as u64 {
        return Err(ExecError::InvalidMemoryLocation { address: target });
    }
    Ok(target as usize)
}

#[inline]
fn le_u16(bytes: &[u8]) -> u16 {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(bytes);
    u16::from_le_bytes(buf)
}

#[inline]
fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[inline]
fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

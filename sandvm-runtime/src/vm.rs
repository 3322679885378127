//! The sandvm virtual machine
//!
//! A [`Vm`] owns its register file, guest memory, and syscall table for its
//! whole lifetime; register and memory contents survive across `execute()`
//! calls until the host clears them. The bytecode buffer is borrowed
//! read-only for the duration of each call.

use crate::deadline::DeadlineWatcher;
use crate::error::Result;
use crate::execute;
use crate::memory::Memory;
use crate::registers::Registers;
use crate::syscall::SyscallTable;
use std::time::Duration;

/// VM configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Guest memory length in bytes (zero is legal)
    pub memory_len: usize,

    /// Wall-clock budget per `execute()` call; zero means unlimited
    pub max_cpu_time: Duration,

    /// Print one line per dispatched instruction to stderr
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            memory_len: 0,
            max_cpu_time: Duration::ZERO,
            trace: false,
        }
    }
}

/// An isolated register machine executing untrusted bytecode
#[derive(Debug)]
pub struct Vm {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    pub(crate) syscalls: SyscallTable,
    pub(crate) config: VmConfig,
}

impl Vm {
    /// Create a machine with a zeroed memory buffer of the given length,
    /// registers at 0, and an empty syscall table.
    pub fn new(memory_len: usize, max_cpu_time: Duration) -> Self {
        Self::with_config(VmConfig {
            memory_len,
            max_cpu_time,
            ..VmConfig::default()
        })
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            registers: Registers::new(),
            memory: Memory::new(config.memory_len),
            syscalls: SyscallTable::new(),
            config,
        }
    }

    /// Execute bytecode to completion.
    ///
    /// Runs synchronously and returns on the first error; registers and
    /// memory keep every effect up to (not including) the failing
    /// instruction. When a nonzero CPU-time budget is configured, a
    /// deadline watcher is armed for the duration of the call and torn
    /// down before returning, on success and on error alike.
    pub fn execute(&mut self, bytecode: &[u8]) -> Result<()> {
        if self.config.max_cpu_time.is_zero() {
            // No watcher, no atomic loads on the hot path.
            return execute::run(self, bytecode, None);
        }

        let watcher = DeadlineWatcher::arm(self.config.max_cpu_time)?;
        let result = execute::run(self, bytecode, Some(watcher.stop_flag()));
        drop(watcher);
        result
    }

    /// Set R1..R4 to 0.
    ///
    /// Behaviorally identical to executing
    /// `{ LoadU8 0, MoveR1R2, MoveR1R3 }`, which zeroes R4 as a side
    /// effect of the other instructions.
    pub fn clear_registers(&mut self) {
        self.registers.clear();
    }

    /// Zero every byte of guest memory
    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn syscalls(&self) -> &SyscallTable {
        &self.syscalls
    }

    /// Mutate the syscall table. Safe only while `execute()` is not in
    /// progress; during execution, handlers mutate the table through the
    /// `&mut Vm` they receive.
    pub fn syscalls_mut(&mut self) -> &mut SyscallTable {
        &mut self.syscalls
    }

    pub fn max_cpu_time(&self) -> Duration {
        self.config.max_cpu_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use sandvm_isa::{BytecodeWriter, Register};

    #[test]
    fn test_new_vm_is_zeroed() {
        let vm = Vm::new(16, Duration::ZERO);
        assert_eq!(vm.registers().as_array(), [0; 4]);
        assert_eq!(vm.memory().len(), 16);
        assert!(vm.memory().as_slice().iter().all(|&b| b == 0));
        assert!(vm.syscalls().is_empty());
    }

    #[test]
    fn test_empty_bytecode_succeeds_and_mutates_nothing() {
        let mut vm = Vm::new(4, Duration::ZERO);
        vm.execute(&[]).unwrap();
        assert_eq!(vm.registers().as_array(), [0; 4]);
        assert_eq!(vm.memory().as_slice(), &[0; 4]);
    }

    #[test]
    fn test_state_survives_across_executions() {
        let mut vm = Vm::new(1, Duration::ZERO);

        let mut first = BytecodeWriter::new();
        first.load_u8(0x7F).dump_u8(0);
        vm.execute(first.as_bytes()).unwrap();

        vm.execute(&[]).unwrap();
        let mut second = BytecodeWriter::new();
        second.mov_r1_r2();
        vm.execute(second.as_bytes()).unwrap();

        assert_eq!(vm.registers().read(Register::R1), 0x7F);
        assert_eq!(vm.registers().read(Register::R2), 0x7F);
        assert_eq!(vm.memory().read_u8(0).unwrap(), 0x7F);
    }

    #[test]
    fn test_clear_registers() {
        let mut vm = Vm::new(0, Duration::ZERO);
        vm.registers_mut().write(Register::R1, 1);
        vm.registers_mut().write(Register::R2, 2);
        vm.registers_mut().write(Register::R3, 3);
        vm.registers_mut().write(Register::R4, 4);

        vm.clear_registers();
        assert_eq!(vm.registers().as_array(), [0; 4]);
    }

    #[test]
    fn test_clear_registers_matches_reference_program() {
        // The reference definition: { LoadU8 0, MoveR1R2, MoveR1R3 }.
        let mut by_program = Vm::new(0, Duration::ZERO);
        let mut by_method = Vm::new(0, Duration::ZERO);
        for vm in [&mut by_program, &mut by_method] {
            vm.registers_mut().write(Register::R1, 11);
            vm.registers_mut().write(Register::R2, 22);
            vm.registers_mut().write(Register::R3, 33);
        }

        let mut program = BytecodeWriter::new();
        program.load_u8(0).mov_r1_r2().mov_r1_r3();
        by_program.execute(program.as_bytes()).unwrap();
        by_method.clear_registers();

        assert_eq!(
            by_program.registers().as_array(),
            by_method.registers().as_array()
        );
    }

    #[test]
    fn test_clear_memory() {
        let mut vm = Vm::new(8, Duration::ZERO);
        vm.memory_mut().write_u64(0, u64::MAX).unwrap();

        vm.clear_memory();
        assert_eq!(vm.memory().as_slice(), &[0; 8]);
    }

    #[test]
    fn test_failing_instruction_preserves_prior_effects() {
        let mut vm = Vm::new(0, Duration::ZERO);

        let mut program = BytecodeWriter::new();
        program.load_u8(0x55).dump_u8(0); // store into zero-length memory
        let err = vm.execute(program.as_bytes()).unwrap_err();

        assert!(matches!(err, ExecError::InvalidMemoryLocation { .. }));
        // The load before the failing dump is still visible.
        assert_eq!(vm.registers().read(Register::R1), 0x55);
    }

    #[test]
    fn test_syscall_handler_mutates_machine() {
        let mut vm = Vm::new(2, Duration::ZERO);
        vm.syscalls_mut().register(5, |vm| {
            let doubled = vm.registers().read(Register::R1) * 2;
            vm.registers_mut().write(Register::R1, doubled);
            vm.memory_mut().write_u8(0, 0xEE)?;
            Ok(())
        });

        let mut program = BytecodeWriter::new();
        program.load_u8(21).syscall(5);
        vm.execute(program.as_bytes()).unwrap();

        assert_eq!(vm.registers().read(Register::R1), 42);
        assert_eq!(vm.memory().read_u8(0).unwrap(), 0xEE);
    }

    #[test]
    fn test_syscall_handler_can_mutate_the_table() {
        let mut vm = Vm::new(0, Duration::ZERO);
        vm.syscalls_mut().register(1, |vm| {
            vm.syscalls_mut().unregister(1);
            vm.syscalls_mut().register(2, |_vm| Ok(()));
            Ok(())
        });

        let mut program = BytecodeWriter::new();
        program.syscall(1).syscall(2);
        vm.execute(program.as_bytes()).unwrap();

        assert!(!vm.syscalls().contains(1));
        assert!(vm.syscalls().contains(2));
    }

    #[test]
    fn test_deadline_stops_jump_only_loop() {
        let mut vm = Vm::new(0, Duration::from_millis(1));

        let mut program = BytecodeWriter::new();
        program.jmp(0);
        let err = vm.execute(program.as_bytes()).unwrap_err();
        assert!(matches!(err, ExecError::CpuTimeExhausted));
    }

    #[test]
    fn test_deadline_does_not_trip_short_programs() {
        let mut vm = Vm::new(0, Duration::from_secs(3600));

        let mut program = BytecodeWriter::new();
        program.load_u8(1).mov_r1_r2().unsigned_add();
        vm.execute(program.as_bytes()).unwrap();
        assert_eq!(vm.registers().read(Register::R1), 2);
    }

    #[test]
    fn test_watcher_is_rearmed_per_execute() {
        let mut vm = Vm::new(0, Duration::from_millis(20));

        let mut program = BytecodeWriter::new();
        program.load_u8(9);
        // Each call gets a fresh budget; none of them should trip.
        for _ in 0..3 {
            vm.execute(program.as_bytes()).unwrap();
        }
        assert_eq!(vm.registers().read(Register::R1), 9);
    }
}

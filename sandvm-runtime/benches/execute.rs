use criterion::{criterion_group, criterion_main, Criterion};
use sandvm_runtime::{BytecodeWriter, Register, Vm};
use std::time::Duration;

/// Count R1 up to `count` with a two-instruction loop.
fn counted_add_program(count: u32) -> Vec<u8> {
    let mut w = BytecodeWriter::new();
    w.load_u32(count).mov_r1_r3().load_u8(1).mov_r1_r2().load_u8(0);
    let loop_top = w.position();
    w.unsigned_add().jmp_if_ne(loop_top);
    w.into_bytes()
}

fn bench_counted_add(c: &mut Criterion) {
    let bytecode = counted_add_program(10_000_000);

    c.bench_function("execute_add_10m", |b| {
        let mut vm = Vm::new(0, Duration::ZERO);
        b.iter(|| {
            vm.execute(&bytecode).expect("execution failed");
            assert_eq!(vm.registers().read(Register::R1), 10_000_000);
        });
    });
}

fn bench_counted_add_with_deadline(c: &mut Criterion) {
    let bytecode = counted_add_program(10_000_000);

    // Same loop, but with the stop flag sampled on every dispatch. The
    // budget is far above the runtime, so the watcher never fires.
    c.bench_function("execute_add_10m_deadline_armed", |b| {
        let mut vm = Vm::new(0, Duration::from_secs(600));
        b.iter(|| {
            vm.execute(&bytecode).expect("execution failed");
            assert_eq!(vm.registers().read(Register::R1), 10_000_000);
        });
    });
}

criterion_group!(execute, bench_counted_add, bench_counted_add_with_deadline);
criterion_main!(execute);

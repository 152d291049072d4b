use boyemu_core::{Gameboy, GameboyOptions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// A cartridge-less ROM that just spins (`JR -2`) forever at the entry point,
/// so the benchmark measures steady-state dispatch cost rather than any
/// particular game's instruction mix.
fn spinning_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x100] = 0x18; // JR
    rom[0x101] = 0xFE; // -2
    rom
}

fn step_benchmark(c: &mut Criterion) {
    let rom = spinning_rom();
    let mut gameboy = Gameboy::new(&rom, GameboyOptions::default()).unwrap();

    c.bench_function("cpu step", |b| {
        b.iter(|| black_box(gameboy.step().unwrap()))
    });
}

fn frame_benchmark(c: &mut Criterion) {
    let rom = spinning_rom();
    let mut gameboy = Gameboy::new(&rom, GameboyOptions::default()).unwrap();

    c.bench_function("render one frame", |b| {
        b.iter(|| gameboy.run_frame().unwrap())
    });
}

criterion_group!(benches, step_benchmark, frame_benchmark);
criterion_main!(benches);

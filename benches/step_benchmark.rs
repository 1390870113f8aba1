use chip::{
    chip8::ChipSet,
    config::Config,
    resources::Rom,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Draws the font glyph of V0, bumps V0 and jumps back.
const DRAW_LOOP: [u8; 12] = [
    0x00, 0xE0, // clear
    0xF0, 0x29, // I = glyph(V0)
    0xD1, 0x25, // draw at (V1, V2)
    0x70, 0x01, // V0 += 1
    0x40, 0x10, // skip unless V0 == 16
    0x60, 0x00, // V0 = 0
];

fn setup_chip() -> ChipSet {
    let mut data = DRAW_LOOP.to_vec();
    // 1200 => jump back to the start
    data.extend_from_slice(&[0x12, 0x00]);
    let rom = Rom::new("DRAWLOOP", data).expect("the rom is valid");

    let mut chip = ChipSet::with_config(Config::default().with_rng_seed(0));
    chip.load(&rom);
    chip
}

pub fn step_bench(c: &mut Criterion) {
    let mut chip = setup_chip();
    c.bench_function("step_bench", |b| {
        b.iter(|| {
            let _ = black_box(chip.step());
        });
    });
}

criterion_group!(benches, step_bench);
criterion_main!(benches);

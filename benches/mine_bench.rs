use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use freqmine::{mine, Engine, IncidenceMatrix, MineMode, MineOptions, MinSupport};

/// Synthetic baskets with a skew toward low item ids, so the support
/// distribution resembles real transaction data.
fn synthetic(n_rows: usize, n_items: usize, max_len: usize, seed: u64) -> IncidenceMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<u32>> = (0..n_rows)
        .map(|_| {
            let len = rng.gen_range(1..=max_len);
            let mut row: Vec<u32> = (0..len)
                .map(|_| {
                    let x: f64 = rng.gen();
                    ((x * x) * n_items as f64) as u32
                })
                .collect();
            row.sort_unstable();
            row.dedup();
            row
        })
        .collect();
    let names = (0..n_items).map(|c| format!("item{c}")).collect();
    IncidenceMatrix::from_rows(rows, names, None).unwrap()
}

fn bench_mining(c: &mut Criterion) {
    let matrix = synthetic(2000, 100, 12, 42);
    let opts = |engine| MineOptions { max_len: None, engine };

    c.bench_function("frequent/fp-tree 2000x100", |b| {
        b.iter(|| {
            mine(
                black_box(&matrix),
                MineMode::Frequent,
                MinSupport::Fraction(0.02),
                opts(Engine::FpTree),
            )
            .unwrap()
        })
    });

    c.bench_function("frequent/tidset 2000x100", |b| {
        b.iter(|| {
            mine(
                black_box(&matrix),
                MineMode::Frequent,
                MinSupport::Fraction(0.02),
                opts(Engine::Tidset),
            )
            .unwrap()
        })
    });

    c.bench_function("closed/fp-tree 2000x100", |b| {
        b.iter(|| {
            mine(
                black_box(&matrix),
                MineMode::Closed,
                MinSupport::Fraction(0.02),
                opts(Engine::FpTree),
            )
            .unwrap()
        })
    });

    c.bench_function("closed/tidset 2000x100", |b| {
        b.iter(|| {
            mine(
                black_box(&matrix),
                MineMode::Closed,
                MinSupport::Fraction(0.02),
                opts(Engine::Tidset),
            )
            .unwrap()
        })
    });

    c.bench_function("maximal/fp-tree 2000x100", |b| {
        b.iter(|| {
            mine(
                black_box(&matrix),
                MineMode::Maximal,
                MinSupport::Fraction(0.02),
                opts(Engine::FpTree),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_mining);
criterion_main!(benches);

//! Highlight recompute cost: full aggregation vs. a keystroke-sized partial update.

use core_model::{AttentionMatrix, ContextSnapshot, Token};
use core_render::RenderEngine;
use core_render::attention::compute_highlights;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn synthetic_snapshot(n: usize) -> ContextSnapshot {
    let tokens = (0..n).map(|i| Token::new(format!("t{i:04} "))).collect();
    let rows = (0..n)
        .map(|i| {
            let w = 1.0 / (i + 1) as f64;
            vec![w; i + 1]
        })
        .collect();
    ContextSnapshot::new(tokens, AttentionMatrix::new(rows))
}

fn bench_compute_highlights(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_highlights");
    for n in [64usize, 256, 1024] {
        let snap = synthetic_snapshot(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &snap, |b, snap| {
            b.iter(|| compute_highlights(black_box(&snap.attention), black_box(n)))
        });
    }
    group.finish();
}

fn bench_partial_edit(c: &mut Criterion) {
    let snap = synthetic_snapshot(512);
    let mut edited = snap.text();
    edited.truncate(edited.len() / 2);
    c.bench_function("render_partial_midpoint_edit", |b| {
        let mut eng = RenderEngine::new();
        eng.render_full(snap.clone());
        b.iter(|| eng.render_partial(black_box(&edited)))
    });
}

criterion_group!(benches, bench_compute_highlights, bench_partial_edit);
criterion_main!(benches);

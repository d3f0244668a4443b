use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizpilot_core::model::AnswerRecord;
use quizpilot_core::similarity::{FixedComplexDifficulty, Neighbors};
use quizpilot_core::{AdaptiveParams, BanditSelector, ItemMeta, ItemScorer, ScoringContext, SessionState};

const NOW: i64 = 1_700_000_000_000;

fn make_pool(n: usize) -> Vec<ItemMeta> {
    (0..n)
        .map(|i| {
            ItemMeta::new(format!("q{i}"), (i % 5 + 1) as u8)
                .with_knowledge_points([format!("kp{}", i % 17), format!("kp{}", i % 23)])
        })
        .collect()
}

fn make_state(pool: &[ItemMeta]) -> SessionState {
    let mut state = SessionState::default();
    for (i, item) in pool.iter().enumerate().step_by(3) {
        state.record_selection(&item.id);
        state.record_answer(&item.id, AnswerRecord::new(Some(i % 2 == 0), NOW - i as i64));
    }
    state
}

fn ring_neighbors(id: &str) -> Option<Neighbors> {
    let n: usize = id.trim_start_matches('q').parse().ok()?;
    Some(
        (1..=10)
            .map(|d| (format!("q{}", n + d), 1.0 - d as f64 * 0.03))
            .collect(),
    )
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let pool = make_pool(500);
    let state = make_state(&pool);
    let scorer = ItemScorer::default();
    let complex = FixedComplexDifficulty(4);
    let recent: Vec<String> = (0..10).map(|i| format!("q{}", i * 7)).collect();

    group.bench_function("single_item", |b| {
        let ctx = ScoringContext::new(&recent, &ring_neighbors, &complex).at(NOW);
        b.iter(|| scorer.score(black_box(&pool[42]), black_box(&state), &ctx))
    });

    group.bench_function("pool_500", |b| {
        let ctx = ScoringContext::new(&recent, &ring_neighbors, &complex).at(NOW);
        b.iter(|| scorer.score_all(black_box(&pool), black_box(&state), &ctx))
    });

    group.finish();
}

fn bench_choose(c: &mut Criterion) {
    let mut group = c.benchmark_group("choose");
    let pool = make_pool(500);
    let state = make_state(&pool);
    let complex = FixedComplexDifficulty(3);
    let mut selector = BanditSelector::with_seed(AdaptiveParams::default(), 42);

    group.bench_function("top_10_of_500", |b| {
        let ctx = ScoringContext::new(&[], &ring_neighbors, &complex).at(NOW);
        b.iter(|| selector.choose(black_box(&pool), black_box(&state), &ctx, 10).len())
    });

    group.bench_function("full_pool_500", |b| {
        let ctx = ScoringContext::new(&[], &ring_neighbors, &complex).at(NOW);
        b.iter(|| selector.choose(black_box(&pool), black_box(&state), &ctx, 500).len())
    });

    group.finish();
}

criterion_group!(benches, bench_score, bench_choose);
criterion_main!(benches);

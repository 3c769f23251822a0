#![allow(missing_docs)]

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dakilang::{Atom, ConditionOp, Engine, EngineConfig, Fact};

fn fact(name: &str, args: Vec<Atom>) -> Fact {
    Fact::new(name, args)
}

/// `fib(0, 0). fib(1, 1). fib(N > 1, R) :- ...`
fn fib_engine() -> anyhow::Result<Engine> {
    let mut engine =
        Engine::with_config(EngineConfig::default().with_search_timeout(Duration::from_secs(120)));
    engine.add_clause(fact("fib", vec![Atom::int(0), Atom::int(0)]), vec![])?;
    engine.add_clause(fact("fib", vec![Atom::int(1), Atom::int(1)]), vec![])?;
    engine.add_clause(
        fact("fib", vec![Atom::var_when("N", ConditionOp::Gt, 1), Atom::var("R")]),
        vec![
            fact("sub", vec![Atom::var("N"), Atom::int(1), Atom::var("N1")]),
            fact("sub", vec![Atom::var("N"), Atom::int(2), Atom::var("N2")]),
            fact("fib", vec![Atom::var("N1"), Atom::var("R1")]),
            fact("fib", vec![Atom::var("N2"), Atom::var("R2")]),
            fact("add", vec![Atom::var("R1"), Atom::var("R2"), Atom::var("R")]),
        ],
    )?;
    Ok(engine)
}

/// Benchmark for asserting facts, each checked against the existing ones
fn bench_add_clauses(c: &mut Criterion) {
    c.bench_function("add_clauses", |b| {
        b.iter(|| {
            let mut engine = Engine::new();
            for i in 0..1000 {
                let head = fact("edge", vec![Atom::int(i), Atom::int(i + 1)]);
                let _ = engine.add_clause(black_box(head), vec![]);
            }
            black_box(engine)
        });
    });
}

/// Benchmark for re-asserting alpha-equivalent rules
fn bench_duplicate_detection(c: &mut Criterion) {
    c.bench_function("duplicate_detection", |b| {
        b.iter(|| {
            let mut engine = Engine::new();
            for i in 0..200 {
                let x = format!("X{i}");
                let y = format!("Y{i}");
                let _ = engine.add_clause(
                    fact("p", vec![Atom::var(x.clone()), Atom::var(y.clone())]),
                    vec![fact("q", vec![Atom::var(x)]), fact("q", vec![Atom::var(y)])],
                );
            }
            black_box(engine.clause_count())
        });
    });
}

/// Benchmark for naive recursive fibonacci, without memoization
fn bench_fib_plain(c: &mut Criterion) {
    let goal = fact("fib", vec![Atom::int(12), Atom::var("R")]);
    c.bench_function("fib_12_plain", |b| {
        b.iter_batched(
            || fib_engine().ok(),
            |engine| engine.map(|mut engine| black_box(engine.search(&goal, true))),
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark for the same query with fib/2 memoized from scratch each run
fn bench_fib_memoized(c: &mut Criterion) {
    let goal = fact("fib", vec![Atom::int(40), Atom::var("R")]);
    c.bench_function("fib_40_memoized", |b| {
        b.iter_batched(
            || {
                let mut engine = fib_engine().ok()?;
                engine.enable_memo("fib/2").ok()?;
                Some(engine)
            },
            |engine| engine.map(|mut engine| black_box(engine.search(&goal, true))),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_add_clauses,
    bench_duplicate_detection,
    bench_fib_plain,
    bench_fib_memoized
);
criterion_main!(benches);

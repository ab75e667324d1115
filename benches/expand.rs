//! Expansion benchmarks
//!
//! Snippet parsing alone, and whole-source expansion as the quote count grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use splicer::{expand_source, parse_snippet, CompilationUnit, Haskell, HostScope, SourceLocation, UnitOptions};

fn generate_host_source(quotes: usize) -> String {
    let mut source = String::from("module Bench where\n\nimport Data.Int\n\nmain :: IO ()\nmain = do\n");

    for i in 0..quotes {
        source.push_str(&format!("  let a{} = {}\n", i, i));
        match i % 3 {
            0 => source.push_str(&format!("  r{0} <- [rustIO| i32 {{ $(a{0}: i32) * 2 }} |]\n", i)),
            1 => source.push_str(&format!(
                "  let r{0} = [rust| f64 {{ ($(a{0}: i64) as f64).sqrt() }} |]\n",
                i
            )),
            _ => source.push_str(&format!(
                "  let r{0} = [rustUnsafe| bool {{ $(a{0}: u32) % 2 == 0 }} |]\n",
                i
            )),
        }
    }

    source.push_str("  pure ()\n");
    source
}

fn bench_parse_snippet(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_snippet");

    let cases = [
        ("constant", "i32 { 42 }"),
        ("one_arg", "i32 { $(x: i32) + 1 }"),
        (
            "four_args",
            "f64 { let s = $(a: f64) + $(b: f64); s * $(c: f64) / $(d: f64) }",
        ),
    ];

    for (name, text) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| parse_snippet(black_box(text), SourceLocation::point(1, 0)))
        });
    }

    group.finish();
}

fn bench_expand_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand_source");

    for quotes in [1, 10, 100].iter() {
        let source = generate_host_source(*quotes);
        group.bench_with_input(BenchmarkId::from_parameter(quotes), &source, |b, source| {
            b.iter(|| {
                let mut unit = CompilationUnit::new("Bench.hs", UnitOptions::default());
                expand_source(&mut unit, black_box(source), &Haskell, HostScope::Open)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_snippet, bench_expand_source);
criterion_main!(benches);

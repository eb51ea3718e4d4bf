//! Performance benchmarks for resolution and classification against a
//! populated repository

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nlm::model::{MacroDefinition, Step};
use nlm::repository::MemoryRepository;
use nlm::resolver::Resolver;
use nlm::safety::classify;
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Mix of plain and parameterized macros, one in four parameterized
fn create_macros(count: usize) -> Vec<MacroDefinition> {
    (0..count)
        .map(|i| {
            if i % 4 == 0 {
                MacroDefinition::new(
                    format!("deploy service{i} to {{env}}"),
                    vec![Step::new(format!("./deploy.sh service{i} {{env}}"))],
                    None,
                )
            } else {
                MacroDefinition::new(
                    format!("build project {i}"),
                    vec![
                        Step::new(format!("cd project{i}")),
                        Step::new("cargo build --release"),
                    ],
                    None,
                )
            }
        })
        .collect()
}

fn bench_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("resolution");

    for size in [50, 200, 500] {
        let repository = Arc::new(MemoryRepository::with_macros(create_macros(size)));
        let resolver = Resolver::new(repository);
        let last_template = format!("deploy service{} to production", (size - 1) / 4 * 4);

        group.bench_with_input(BenchmarkId::new("exact", size), &size, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(resolver.resolve("build project 1").await.unwrap()) });
        });

        group.bench_with_input(BenchmarkId::new("template", size), &size, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(resolver.resolve(&last_template).await.unwrap()) });
        });

        group.bench_with_input(BenchmarkId::new("fuzzy_miss", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                black_box(resolver.resolve("biuld projct seven").await.unwrap())
            });
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    let safe: Vec<String> = (0..20).map(|i| format!("cargo test -p crate{i}")).collect();
    let mut dangerous = safe.clone();
    dangerous.push("sudo rm -rf /var/tmp/build".to_string());

    group.bench_function("safe_20_steps", |b| b.iter(|| classify(black_box(&safe))));
    group.bench_function("dangerous_21_steps", |b| {
        b.iter(|| classify(black_box(&dangerous)))
    });

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_classification);
criterion_main!(benches);

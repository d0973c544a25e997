//! Generator throughput at representative point counts.
//!
//! Run with: `cargo bench --bench galaxy_gen`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use galaxite::galaxy::{generate_with, GalaxyParams};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for count in [10_000u32, 100_000, 500_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let params = GalaxyParams {
                count,
                ..GalaxyParams::default()
            };
            let mut rng = SmallRng::seed_from_u64(7);
            b.iter(|| generate_with(&params, &mut rng));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);

//! Benchmarks for size-balanced partitioning.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use genabc::dispatch::{Artifact, partition};

/// Create artifacts with pseudo-random sizes between 1 KiB and ~1 MiB.
fn create_artifacts(count: usize) -> Vec<Artifact> {
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    (0..count)
        .map(|i| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let size = 1024 + seed % (1024 * 1024);
            Artifact::new(format!("/out/pages/page{}.temp.js", i), size)
        })
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for count in [100, 1_000, 10_000].iter() {
        let artifacts = create_artifacts(*count);
        for workers in [3, 16] {
            group.bench_with_input(
                BenchmarkId::new(format!("{}_workers", workers), count),
                count,
                |b, _| {
                    b.iter(|| {
                        let groups = partition(black_box(&artifacts), workers);
                        black_box(groups)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_partition);
criterion_main!(benches);

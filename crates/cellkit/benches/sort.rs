use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cellkit::{topological_sort, CellCodec};
use cellkit_testkit::fixtures::{chain, DagFixture};

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological_sort");
    for cells in [100usize, 1_000, 10_000] {
        let root = DagFixture::with_seed(cells as u64).random_dag(cells, 4);
        group.bench_with_input(BenchmarkId::new("random", cells), &root, |b, root| {
            b.iter(|| topological_sort(black_box(root)))
        });
    }
    let deep = chain(10_000);
    group.bench_function("chain/10000", |b| b.iter(|| topological_sort(black_box(&deep))));
    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let root = DagFixture::with_seed(7).random_dag(1_000, 4);
    let codec = CellCodec::default();
    let bag = match codec.flatten(&root) {
        Ok(bag) => bag,
        Err(e) => panic!("flatten failed: {e}"),
    };

    c.bench_function("codec/flatten", |b| b.iter(|| codec.flatten(black_box(&root))));
    c.bench_function("codec/rebuild", |b| b.iter(|| codec.rebuild(black_box(&bag))));
}

criterion_group!(benches, bench_sort, bench_codec);
criterion_main!(benches);

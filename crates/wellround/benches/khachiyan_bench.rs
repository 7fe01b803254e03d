use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wellround::khachiyan::minimum_enclosing_ellipsoid;

fn random_cloud(dim: usize, count: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(dim, count, |_, _| rng.gen_range(-1.0..1.0))
}

fn bench_mvee(c: &mut Criterion) {
    let mut group = c.benchmark_group("mvee");
    for &dim in &[3usize, 8, 16] {
        let points = random_cloud(dim, 10 * dim, 42);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &points, |b, pts| {
            b.iter(|| minimum_enclosing_ellipsoid(pts, 0.01, 1000).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mvee);
criterion_main!(benches);

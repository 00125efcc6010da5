use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fencepost_core::solver::{least_squares, weighted_centroid};
use fencepost_core::{DistanceSample, Point};

fn samples() -> Vec<DistanceSample> {
    [
        ("Node_A", 2.0, 5.0, 5.0),
        ("Node_B", 10.0, 2.0, 5.5),
        ("Node_C", 5.0, 7.0, 4.8),
        ("Node_D", 9.0, 2.0, 5.2),
    ]
    .into_iter()
    .map(|(id, x, y, distance)| DistanceSample {
        node_id: id.to_string(),
        distance,
        location: Point::new(x, y),
    })
    .collect()
}

fn bench_solvers(c: &mut Criterion) {
    let samples = samples();

    c.bench_function("least_squares_4_nodes", |b| {
        b.iter(|| least_squares(black_box(&samples)))
    });

    c.bench_function("weighted_centroid_2_nodes", |b| {
        b.iter(|| weighted_centroid(black_box(&samples[..2])))
    });
}

criterion_group!(benches, bench_solvers);
criterion_main!(benches);

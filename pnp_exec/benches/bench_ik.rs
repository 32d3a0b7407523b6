//! # Inverse Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pnp_lib::{
    kin::{KinParams, KinematicsAdapter},
    planner::Pose4,
};

fn ik_benchmark(c: &mut Criterion) {
    let params = KinParams::default();

    // Waypoints of a typical cycle, above, at and lifted from the pick then the place
    let targets = [
        Pose4::new(150.0, 0.0, 220.0, 0.0),
        Pose4::new(150.0, 0.0, 130.0, 0.0),
        Pose4::new(150.0, 0.0, 250.0, 0.0),
        Pose4::new(200.0, 120.0, 220.0, 90.0),
        Pose4::new(200.0, 120.0, 130.0, 90.0),
        Pose4::new(200.0, 120.0, 250.0, 90.0),
    ];

    c.bench_function("ik_cold_start", |b| {
        b.iter_batched(
            || KinematicsAdapter::from_params(&params).unwrap(),
            |mut kin| kin.solve(black_box(&targets[0])).ok(),
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("ik_cycle", |b| {
        let mut kin = KinematicsAdapter::from_params(&params).unwrap();

        b.iter(|| {
            for t in targets.iter() {
                kin.solve(black_box(t)).ok();
            }
        })
    });
}

criterion_group!(benches, ik_benchmark);
criterion_main!(benches);

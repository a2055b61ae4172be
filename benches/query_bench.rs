use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::AtomicBool;

use eplq::poe::{encrypt_point, generate_token, poe_setup, SecurityLevel};
use eplq::tree::search;
use eplq::{setup, GeoPoint, GridConfig, Poi, TreeConfig};

fn bench_token_generation(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let grid = GridConfig::default();
    let (_, msk) = poe_setup(SecurityLevel::Bits128, grid, &mut rng).unwrap();
    let center = grid.encode(GeoPoint::new(0.001, 0.002)).unwrap();

    c.bench_function("generate_token", |b| {
        b.iter(|| {
            let token = generate_token(&msk, black_box(center), 1_800, &mut rng);
            black_box(token)
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let grid = GridConfig::default();
    let (_, msk) = poe_setup(SecurityLevel::Bits128, grid, &mut rng).unwrap();

    let center = grid.encode(GeoPoint::new(0.0, 0.0)).unwrap();
    let token = generate_token(&msk, center, 1_800, &mut rng);

    let inside = encrypt_point(&msk, grid.encode(GeoPoint::new(0.0005, 0.0005)).unwrap(), &mut rng);
    let outside = encrypt_point(&msk, grid.encode(GeoPoint::new(0.1, 0.1)).unwrap(), &mut rng);

    c.bench_function("evaluate_inside_200m", |b| {
        b.iter(|| black_box(eplq::poe::evaluate(&token, &inside, token.leaf_bound())))
    });
    c.bench_function("evaluate_outside_200m", |b| {
        b.iter(|| black_box(eplq::poe::evaluate(&token, &outside, token.leaf_bound())))
    });
}

fn bench_tree_search(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let (_, key) = setup(SecurityLevel::Bits128, GridConfig::default(), &mut rng).unwrap();

    let pois: Vec<Poi> = (0..200)
        .map(|id| Poi {
            id,
            location: GeoPoint::new(
                (rng.gen::<f64>() - 0.5) * 0.02,
                (rng.gen::<f64>() - 0.5) * 0.02,
            ),
        })
        .collect();
    let (tree, _) = key.ingest(
        &TreeConfig {
            leaf_capacity: 8,
            ..TreeConfig::default()
        },
        &pois,
        &mut rng,
    );
    let token = key
        .make_query(GeoPoint::new(0.0, 0.0), 200.0, &mut rng)
        .unwrap();

    c.bench_function("search_200_points", |b| {
        b.iter(|| black_box(search(&tree, &token, &AtomicBool::new(false)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_token_generation,
    bench_evaluate,
    bench_tree_search
);
criterion_main!(benches);

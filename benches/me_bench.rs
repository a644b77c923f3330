#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use v_frame::plane::Plane;
use vp9_motion::{
    Area,
    AsRegion,
    CandidateRow,
    MotionEstimationConfig,
    PartitionSadTable,
    PlaneOffset,
    Rect,
    SearchResult,
    SearchWindow,
    SuperblockBestState,
    aggregate_candidate_row,
    estimate_frame_motion,
    exhaustive_search,
    get_sad,
};

fn make_plane(width: usize, height: usize, seed: usize) -> Plane<u8> {
    let mut plane = Plane::new(width, height, 0, 0, 64, 64);
    let stride = plane.cfg.stride;
    for (i, row) in plane.data.chunks_mut(stride).enumerate() {
        for (j, px) in row.iter_mut().enumerate() {
            *px = ((i * 31 + j * 7 + seed * 43) & 255) as u8;
        }
    }
    plane
}

fn sad_benchmark(c: &mut Criterion) {
    let org = make_plane(256, 256, 0);
    let reference = make_plane(256, 256, 1);

    c.bench_function("sad 64x64", |b| {
        let org_region = org.region(Area::StartingAt { x: 64, y: 64 });
        let ref_region = reference.region(Area::StartingAt { x: 61, y: 66 });
        b.iter(|| {
            black_box(get_sad(
                black_box(&org_region),
                black_box(&ref_region),
                64,
                64,
                8,
            ))
        })
    });
}

fn exhaustive_benchmark(c: &mut Criterion) {
    let org = make_plane(256, 256, 0);
    let reference = make_plane(256, 256, 1);

    c.bench_function("exhaustive 16x16 over 32x32 window", |b| {
        let po = PlaneOffset { x: 96, y: 96 };
        let org_region = org.region(Area::Rect(Rect {
            x: po.x,
            y: po.y,
            width: 16,
            height: 16,
        }));
        let window = SearchWindow {
            x: -16,
            y: -16,
            width: 32,
            height: 32,
        };
        b.iter(|| {
            let mut best = SearchResult::seeded(0, 0);
            exhaustive_search(
                black_box(&org_region),
                black_box(&reference),
                po,
                window,
                16,
                16,
                8,
                &mut best,
            );
            black_box(best)
        })
    });
}

fn aggregate_benchmark(c: &mut Criterion) {
    let org = make_plane(256, 256, 0);
    let reference = make_plane(256, 256, 1);

    c.bench_function("candidate row batch + aggregate", |b| {
        let po = PlaneOffset { x: 64, y: 64 };
        let org_region = org.region(Area::Rect(Rect {
            x: po.x,
            y: po.y,
            width: 64,
            height: 64,
        }));
        b.iter(|| {
            let mut state = SuperblockBestState::empty();
            let mut table = PartitionSadTable::new();
            for dy in -2i16..2 {
                table.compute(black_box(&org_region), black_box(&reference), po, -4, dy);
                aggregate_candidate_row(&mut state, CandidateRow::from_fullpel(-4, dy), &table);
            }
            black_box(state)
        })
    });
}

fn frame_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.sample_size(20);
    group.bench_function("estimate 192x192 frame", |b| {
        let org = make_plane(192, 192, 0);
        let reference = make_plane(192, 192, 1);
        let cfg = MotionEstimationConfig::default();
        b.iter(|| black_box(estimate_frame_motion(&org, &reference, &cfg, 8).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    sad_benchmark,
    exhaustive_benchmark,
    aggregate_benchmark,
    frame_benchmark
);
criterion_main!(benches);

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use hifitime::{Epoch, Unit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trackfill::downsample::{downsample, downsample_by_track};
use trackfill::gaps::{analyze_gaps, BINS_PER_PERIOD};
use trackfill::synthetic::TopocentricCoordinates;
use trackfill::tracks::{assign_tracks, TrackPolicy};
use trackfill::Observation;

/// `n` observations scattered over `span_hours`, in bursts of about ten minutes.
fn make_observations(rng: &mut StdRng, n: usize, span_hours: f64) -> Vec<Observation> {
    let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
    let coords = TopocentricCoordinates {
        ra: 120.0,
        dec: -5.0,
        elevation: 40.0,
        azimuth: 180.0,
        range: 37_000.0,
    };
    let bursts = (n / 20).max(1);
    (0..n)
        .map(|i| {
            let burst = (i % bursts) as f64;
            let base = burst * span_hours / bursts as f64;
            let jitter = rng.random_range(0.0..(10.0 / 60.0));
            Observation::real(1, t0 + Unit::Hour * (base + jitter), &coords)
        })
        .collect()
}

fn bench_downsample(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let raw = make_observations(&mut rng, 5_000, 720.0);
    let tracked = assign_tracks(&raw, 24.0, &TrackPolicy::default());

    c.bench_function("downsample/timeline_5000_to_30", |b| {
        b.iter(|| black_box(downsample(black_box(&tracked), 30)))
    });

    c.bench_function("downsample/track_preserving_5000_to_30", |b| {
        b.iter(|| black_box(downsample_by_track(black_box(&tracked), 30)))
    });
}

fn bench_tracks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xBADF00D);

    c.bench_function("assign_tracks/5000_leo", |b| {
        b.iter_batched(
            || make_observations(&mut rng, 5_000, 168.0),
            |obs| black_box(assign_tracks(&obs, 6.0, &TrackPolicy::default())),
            BatchSize::LargeInput,
        )
    });
}

fn bench_gaps(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xFEEDFACE);
    let geo = make_observations(&mut rng, 2_000, 720.0);
    let leo = make_observations(&mut rng, 2_000, 168.0);

    c.bench_function("analyze_gaps/geo_30_days", |b| {
        b.iter(|| black_box(analyze_gaps(black_box(&geo), 23.93, BINS_PER_PERIOD)))
    });

    c.bench_function("analyze_gaps/leo_7_days", |b| {
        b.iter(|| black_box(analyze_gaps(black_box(&leo), 1.55, BINS_PER_PERIOD)))
    });
}

criterion_group!(benches, bench_downsample, bench_tracks, bench_gaps);
criterion_main!(benches);

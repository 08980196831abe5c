use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fallwatch_core::FallDetector;
use fallwatch_traits::Sample;
use std::time::{Duration, Instant};

// Standing wearer with sensor noise, one free fall + impact + lying still every 10 s.
fn synth_trace(n: usize, noise_amp: f32, seed: u32) -> Vec<Sample> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next_f32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    };
    let t0 = Instant::now();
    let mut v = Vec::with_capacity(n);
    for i in 0..n {
        let phase = i % 1000;
        let base = match phase {
            500..=524 => [0.0, 0.0, 0.2],
            525 => [0.0, 0.0, 4.0],
            526..=800 => [1.0, 0.0, 0.0],
            _ => [0.0, 0.0, 1.0],
        };
        let mut noise = || (next_f32() * 2.0 - 1.0) * noise_amp; // [-amp, +amp]
        let accel = [base[0] + noise(), base[1] + noise(), base[2] + noise()];
        let gyro = [noise() * 100.0, noise() * 100.0, noise() * 100.0];
        v.push(Sample::new(
            accel,
            gyro,
            t0 + Duration::from_millis(i as u64 * 10),
        ));
    }
    v
}

pub fn bench_process(c: &mut Criterion) {
    let mut g = c.benchmark_group("detector");
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p fallwatch_core --bench detector
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let trace = synth_trace(60_000, 0.02, 0xC0FFEE);

    g.bench_function("process_10min_100hz", |b| {
        b.iter_batched(
            || {
                FallDetector::builder()
                    .with_device_id("bench")
                    .build()
                    .unwrap()
            },
            |mut det| {
                let mut events = 0u32;
                for s in &trace {
                    if det.process(black_box(s)).into_event().is_some() {
                        events += 1;
                    }
                }
                black_box(events);
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(detector, bench_process);
criterion_main!(detector);

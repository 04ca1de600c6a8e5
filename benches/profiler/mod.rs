// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::str::FromStr;
use std::time::Duration;

use criterion::Criterion;

use pprof::criterion::{Output, PProfProfiler};

fn env_or<T: FromStr + Ord>(name: &str, default: T, min: T, max: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

/// Criterion with a flamegraph profiler; `--profile-time <secs>` writes the flamegraph.
///
/// Tunables: `PROFILE_FREQ` (Hz), `BENCH_SAMPLE_SIZE`, `BENCH_WARMUP_SECS`,
/// `BENCH_MEASUREMENT_SECS`.
pub fn criterion() -> Criterion {
    let frequency: i32 = env_or("PROFILE_FREQ", 100, 1, 1000);
    let samples: usize = env_or("BENCH_SAMPLE_SIZE", 50, 10, 200);
    let warmup: u64 = env_or("BENCH_WARMUP_SECS", 2, 1, 60);
    let measurement: u64 = env_or("BENCH_MEASUREMENT_SECS", 4, 1, 120);

    Criterion::default()
        .sample_size(samples)
        .warm_up_time(Duration::from_secs(warmup))
        .measurement_time(Duration::from_secs(measurement))
        .with_profiler(PProfProfiler::new(frequency, Output::Flamegraph(None)))
}

use std::time::{Duration, Instant};

use super::fields::round_to;

/// Runs `ping` `samples` times back to back and returns the mean round trip
/// in milliseconds, rounded to three decimals.
///
/// The first failing ping aborts the measurement.
pub fn measure_latency_ms<E>(
    samples: usize,
    mut ping: impl FnMut() -> Result<(), E>,
) -> Result<f64, E> {
    let samples = samples.max(1);
    let mut elapsed = Vec::with_capacity(samples);
    for _ in 0..samples {
        let started = Instant::now();
        ping()?;
        elapsed.push(started.elapsed());
    }
    Ok(mean_latency_ms(&elapsed).unwrap_or_default())
}

/// Arithmetic mean in milliseconds, three decimals. No outlier rejection.
pub fn mean_latency_ms(samples: &[Duration]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total_ms: f64 = samples.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
    Some(round_to(total_ms / samples.len() as f64, 3))
}

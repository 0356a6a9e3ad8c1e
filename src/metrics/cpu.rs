use std::thread;
use std::time::Duration;

use super::fields::round_to;
use crate::error::SampleError;

pub const DEFAULT_SAMPLE_DELAY: Duration = Duration::from_millis(200);

/// Column order of the aggregate `cpu` line in `/proc/stat`.
const STAT_COLUMNS: &[&str] = &[
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];

/// Columns counted as idle time.
pub const IDLE_FIELDS: &[&str] = &["idle", "iowait"];

/// Columns counted as busy time. `guest` and `guest_nice` are already part of
/// `user` and `nice`.
pub const BUSY_FIELDS: &[&str] = &["user", "nice", "system", "irq", "softirq", "steal"];

/// Accumulated jiffies at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    pub fn new(idle: u64, total: u64) -> Self {
        CpuTimes { idle, total }
    }
}

/// Reads the aggregate `cpu` line of a `/proc/stat` dump.
///
/// Columns missing on older kernels are treated as absent, not zero-filled.
pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes, SampleError> {
    let line = stat
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SampleError::malformed("stat", "no aggregate cpu line"))?;

    let mut columns = Vec::with_capacity(STAT_COLUMNS.len());
    for (name, raw) in STAT_COLUMNS.iter().zip(line.split_whitespace().skip(1)) {
        let value = raw
            .parse::<u64>()
            .map_err(|_| SampleError::malformed("stat", format!("bad {} column: {}", name, raw)))?;
        columns.push((*name, value));
    }

    let sum = |fields: &[&str]| -> u64 {
        columns
            .iter()
            .filter(|(name, _)| fields.contains(name))
            .map(|(_, value)| *value)
            .sum()
    };
    let idle = sum(IDLE_FIELDS);
    let busy = sum(BUSY_FIELDS);
    Ok(CpuTimes::new(idle, idle + busy))
}

/// Busy percentage between two reads, two decimals.
pub fn usage_between(first: CpuTimes, second: CpuTimes) -> Result<f64, SampleError> {
    if first.total == 0 {
        return Err(SampleError::Guard("first cpu read returned no time"));
    }
    if second.total <= first.total {
        return Err(SampleError::Guard("cpu counters did not advance"));
    }
    let total_delta = (second.total - first.total) as f64;
    let idle_delta = second.idle.saturating_sub(first.idle) as f64;
    let busy = (total_delta - idle_delta).max(0.0);
    Ok(round_to(100.0 * busy / total_delta, 2))
}

/// Reads the counters, sleeps `delay` (at least 1 ms), reads again.
///
/// This sleep is the only deliberate blocking delay of the host collector.
pub fn sample_cpu_usage(
    mut read: impl FnMut() -> Result<CpuTimes, SampleError>,
    delay: Duration,
) -> Result<f64, SampleError> {
    let first = read()?;
    if first.total == 0 {
        return Err(SampleError::Guard("first cpu read returned no time"));
    }
    thread::sleep(delay.max(Duration::from_millis(1)));
    let second = read()?;
    usage_between(first, second)
}

use std::collections::HashMap;

use super::fields::percent;
use super::types::{MetricValue, Section};

/// `/proc/meminfo` as `key -> kB`. Lines that do not parse are skipped.
pub fn parse_meminfo(text: &str) -> HashMap<String, u64> {
    text.lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse::<u64>().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

/// Used amount and used percent for a `total` / `remaining` pair.
///
/// Used is clamped at zero. The percent is `None` when total is zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Usage {
    pub used: u64,
    pub used_percent: Option<f64>,
}

pub fn usage(total: u64, remaining: u64) -> Usage {
    let used = total.saturating_sub(remaining);
    Usage {
        used,
        used_percent: percent(used, total),
    }
}

/// The `memory` section of the host snapshot.
///
/// Memory used is `MemTotal - MemAvailable`, so reclaimable caches count as
/// free. Swap used is `SwapTotal - SwapFree`.
pub fn memory_section(meminfo: Option<&HashMap<String, u64>>) -> Section {
    let field = |key: &str| meminfo.and_then(|info| info.get(key).copied());

    let mem_total = field("MemTotal");
    let mem_available = field("MemAvailable");
    let swap_total = field("SwapTotal");
    let swap_free = field("SwapFree");

    let mem = mem_total.zip(mem_available).map(|(t, a)| usage(t, a));
    let swap = swap_total.zip(swap_free).map(|(t, f)| usage(t, f));

    Section::new()
        .with("mem_total_kb", mem_total)
        .with("mem_available_kb", mem_available)
        .with("mem_used_kb", mem.map(|u| u.used))
        .with("mem_used_percent", used_percent(mem))
        .with("swap_total_kb", swap_total)
        .with("swap_free_kb", swap_free)
        .with("swap_used_kb", swap.map(|u| u.used))
        .with("swap_used_percent", used_percent(swap))
}

fn used_percent(usage: Option<Usage>) -> MetricValue {
    usage.and_then(|u| u.used_percent).into()
}

use std::collections::HashMap;

use log::debug;

use super::types::MetricValue;
use crate::error::SampleError;

/// Input buffer field names reported by `CLIENT LIST`, across server versions.
pub const INPUT_BUFFER_FIELDS: &[&str] = &["qbuf", "ibl", "input_buffer_length"];

/// Output buffer field names reported by `CLIENT LIST`, across server versions.
pub const OUTPUT_BUFFER_FIELDS: &[&str] = &["obuf", "omem", "obl", "output_buffer_length"];

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `100 * part / whole`, two decimals. `None` when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(round_to(part as f64 * 100.0 / whole as f64, 2))
}

/// Splits a line of space separated `key=value` tokens.
///
/// Tokens without `=` are skipped. Values keep everything after the first `=`.
pub fn parse_key_values(line: &str) -> HashMap<&str, &str> {
    line.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .collect()
}

/// Sums every alias present in `fields` that parses as an integer.
pub fn sum_aliases(fields: &HashMap<&str, &str>, aliases: &[&str]) -> u64 {
    aliases
        .iter()
        .filter_map(|alias| fields.get(alias))
        .filter_map(|raw| raw.parse::<u64>().ok())
        .sum()
}

/// Input and output buffer totals across every client line.
pub fn client_buffer_totals(client_list: &str) -> (u64, u64) {
    client_list
        .lines()
        .map(parse_key_values)
        .fold((0, 0), |(input, output), fields| {
            (
                input + sum_aliases(&fields, INPUT_BUFFER_FIELDS),
                output + sum_aliases(&fields, OUTPUT_BUFFER_FIELDS),
            )
        })
}

/// Parses newline-delimited `key:value` text, trimming both sides.
///
/// Lines without a colon (section headers, blanks) are ignored.
pub fn parse_colon_pairs(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Folds a sub-measurement outcome into a metric value.
///
/// Failures are expected on some platforms and server versions, so they are
/// only logged at debug level.
pub fn measured<T: Into<MetricValue>>(name: &str, outcome: Result<T, SampleError>) -> MetricValue {
    match outcome {
        Ok(value) => value.into(),
        Err(err) => {
            debug!("{} unavailable: {}", name, err);
            MetricValue::Unavailable
        }
    }
}

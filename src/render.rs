use std::fmt::Write as _;

use crate::config::OutputMode;
use crate::metrics::{MetricValue, Section, Snapshot};

/// Renders a snapshot for stdout.
pub fn render(snapshot: &Snapshot, mode: OutputMode) -> Result<String, serde_json::Error> {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(snapshot),
        OutputMode::Pretty => Ok(render_pretty(snapshot)),
    }
}

fn section_title(name: &str) -> String {
    match name {
        "cluster" => "CLUSTER/FAILURE".to_string(),
        other => other.to_uppercase(),
    }
}

/// One `[TITLE]` line and a github-style table per section.
pub fn render_pretty(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for (name, section) in snapshot.sections() {
        let _ = writeln!(out, "[{}]", section_title(name));
        out.push_str(&table(section));
        out.push('\n');
    }
    out
}

fn table(section: &Section) -> String {
    let rows: Vec<(String, String)> = section
        .iter()
        .map(|(name, value)| (name.to_string(), cell(value)))
        .collect();

    let metric_width = rows
        .iter()
        .map(|(metric, _)| metric.chars().count())
        .chain(std::iter::once("metric".len()))
        .max()
        .unwrap_or_default();
    let value_width = rows
        .iter()
        .map(|(_, value)| value.chars().count())
        .chain(std::iter::once("value".len()))
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "| {:<mw$} | {:<vw$} |",
        "metric",
        "value",
        mw = metric_width,
        vw = value_width
    );
    let _ = writeln!(
        out,
        "|{}|{}|",
        "-".repeat(metric_width + 2),
        "-".repeat(value_width + 2)
    );
    for (metric, value) in &rows {
        let _ = writeln!(
            out,
            "| {:<mw$} | {:<vw$} |",
            metric,
            value,
            mw = metric_width,
            vw = value_width
        );
    }
    out
}

/// Unavailable renders as an empty cell. Multi-line text keeps its first line.
fn cell(value: &MetricValue) -> String {
    match value {
        MetricValue::Int(v) => v.to_string(),
        MetricValue::Float(v) => v.to_string(),
        MetricValue::Bool(v) => v.to_string(),
        MetricValue::Text(text) => {
            let mut lines = text.lines();
            let first = lines.next().unwrap_or_default().to_string();
            let rest = lines.count();
            if rest > 0 {
                format!("{} (+{} more lines)", first, rest)
            } else {
                first
            }
        }
        MetricValue::Map(section) => serde_json::to_string(section).unwrap_or_default(),
        MetricValue::Unavailable => String::new(),
    }
}

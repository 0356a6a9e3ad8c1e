use std::path::Path;

use walkdir::WalkDir;

use crate::error::SampleError;

/// First field of `/proc/uptime`, in seconds.
pub fn parse_uptime(text: &str) -> Result<f64, SampleError> {
    text.split_whitespace()
        .next()
        .and_then(|raw| raw.parse::<f64>().ok())
        .ok_or_else(|| SampleError::malformed("uptime", text.trim()))
}

/// The 1, 5 and 15 minute averages from `/proc/loadavg`.
pub fn parse_loadavg(text: &str) -> Result<[f64; 3], SampleError> {
    let values: Vec<f64> = text
        .split_whitespace()
        .take(3)
        .filter_map(|raw| raw.parse::<f64>().ok())
        .collect();
    match values.as_slice() {
        [one, five, fifteen] => Ok([*one, *five, *fifteen]),
        _ => Err(SampleError::malformed("loadavg", text.trim())),
    }
}

/// `(allocated, unused, max)` from `/proc/sys/fs/file-nr`.
pub fn parse_file_nr(text: &str) -> Result<(u64, u64, u64), SampleError> {
    let values: Vec<u64> = text
        .split_whitespace()
        .filter_map(|raw| raw.parse::<u64>().ok())
        .collect();
    match values.as_slice() {
        [allocated, unused, max, ..] => Ok((*allocated, *unused, *max)),
        _ => Err(SampleError::malformed("file-nr", text.trim())),
    }
}

/// Counts the numeric directory names directly under the process table root.
///
/// Entries that vanish while walking (processes exiting) are skipped.
pub fn count_processes(proc_root: &Path) -> Result<usize, SampleError> {
    let metadata = std::fs::metadata(proc_root).map_err(|source| SampleError::Io {
        path: proc_root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(SampleError::malformed(
            "process table",
            format!("{} is not a directory", proc_root.display()),
        ));
    }

    let count = WalkDir::new(proc_root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false)
        })
        .count();
    Ok(count)
}

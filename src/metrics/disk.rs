use std::collections::HashSet;
use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use log::debug;

use super::fields::percent;
use super::types::{MetricValue, Section};
use crate::error::SampleError;

/// Filesystem types backed by real storage. Everything else in the mount
/// table (tmpfs, proc, sysfs, cgroup, overlay, ...) is skipped.
pub const REAL_FILESYSTEMS: &[&str] = &[
    "ext2", "ext3", "ext4", "xfs", "btrfs", "zfs", "f2fs", "jfs", "reiserfs", "vfat", "exfat",
    "ntfs", "ntfs3", "fuseblk", "nfs", "nfs4", "cifs",
];

pub const ROOT_MOUNT: &str = "/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountEntry {
    pub device: Option<String>,
    pub mount_point: String,
    pub fs_type: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Parses a `/proc/mounts` style table. Short lines are skipped.
pub fn parse_mounts(text: &str) -> Vec<MountEntry> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                device: Some(unescape_mount_field(device)),
                mount_point: unescape_mount_field(mount_point),
                fs_type: Some(fs_type.to_string()),
            })
        })
        .collect()
}

/// Decodes the `\ooo` octal escapes the kernel uses for spaces and tabs.
fn unescape_mount_field(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Keeps allow-listed filesystems, first occurrence per mount point, and
/// always exactly one root entry.
pub fn select_mounts(entries: &[MountEntry]) -> Vec<MountEntry> {
    let mut seen = HashSet::new();
    let mut selected: Vec<MountEntry> = entries
        .iter()
        .filter(|entry| {
            entry
                .fs_type
                .as_deref()
                .map(|fs| REAL_FILESYSTEMS.contains(&fs))
                .unwrap_or(false)
        })
        .filter(|entry| seen.insert(entry.mount_point.clone()))
        .cloned()
        .collect();

    if !seen.contains(ROOT_MOUNT) {
        let root = entries
            .iter()
            .find(|entry| entry.mount_point == ROOT_MOUNT)
            .cloned()
            .unwrap_or_else(|| MountEntry {
                device: None,
                mount_point: ROOT_MOUNT.to_string(),
                fs_type: None,
            });
        selected.insert(0, root);
    }
    selected
}

/// `statvfs(3)` the way `df` reports it: free is what unprivileged users can
/// still allocate, used excludes reserved blocks.
pub fn statvfs_usage(path: &Path) -> Result<DiskUsage, SampleError> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| SampleError::malformed("mount point", path.display().to_string()))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    let result = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if result != 0 {
        return Err(SampleError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }
    let stat = unsafe { stat.assume_init() };

    #[allow(clippy::unnecessary_cast)]
    let (frsize, blocks, bfree, bavail) = (
        if stat.f_frsize > 0 {
            stat.f_frsize as u64
        } else {
            stat.f_bsize as u64
        },
        stat.f_blocks as u64,
        stat.f_bfree as u64,
        stat.f_bavail as u64,
    );

    Ok(DiskUsage {
        total: blocks.saturating_mul(frsize),
        used: blocks.saturating_sub(bfree).saturating_mul(frsize),
        free: bavail.saturating_mul(frsize),
    })
}

fn mount_section(entry: &MountEntry, usage: Result<DiskUsage, SampleError>) -> Section {
    let section = Section::new()
        .with("device", entry.device.clone())
        .with("fs_type", entry.fs_type.clone());
    match usage {
        Ok(u) => section
            .with("total_bytes", u.total)
            .with("used_bytes", u.used)
            .with("free_bytes", u.free)
            .with("used_percent", percent(u.used, u.total)),
        Err(err) => {
            debug!("disk usage of {} unavailable: {}", entry.mount_point, err);
            section
                .with("total_bytes", MetricValue::Unavailable)
                .with("used_bytes", MetricValue::Unavailable)
                .with("free_bytes", MetricValue::Unavailable)
                .with("used_percent", MetricValue::Unavailable)
        }
    }
}

/// The `disk` section: root totals plus one nested entry per retained mount.
pub fn disk_section(
    mounts: Option<&str>,
    usage_of: impl Fn(&Path) -> Result<DiskUsage, SampleError>,
) -> Section {
    let entries = mounts.map(parse_mounts).unwrap_or_default();
    let selected = select_mounts(&entries);

    let mut per_mount = Section::new();
    for entry in &selected {
        let usage = usage_of(Path::new(&entry.mount_point));
        per_mount.set(&entry.mount_point, mount_section(entry, usage));
    }

    let root = per_mount
        .get(ROOT_MOUNT)
        .and_then(MetricValue::as_section)
        .cloned()
        .unwrap_or_default();
    let root_field = |name: &str| root.get(name).cloned().unwrap_or(MetricValue::Unavailable);

    Section::new()
        .with("root_total_bytes", root_field("total_bytes"))
        .with("root_used_bytes", root_field("used_bytes"))
        .with("root_free_bytes", root_field("free_bytes"))
        .with("root_used_percent", root_field("used_percent"))
        .with("mounts", per_mount)
}

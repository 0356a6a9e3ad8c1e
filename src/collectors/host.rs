use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sysinfo::System;

use super::Collector;
use crate::error::{CollectError, SampleError};
use crate::metrics::cpu::{parse_cpu_times, sample_cpu_usage};
use crate::metrics::disk::{disk_section, statvfs_usage, DiskUsage};
use crate::metrics::fields::measured;
use crate::metrics::memory::{memory_section, parse_meminfo};
use crate::metrics::network::{network_section, parse_net_dev};
use crate::metrics::system::{count_processes, parse_file_nr, parse_loadavg, parse_uptime};
use crate::metrics::{capture_timestamp, MetricValue, Section, Snapshot};

type DiskUsageReader = fn(&Path) -> Result<DiskUsage, SampleError>;

/// Collects the local Linux host from procfs.
///
/// Every pseudo-file is read independently; a missing or malformed file only
/// blanks the metrics it feeds, so `collect_all()` never fails.
pub struct HostCollector {
    proc_root: PathBuf,
    cpu_delay: Duration,
    disk_usage: DiskUsageReader,
    node: String,
}

impl HostCollector {
    pub fn new(proc_root: impl Into<PathBuf>, cpu_delay: Duration) -> Self {
        let mut collector = HostCollector {
            proc_root: proc_root.into(),
            cpu_delay,
            disk_usage: statvfs_usage,
            node: String::new(),
        };
        collector.node = collector
            .hostname()
            .unwrap_or_else(|| "localhost".to_string());
        collector
    }

    /// Replaces `statvfs(3)` for mount usage.
    pub fn with_disk_usage(mut self, reader: DiskUsageReader) -> Self {
        self.disk_usage = reader;
        self
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.proc_root.join(relative)
    }

    fn read(&self, relative: &str) -> Result<String, SampleError> {
        let path = self.path(relative);
        fs::read_to_string(&path).map_err(|source| SampleError::Io { path, source })
    }

    fn read_first_line(&self, relative: &str) -> Option<String> {
        self.read(relative)
            .ok()
            .and_then(|text| text.lines().next().map(|line| line.trim().to_string()))
            .filter(|line| !line.is_empty())
    }

    fn hostname(&self) -> Option<String> {
        self.read_first_line("sys/kernel/hostname")
            .or_else(System::host_name)
    }

    fn kernel_version(&self) -> Option<String> {
        self.read_first_line("sys/kernel/osrelease")
            .or_else(System::kernel_version)
    }

    fn system_section(&self) -> Section {
        let cpu_usage = sample_cpu_usage(
            || self.read("stat").and_then(|text| parse_cpu_times(&text)),
            self.cpu_delay,
        );
        let loadavg = self.read("loadavg").and_then(|text| parse_loadavg(&text));
        let load = |index: usize| -> MetricValue {
            loadavg
                .as_ref()
                .map(|values| MetricValue::from(values[index]))
                .unwrap_or(MetricValue::Unavailable)
        };

        Section::new()
            .with(
                "uptime_seconds",
                measured("uptime", self.read("uptime").and_then(|text| parse_uptime(&text))),
            )
            .with("cpu_count", num_cpus::get())
            .with("cpu_usage_percent", measured("cpu usage", cpu_usage))
            .with("loadavg_1", load(0))
            .with("loadavg_5", load(1))
            .with("loadavg_15", load(2))
            .with(
                "process_count",
                measured("process count", count_processes(&self.proc_root)),
            )
    }

    fn file_descriptor_section(&self) -> Section {
        let file_nr = self
            .read("sys/fs/file-nr")
            .and_then(|text| parse_file_nr(&text));
        match file_nr {
            Ok((allocated, _unused, max)) => Section::new()
                .with("allocated", allocated)
                .with("max", max),
            Err(err) => {
                log::debug!("file descriptor usage unavailable: {}", err);
                Section::unavailable(&["allocated", "max"])
            }
        }
    }
}

impl Collector for HostCollector {
    fn target(&self) -> &str {
        &self.node
    }

    fn collect_all(&mut self) -> Result<Snapshot, CollectError> {
        let system = self.system_section();

        let meminfo = self.read("meminfo").map(|text| parse_meminfo(&text));
        let memory = memory_section(meminfo.as_ref().ok());

        let mounts = self.read("mounts").ok();
        let disk = disk_section(mounts.as_deref(), self.disk_usage);

        let interfaces = self.read("net/dev").map(|text| parse_net_dev(&text)).ok();
        let network = network_section(interfaces.as_deref());

        let file_descriptors = self.file_descriptor_section();

        let meta = Section::new()
            .with("timestamp", capture_timestamp())
            .with("node", self.hostname())
            .with("kernel_version", self.kernel_version());

        Ok(Snapshot::new()
            .with("system", system)
            .with("memory", memory)
            .with("disk", disk)
            .with("network", network)
            .with("file_descriptors", file_descriptors)
            .with("meta", meta))
    }
}

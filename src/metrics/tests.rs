#![cfg(test)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::cpu::{parse_cpu_times, sample_cpu_usage, usage_between, CpuTimes};
use super::disk::{disk_section, parse_mounts, select_mounts, DiskUsage, MountEntry};
use super::fields::{client_buffer_totals, parse_colon_pairs, parse_key_values, percent, round_to};
use super::latency::{mean_latency_ms, measure_latency_ms};
use super::memory::{memory_section, parse_meminfo, usage};
use super::network::{network_section, parse_net_dev};
use super::system::{count_processes, parse_file_nr, parse_loadavg, parse_uptime};
use super::{LoopState, MetricValue, PollingLoop, Section, Snapshot};
use crate::collectors::Collector;
use crate::error::{CollectError, SampleError};

#[test]
fn rounding_and_percentages() {
    assert_eq!(round_to(1.23456, 3), 1.235);
    assert_eq!(round_to(80.0, 2), 80.0);
    assert_eq!(round_to(0.7, 6), 0.7);
    assert_eq!(percent(1, 3), Some(33.33));
    assert_eq!(percent(5, 0), None);
}

#[test]
fn unavailable_is_distinct_from_zero_and_empty() {
    let section = Section::new()
        .with("zero", 0i64)
        .with("empty", "")
        .with("missing", None::<i64>);

    assert_eq!(section.get("zero"), Some(&MetricValue::Int(0)));
    assert_eq!(section.get("empty"), Some(&MetricValue::Text(String::new())));
    assert_eq!(section.get("missing"), Some(&MetricValue::Unavailable));

    let json = serde_json::to_value(&section).unwrap();
    assert_eq!(json["zero"], 0);
    assert_eq!(json["empty"], "");
    assert!(json["missing"].is_null());
}

#[test]
fn section_set_replaces_in_place() {
    let mut section = Section::unavailable(&["a", "b", "c"]);
    section.set("b", 2i64);
    assert_eq!(section.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(section.get("b"), Some(&MetricValue::Int(2)));
    assert!(section.get("a").unwrap().is_unavailable());
}

#[test]
fn scalars_are_typed_from_text() {
    assert_eq!(MetricValue::parse_scalar("42"), MetricValue::Int(42));
    assert_eq!(MetricValue::parse_scalar("1.25"), MetricValue::Float(1.25));
    assert_eq!(MetricValue::parse_scalar("ok\r"), MetricValue::Text("ok".into()));
    assert_eq!(MetricValue::parse_scalar("nan"), MetricValue::Text("nan".into()));
}

#[test]
fn cpu_usage_from_synthetic_reads() {
    let usage = usage_between(CpuTimes::new(100, 1000), CpuTimes::new(120, 1100)).unwrap();
    assert_eq!(usage, 80.0);
}

#[test]
fn cpu_usage_guards_against_stalled_counters() {
    assert!(matches!(
        usage_between(CpuTimes::new(0, 0), CpuTimes::new(10, 100)),
        Err(SampleError::Guard(_))
    ));
    assert!(matches!(
        usage_between(CpuTimes::new(10, 100), CpuTimes::new(10, 100)),
        Err(SampleError::Guard(_))
    ));
}

#[test]
fn cpu_sampler_reads_twice_around_the_delay() {
    let reads = RefCell::new(vec![CpuTimes::new(120, 1100), CpuTimes::new(100, 1000)]);
    let usage = sample_cpu_usage(
        || Ok(reads.borrow_mut().pop().unwrap()),
        Duration::from_millis(1),
    )
    .unwrap();
    assert_eq!(usage, 80.0);
    assert!(reads.borrow().is_empty());
}

#[test]
fn cpu_sampler_skips_the_sleep_when_first_read_is_empty() {
    let calls = RefCell::new(0);
    let outcome = sample_cpu_usage(
        || {
            *calls.borrow_mut() += 1;
            Ok(CpuTimes::default())
        },
        Duration::from_secs(60),
    );
    assert!(outcome.is_err());
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn parses_aggregate_cpu_line() {
    let stat = "cpu  10 20 30 400 50 6 7 8 100 100\ncpu0 1 2 3 4 5 6 7 8 9 10\nintr 1\n";
    let times = parse_cpu_times(stat).unwrap();
    assert_eq!(times.idle, 450);
    assert_eq!(times.total, 450 + 10 + 20 + 30 + 6 + 7 + 8);
}

#[test]
fn parses_short_cpu_line_from_old_kernels() {
    let times = parse_cpu_times("cpu 5 0 5 90\n").unwrap();
    assert_eq!(times, CpuTimes::new(90, 100));
    assert!(parse_cpu_times("intr 1 2 3\n").is_err());
}

#[test]
fn latency_is_the_plain_mean() {
    let samples = [
        Duration::from_millis(10),
        Duration::from_millis(20),
        Duration::from_millis(30),
    ];
    assert_eq!(mean_latency_ms(&samples), Some(20.0));
    assert_eq!(mean_latency_ms(&[]), None);
}

#[test]
fn latency_pings_exactly_n_times() {
    let mut pings = 0;
    let latency = measure_latency_ms::<()>(4, || {
        pings += 1;
        Ok(())
    })
    .unwrap();
    assert_eq!(pings, 4);
    assert!(latency >= 0.0);
}

#[test]
fn latency_fails_on_first_failed_ping() {
    let mut pings = 0;
    let outcome = measure_latency_ms(3, || {
        pings += 1;
        if pings == 2 {
            Err("timeout")
        } else {
            Ok(())
        }
    });
    assert_eq!(outcome, Err("timeout"));
    assert_eq!(pings, 2);
}

#[test]
fn key_value_tokens_without_equals_are_skipped() {
    let fields = parse_key_values("id=3 addr=127.0.0.1:6379 bogus name= cmd=client|list");
    assert_eq!(fields.get("id"), Some(&"3"));
    assert_eq!(fields.get("name"), Some(&""));
    assert_eq!(fields.get("cmd"), Some(&"client|list"));
    assert!(!fields.contains_key("bogus"));
}

#[test]
fn client_buffers_sum_every_alias_across_lines() {
    let list = "id=1 qbuf=10 qbuf-free=100 obl=2 omem=30\n\
                id=2 qbuf=x ibl=5 obuf=7\n\
                id=3 input_buffer_length=1 output_buffer_length=4 omem=oops\n";
    assert_eq!(client_buffer_totals(list), (16, 43));
    assert_eq!(client_buffer_totals(""), (0, 0));
}

#[test]
fn colon_pairs_skip_headers_and_blank_lines() {
    let pairs = parse_colon_pairs("# Cluster\r\ncluster_state:ok\r\n\r\ncluster_slots_ok: 16384\r\n");
    assert_eq!(pairs.get("cluster_state").map(String::as_str), Some("ok"));
    assert_eq!(pairs.get("cluster_slots_ok").map(String::as_str), Some("16384"));
    assert_eq!(pairs.len(), 2);
}

#[test]
fn memory_used_is_total_minus_available() {
    let meminfo = parse_meminfo(
        "MemTotal:        1000 kB\nMemFree:          100 kB\nMemAvailable:     250 kB\n\
         SwapTotal:        400 kB\nSwapFree:         100 kB\n",
    );
    let section = memory_section(Some(&meminfo));
    assert_eq!(section.get("mem_used_kb"), Some(&MetricValue::Int(750)));
    assert_eq!(section.get("mem_used_percent"), Some(&MetricValue::Float(75.0)));
    assert_eq!(section.get("swap_used_kb"), Some(&MetricValue::Int(300)));
    assert_eq!(section.get("swap_used_percent"), Some(&MetricValue::Float(75.0)));
}

#[test]
fn memory_percent_unavailable_for_zero_total() {
    let u = usage(0, 0);
    assert_eq!(u.used, 0);
    assert_eq!(u.used_percent, None);

    let meminfo = parse_meminfo("SwapTotal: 0 kB\nSwapFree: 0 kB\n");
    let section = memory_section(Some(&meminfo));
    assert_eq!(section.get("swap_used_kb"), Some(&MetricValue::Int(0)));
    assert!(section.get("swap_used_percent").unwrap().is_unavailable());
    assert!(section.get("mem_total_kb").unwrap().is_unavailable());
}

#[test]
fn memory_used_is_clamped_at_zero() {
    assert_eq!(usage(100, 150).used, 0);
}

#[test]
fn missing_meminfo_keeps_every_field() {
    let section = memory_section(None);
    assert_eq!(section.len(), 8);
    assert!(section.iter().all(|(_, value)| value.is_unavailable()));
}

fn mount(device: &str, path: &str, fs: &str) -> MountEntry {
    MountEntry {
        device: Some(device.to_string()),
        mount_point: path.to_string(),
        fs_type: Some(fs.to_string()),
    }
}

#[test]
fn mounts_keep_real_filesystems_once() {
    let entries = vec![
        mount("/dev/sda1", "/", "ext4"),
        mount("tmpfs", "/run", "tmpfs"),
        mount("proc", "/proc", "proc"),
        mount("/dev/sdb1", "/data", "xfs"),
        mount("/dev/sdb1", "/data", "xfs"),
        mount("/dev/sda1", "/", "ext4"),
    ];
    let selected = select_mounts(&entries);
    let paths: Vec<&str> = selected.iter().map(|m| m.mount_point.as_str()).collect();
    assert_eq!(paths, vec!["/", "/data"]);
}

#[test]
fn root_is_forced_when_no_allow_listed_entry_matches() {
    let entries = vec![
        mount("overlay", "/", "overlay"),
        mount("/dev/vdb", "/srv", "ext4"),
    ];
    let selected = select_mounts(&entries);
    let roots: Vec<&MountEntry> = selected.iter().filter(|m| m.mount_point == "/").collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].fs_type.as_deref(), Some("overlay"));

    let synthesized = select_mounts(&[]);
    assert_eq!(synthesized.len(), 1);
    assert_eq!(synthesized[0].mount_point, "/");
    assert_eq!(synthesized[0].fs_type, None);
}

#[test]
fn mount_paths_decode_octal_escapes() {
    let entries = parse_mounts("/dev/sdc1 /mnt/my\\040disk ext4 rw 0 0\nshort line\n");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mount_point, "/mnt/my disk");
}

fn fake_usage(path: &Path) -> Result<DiskUsage, SampleError> {
    match path.to_str() {
        Some("/") => Ok(DiskUsage {
            total: 1000,
            used: 400,
            free: 550,
        }),
        Some("/empty") => Ok(DiskUsage {
            total: 0,
            used: 0,
            free: 0,
        }),
        _ => Err(SampleError::Guard("no such mount")),
    }
}

#[test]
fn disk_section_reports_root_and_each_mount() {
    let mounts = "/dev/sda1 / ext4 rw 0 0\n/dev/sdb /empty ext4 rw 0 0\n/dev/sdc /gone xfs rw 0 0\n";
    let section = disk_section(Some(mounts), fake_usage);

    assert_eq!(section.get("root_total_bytes"), Some(&MetricValue::Int(1000)));
    assert_eq!(section.get("root_used_bytes"), Some(&MetricValue::Int(400)));
    assert_eq!(section.get("root_free_bytes"), Some(&MetricValue::Int(550)));
    assert_eq!(section.get("root_used_percent"), Some(&MetricValue::Float(40.0)));

    let per_mount = section.get("mounts").and_then(MetricValue::as_section).unwrap();
    let empty = per_mount.get("/empty").and_then(MetricValue::as_section).unwrap();
    assert!(empty.get("used_percent").unwrap().is_unavailable());
    let gone = per_mount.get("/gone").and_then(MetricValue::as_section).unwrap();
    assert!(gone.get("total_bytes").unwrap().is_unavailable());
    assert_eq!(gone.get("fs_type"), Some(&MetricValue::Text("xfs".into())));
}

#[test]
fn net_dev_totals_and_per_interface_counters() {
    let text = "Inter-|   Receive                                                |  Transmit\n \
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
 lo:  1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0\n  \
 eth0: 5000      50    0    0    0     0          0         0     2500      25    0    0    0     0       0          0\n  \
 bad0: 1 2 3\n";
    let interfaces = parse_net_dev(text);
    assert_eq!(interfaces.len(), 2);
    assert_eq!(interfaces[1].name, "eth0");
    assert_eq!(interfaces[1].tx_packets, 25);

    let section = network_section(Some(&interfaces));
    assert_eq!(section.get("rx_bytes_total"), Some(&MetricValue::Int(6000)));
    assert_eq!(section.get("tx_bytes_total"), Some(&MetricValue::Int(3500)));
    let eth0 = section
        .get("interfaces")
        .and_then(MetricValue::as_section)
        .and_then(|s| s.get("eth0"))
        .and_then(MetricValue::as_section)
        .unwrap();
    assert_eq!(eth0.get("rx_packets"), Some(&MetricValue::Int(50)));

    let unreadable = network_section(None);
    assert!(unreadable.get("rx_bytes_total").unwrap().is_unavailable());
    assert!(unreadable.contains("interfaces"));
}

#[test]
fn small_pseudo_files_parse() {
    assert_eq!(parse_uptime("12345.67 54321.00\n").unwrap(), 12345.67);
    assert_eq!(parse_loadavg("0.52 0.58 0.59 1/467 12345\n").unwrap(), [0.52, 0.58, 0.59]);
    assert_eq!(parse_file_nr("4128\t0\t9223372036854775807\n").unwrap().0, 4128);
    assert!(parse_loadavg("garbage").is_err());
    assert!(parse_file_nr("1 2").is_err());
}

#[test]
fn process_count_only_counts_numeric_directories() {
    let root = TempDir::new().unwrap();
    for name in ["1", "42", "self", "sys"] {
        fs::create_dir_all(root.path().join(name)).unwrap();
    }
    fs::write(root.path().join("7"), b"not a dir").unwrap();

    assert_eq!(count_processes(root.path()).unwrap(), 2);
    assert!(count_processes(&root.path().join("missing")).is_err());
}

struct CountingCollector {
    calls: Arc<AtomicUsize>,
    fail_on: Vec<usize>,
}

impl Collector for CountingCollector {
    fn target(&self) -> &str {
        "counting"
    }

    fn collect_all(&mut self) -> Result<Snapshot, CollectError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(CollectError::Aborted {
                target: "counting".to_string(),
                reason: format!("call {} failed", call),
            });
        }
        Ok(Snapshot::new().with("meta", Section::new().with("call", call)))
    }
}

#[tokio::test]
async fn one_shot_collects_exactly_once_on_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let collector = CountingCollector {
        calls: Arc::clone(&calls),
        fail_on: vec![],
    };
    let mut poller = PollingLoop::new(Box::new(collector), 0);
    let mut seen = 0;

    let state = poller.run(|_| seen += 1, CancellationToken::new()).await;

    assert_eq!(state, LoopState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn one_shot_collects_exactly_once_on_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let collector = CountingCollector {
        calls: Arc::clone(&calls),
        fail_on: vec![1],
    };
    let mut poller = PollingLoop::new(Box::new(collector), -5);
    let mut seen = 0;

    let state = poller.run(|_| seen += 1, CancellationToken::new()).await;

    assert_eq!(state, LoopState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(seen, 0);
    assert_eq!(poller.failures(), 1);
}

#[tokio::test]
async fn periodic_loop_survives_a_failed_cycle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let collector = CountingCollector {
        calls: Arc::clone(&calls),
        fail_on: vec![1],
    };
    let mut poller = PollingLoop::new(Box::new(collector), 1);
    let cancel = CancellationToken::new();
    let stop = cancel.clone();

    let state = timeout(
        Duration::from_secs(10),
        poller.run(move |_| stop.cancel(), cancel),
    )
    .await
    .expect("loop did not stop after the second cycle");

    assert_eq!(state, LoopState::Stopped);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(poller.cycles(), 2);
    assert_eq!(poller.failures(), 1);
}

struct PanickingCollector;

impl Collector for PanickingCollector {
    fn target(&self) -> &str {
        "panicking"
    }

    fn collect_all(&mut self) -> Result<Snapshot, CollectError> {
        panic!("collector blew up");
    }
}

#[tokio::test]
async fn panicking_collector_is_a_failed_cycle() {
    let mut poller = PollingLoop::new(Box::new(PanickingCollector), 0);
    let outcome = poller.tick().await;
    assert!(matches!(outcome, Err(CollectError::Aborted { .. })));
    assert_eq!(poller.failures(), 1);
}

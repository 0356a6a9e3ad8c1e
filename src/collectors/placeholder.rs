use super::Collector;
use crate::error::CollectError;
use crate::metrics::{capture_timestamp, Section, Snapshot};

type Schema = &'static [(&'static str, &'static [&'static str])];

const BROKER_SCHEMA: Schema = &[
    ("broker", &["cluster_id", "num_brokers", "controller_id"]),
    ("topics", &["num_topics", "num_partitions"]),
    ("throughput", &["bytes_in_per_sec", "bytes_out_per_sec"]),
    ("lag", &["consumer_lag_total"]),
];

const RUNTIME_SCHEMA: Schema = &[
    (
        "memory",
        &[
            "heap_used_bytes",
            "heap_committed_bytes",
            "heap_max_bytes",
            "non_heap_used_bytes",
            "non_heap_committed_bytes",
            "metaspace_used_bytes",
            "metaspace_committed_bytes",
        ],
    ),
    (
        "gc",
        &[
            "young_gc_count",
            "young_gc_time_ms",
            "old_gc_count",
            "old_gc_time_ms",
        ],
    ),
    (
        "threads",
        &[
            "thread_count",
            "daemon_thread_count",
            "peak_thread_count",
            "deadlocked_thread_count",
        ],
    ),
    (
        "classloading",
        &[
            "loaded_class_count",
            "total_loaded_class_count",
            "unloaded_class_count",
        ],
    ),
    (
        "cpu",
        &["process_cpu_load", "system_cpu_load", "process_cpu_time_ns"],
    ),
    (
        "runtime",
        &["uptime_ms", "compiler_total_time_ms", "safepoint_count"],
    ),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderKind {
    Broker,
    Runtime,
}

impl PlaceholderKind {
    fn schema(self) -> Schema {
        match self {
            PlaceholderKind::Broker => BROKER_SCHEMA,
            PlaceholderKind::Runtime => RUNTIME_SCHEMA,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PlaceholderKind::Broker => "kafka",
            PlaceholderKind::Runtime => "jvm",
        }
    }
}

/// A target without a real collector yet.
///
/// Always succeeds with its fixed schema, every metric unavailable and
/// `meta.not_implemented` set.
pub struct PlaceholderCollector {
    kind: PlaceholderKind,
    identity: String,
    meta_fields: Vec<(&'static str, Option<String>)>,
}

impl PlaceholderCollector {
    pub fn broker(bootstrap_servers: Option<String>, group_id: Option<String>) -> Self {
        Self::new(
            PlaceholderKind::Broker,
            vec![
                ("bootstrap_servers", bootstrap_servers),
                ("group_id", group_id),
            ],
        )
    }

    pub fn runtime(jmx_url: Option<String>) -> Self {
        Self::new(PlaceholderKind::Runtime, vec![("jmx_url", jmx_url)])
    }

    fn new(kind: PlaceholderKind, meta_fields: Vec<(&'static str, Option<String>)>) -> Self {
        let identity = meta_fields
            .first()
            .and_then(|(_, value)| value.clone())
            .unwrap_or_else(|| kind.name().to_string());
        PlaceholderCollector {
            kind,
            identity,
            meta_fields,
        }
    }

    pub fn kind(&self) -> PlaceholderKind {
        self.kind
    }
}

impl Collector for PlaceholderCollector {
    fn target(&self) -> &str {
        &self.identity
    }

    fn collect_all(&mut self) -> Result<Snapshot, CollectError> {
        let mut snapshot = Snapshot::new();
        for (section, metrics) in self.kind.schema() {
            snapshot.insert(section, Section::unavailable(metrics));
        }

        let mut meta = Section::new().with("timestamp", capture_timestamp());
        for (name, value) in &self.meta_fields {
            meta.set(name, value.clone());
        }
        meta.set("not_implemented", true);
        snapshot.insert("meta", meta);

        Ok(snapshot)
    }
}

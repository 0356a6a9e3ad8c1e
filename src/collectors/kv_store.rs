use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use redis::RedisResult;

use super::kv_client::{RedisConnector, StoreClient, StoreConnector};
use super::Collector;
use crate::config::ConnectionPolicy;
use crate::error::{CollectError, SampleError};
use crate::metrics::fields::{client_buffer_totals, measured, parse_colon_pairs, round_to};
use crate::metrics::latency::measure_latency_ms;
use crate::metrics::{capture_timestamp, MetricValue, Section, Snapshot};

const MEMORY_INFO_FIELDS: &[&str] = &[
    "used_memory",
    "used_memory_rss",
    "used_memory_peak",
    "mem_fragmentation_ratio",
    "maxmemory",
    "evicted_keys",
];

const PERSISTENCE_INFO_FIELDS: &[&str] = &[
    "rdb_last_save_time",
    "rdb_changes_since_last_save",
    "aof_current_size",
    "aof_base_size",
    "aof_last_write_status",
];

const SYSTEM_INFO_FIELDS: &[&str] = &[
    "used_cpu_sys",
    "used_cpu_user",
    "used_cpu_sys_children",
    "used_cpu_user_children",
];

/// `hits / (hits + misses)`, six decimals.
///
/// A missing counter counts as zero. `None` when both are missing or the sum
/// is zero.
pub fn hit_rate(hits: Option<i64>, misses: Option<i64>) -> Option<f64> {
    if hits.is_none() && misses.is_none() {
        return None;
    }
    let hits = hits.unwrap_or(0);
    let lookups = hits.saturating_add(misses.unwrap_or(0));
    if lookups <= 0 {
        return None;
    }
    Some(round_to(hits as f64 / lookups as f64, 6))
}

/// Total slots covered by the reported ranges.
///
/// Ranges are summed as reported: overlaps are counted twice, matching what
/// the server itself returns.
pub fn slot_coverage(ranges: &[(i64, i64)]) -> i64 {
    ranges.iter().map(|(start, end)| end - start + 1).sum()
}

struct Info(HashMap<String, String>);

impl Info {
    fn parse(text: &str) -> Self {
        Info(parse_colon_pairs(text))
    }

    fn value(&self, key: &str) -> MetricValue {
        self.0
            .get(key)
            .map(|raw| MetricValue::parse_scalar(raw))
            .unwrap_or(MetricValue::Unavailable)
    }

    fn integer(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|raw| raw.parse::<i64>().ok())
    }

    fn section(&self, keys: &[&str]) -> Section {
        let mut section = Section::new();
        for key in keys {
            section.set(key, self.value(key));
        }
        section
    }
}

fn command<T>(command: &'static str, result: RedisResult<T>) -> Result<T, SampleError> {
    result.map_err(|source| SampleError::Command { command, source })
}

/// Collects from a Redis-protocol key-value store.
///
/// Only a failed connection or a failed `INFO` aborts the call; every other
/// command degrades to unavailable metrics.
pub struct KvStoreCollector<K: StoreConnector = RedisConnector> {
    url: String,
    connector: K,
    ping_samples: usize,
    policy: ConnectionPolicy,
    connection: Option<K::Client>,
}

impl KvStoreCollector<RedisConnector> {
    pub fn open(
        url: &str,
        ping_samples: usize,
        ping_timeout: Duration,
        policy: ConnectionPolicy,
    ) -> Result<Self, CollectError> {
        let connector =
            RedisConnector::open(url, ping_timeout).map_err(|source| CollectError::Connection {
                target: url.to_string(),
                source,
            })?;
        Ok(Self::with_connector(url, connector, ping_samples, policy))
    }
}

impl<K: StoreConnector> KvStoreCollector<K> {
    pub fn with_connector(
        url: &str,
        connector: K,
        ping_samples: usize,
        policy: ConnectionPolicy,
    ) -> Self {
        KvStoreCollector {
            url: url.to_string(),
            connector,
            ping_samples: ping_samples.max(1),
            policy,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn collect_from(&self, client: &mut K::Client) -> Result<Snapshot, CollectError> {
        let info_text = client.info(None).map_err(|source| CollectError::Query {
            target: self.url.clone(),
            command: "INFO",
            source,
        })?;
        let info = Info::parse(&info_text);
        let timestamp = capture_timestamp();

        let latency = measured(
            "latency_ms",
            command("PING", measure_latency_ms(self.ping_samples, || client.ping())),
        );
        let buffers = command("CLIENT LIST", client.client_list())
            .map(|list| client_buffer_totals(&list));
        let allocator_stats = measured(
            "allocator_stats",
            command("MEMORY MALLOC-STATS", client.malloc_stats()),
        );

        let performance = Section::new()
            .with("instantaneous_ops_per_sec", info.value("instantaneous_ops_per_sec"))
            .with("latency_ms", latency)
            .with("total_commands_processed", info.value("total_commands_processed"))
            .with("keyspace_hits", info.value("keyspace_hits"))
            .with("keyspace_misses", info.value("keyspace_misses"))
            .with(
                "hit_rate",
                hit_rate(info.integer("keyspace_hits"), info.integer("keyspace_misses")),
            )
            .with("expired_keys", info.value("expired_keys"));

        let mut memory = info.section(MEMORY_INFO_FIELDS);
        memory.set("allocator_stats", allocator_stats);

        let persistence = info.section(PERSISTENCE_INFO_FIELDS);

        let (input_buffers, output_buffers) = match buffers {
            Ok((input, output)) => (MetricValue::from(input), MetricValue::from(output)),
            Err(err) => {
                debug!("client buffers unavailable: {}", err);
                (MetricValue::Unavailable, MetricValue::Unavailable)
            }
        };
        let network = Section::new()
            .with("connected_clients", info.value("connected_clients"))
            .with("blocked_clients", info.value("blocked_clients"))
            .with("input_buffer_length", input_buffers)
            .with("output_buffer_length", output_buffers);

        let system = info.section(SYSTEM_INFO_FIELDS);

        let cluster = self.cluster_section(client, &info);

        let meta = Section::new()
            .with("timestamp", timestamp)
            .with("redis_url", self.url.as_str());

        Ok(Snapshot::new()
            .with("performance", performance)
            .with("memory", memory)
            .with("persistence", persistence)
            .with("network", network)
            .with("system", system)
            .with("cluster", cluster)
            .with("meta", meta))
    }

    fn cluster_section(&self, client: &mut K::Client, info: &Info) -> Section {
        let mut cluster = Section::unavailable(&[
            "master_link_status",
            "master_last_io_seconds_ago",
            "repl_backlog_size",
            "cluster_state",
            "cluster_slots_assigned",
            "cluster_slots_pfail",
            "cluster_slots_fail",
        ]);
        cluster.set("repl_backlog_size", info.value("repl_backlog_size"));

        match command("INFO replication", client.info(Some("replication"))) {
            Ok(text) => {
                let replication = Info::parse(&text);
                cluster.set("master_link_status", replication.value("master_link_status"));
                cluster.set(
                    "master_last_io_seconds_ago",
                    replication.value("master_last_io_seconds_ago"),
                );
                if cluster
                    .get("repl_backlog_size")
                    .map(MetricValue::is_unavailable)
                    .unwrap_or(true)
                {
                    cluster.set("repl_backlog_size", replication.value("repl_backlog_size"));
                }
            }
            Err(err) => debug!("replication metrics unavailable: {}", err),
        }

        let state = command("CLUSTER INFO", client.cluster_info()).map(|text| {
            parse_colon_pairs(&text)
                .remove("cluster_state")
                .map(MetricValue::from)
                .unwrap_or(MetricValue::Unavailable)
        });
        cluster.set("cluster_state", measured::<MetricValue>("cluster_state", state));

        // Failed and suspect slot counts need CLUSTER NODES; SLOTS alone only
        // yields the assigned total, so they stay at zero when SLOTS answers.
        match command("CLUSTER SLOTS", client.cluster_slots()) {
            Ok(ranges) => {
                cluster.set("cluster_slots_assigned", slot_coverage(&ranges));
                cluster.set("cluster_slots_pfail", 0i64);
                cluster.set("cluster_slots_fail", 0i64);
            }
            Err(err) => debug!("cluster slot metrics unavailable: {}", err),
        }

        cluster
    }
}

impl<K> Collector for KvStoreCollector<K>
where
    K: StoreConnector + 'static,
{
    fn target(&self) -> &str {
        &self.url
    }

    fn collect_all(&mut self) -> Result<Snapshot, CollectError> {
        let mut client = match self.connection.take() {
            Some(client) => client,
            None => self
                .connector
                .connect()
                .map_err(|source| CollectError::Connection {
                    target: self.url.clone(),
                    source,
                })?,
        };

        let result = self.collect_from(&mut client);
        if result.is_ok() && self.policy == ConnectionPolicy::Persistent {
            self.connection = Some(client);
        }
        result
    }
}

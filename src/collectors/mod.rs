//! One collector per monitored target.
//!
//! Every collector returns the same [`Snapshot`] shape on every call: metrics
//! that could not be measured are present as unavailable, never dropped. Only
//! a failure that leaves nothing to report (no connection, no core query)
//! surfaces as a [`CollectError`].

mod host;
mod kv_client;
mod kv_store;
mod placeholder;

pub use host::HostCollector;
pub use kv_client::{RedisConnector, StoreClient, StoreConnector};
pub use kv_store::{hit_rate, slot_coverage, KvStoreCollector};
pub use placeholder::{PlaceholderCollector, PlaceholderKind};

use crate::config::{MonitorConfig, Target};
use crate::error::CollectError;
use crate::metrics::Snapshot;

/// A stateful handle bound to one target.
pub trait Collector: Send {
    /// Identity of the polled target, used in logs.
    fn target(&self) -> &str;

    /// Takes one snapshot.
    ///
    /// # Errors
    ///
    /// Only when the target cannot be reached at all. Partial failures show up
    /// as unavailable metrics instead.
    fn collect_all(&mut self) -> Result<Snapshot, CollectError>;
}

/// Builds the collector selected by `config.target`.
pub fn build_collector(config: &MonitorConfig) -> Result<Box<dyn Collector>, CollectError> {
    let collector: Box<dyn Collector> = match config.target {
        Target::Redis => Box::new(KvStoreCollector::open(
            &config.redis_url,
            config.ping_samples,
            config.ping_timeout,
            config.connection_policy,
        )?),
        Target::Linux => Box::new(HostCollector::new(
            config.proc_root.clone(),
            config.cpu_sample_delay,
        )),
        Target::Kafka => Box::new(PlaceholderCollector::broker(
            config.kafka_bootstrap.clone(),
            config.kafka_group.clone(),
        )),
        Target::Jvm => Box::new(PlaceholderCollector::runtime(config.jmx_url.clone())),
    };
    Ok(collector)
}

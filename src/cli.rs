use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConnectionPolicy, FileConfig, OutputMode, Target};

/// Poll a service or the local host and print a metrics snapshot.
///
/// Flags override values from the YAML config file.
#[derive(Debug, Parser)]
#[command(name = "service-monitor", version, about)]
pub struct Cli {
    /// YAML config file. Defaults to <config dir>/service-monitor/config.yaml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// What to monitor.
    #[arg(long, value_enum)]
    pub target: Option<Target>,

    /// Redis URL, e.g. redis://localhost:6379/0
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Kafka bootstrap servers, e.g. localhost:9092
    #[arg(long, env = "KAFKA_BOOTSTRAP")]
    pub kafka_bootstrap: Option<String>,

    /// Kafka consumer group to report lag for.
    #[arg(long, env = "KAFKA_GROUP")]
    pub kafka_group: Option<String>,

    /// JMX endpoint of the JVM to monitor.
    #[arg(long, env = "JMX_URL")]
    pub jmx_url: Option<String>,

    /// Seconds between polls. 0 polls once and exits.
    #[arg(long, allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Output format.
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,

    /// PING round trips averaged into latency_ms (redis).
    #[arg(long, env = "REDIS_PING_SAMPLES")]
    pub ping_samples: Option<u32>,

    /// Connect/read/write timeout in milliseconds (redis).
    #[arg(long, env = "REDIS_PING_TIMEOUT_MS")]
    pub ping_timeout_ms: Option<u64>,

    /// Delay between the two CPU counter reads in milliseconds (linux).
    #[arg(long)]
    pub cpu_sample_delay_ms: Option<u64>,

    /// Keep the redis connection between polls or reconnect every poll.
    #[arg(long, value_enum)]
    pub connection_policy: Option<ConnectionPolicy>,

    /// Root of the proc filesystem (linux).
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Log sub-measurement failures and loop progress.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The flags that were given, in config-file shape.
    pub fn overrides(&self) -> FileConfig {
        FileConfig {
            target: self.target,
            redis_url: self.redis_url.clone(),
            kafka_bootstrap: self.kafka_bootstrap.clone(),
            kafka_group: self.kafka_group.clone(),
            jmx_url: self.jmx_url.clone(),
            interval: self.interval,
            output: self.output,
            ping_samples: self.ping_samples,
            ping_timeout_ms: self.ping_timeout_ms,
            cpu_sample_delay_ms: self.cpu_sample_delay_ms,
            connection_policy: self.connection_policy,
            proc_root: self.proc_root.clone(),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// A single metric (or metric group) could not be derived.
///
/// These never escape a collector: they are folded into
/// [`MetricValue::Unavailable`](crate::metrics::MetricValue::Unavailable).
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {source_name}: {detail}")]
    Malformed {
        source_name: String,
        detail: String,
    },

    #[error("{command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: redis::RedisError,
    },

    #[error("{0}")]
    Guard(&'static str),
}

impl SampleError {
    pub fn malformed(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        SampleError::Malformed {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

/// The collector as a whole could not produce a snapshot.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("{command} query against {target} failed: {source}")]
    Query {
        target: String,
        command: &'static str,
        #[source]
        source: redis::RedisError,
    },

    #[error("collector for {target} aborted: {reason}")]
    Aborted { target: String, reason: String },
}

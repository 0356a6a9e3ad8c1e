pub mod cli;
pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod render;

pub use collectors::{build_collector, Collector};
pub use config::{MonitorConfig, OutputMode, Target};
pub use error::{CollectError, SampleError};
pub use metrics::{LoopState, MetricValue, PollingLoop, Section, Snapshot};
pub use render::render;

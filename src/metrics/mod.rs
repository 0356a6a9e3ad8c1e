pub mod cpu;
pub mod disk;
pub mod fields;
pub mod latency;
pub mod memory;
pub mod network;
mod sampler;
pub mod system;
mod tests;
mod types;

pub use sampler::{LoopState, PollingLoop};
pub use types::{capture_timestamp, MetricValue, Section, Snapshot};

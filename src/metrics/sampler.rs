use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error};
use tokio::select;
use tokio::task;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::types::Snapshot;
use crate::collectors::Collector;
use crate::error::CollectError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Drives one collector on a fixed interval.
///
/// A failed cycle is logged and the loop carries on with the next tick. With
/// an interval of zero or less the loop runs exactly one cycle.
pub struct PollingLoop {
    collector: Arc<Mutex<Box<dyn Collector>>>,
    target: String,
    interval_secs: i64,
    state: LoopState,
    cycles: u64,
    failures: u64,
}

impl PollingLoop {
    pub fn new(collector: Box<dyn Collector>, interval_secs: i64) -> Self {
        let target = collector.target().to_string();
        PollingLoop {
            collector: Arc::new(Mutex::new(collector)),
            target,
            interval_secs,
            state: LoopState::Running,
            cycles: 0,
            failures: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn is_one_shot(&self) -> bool {
        self.interval_secs <= 0
    }

    /// Runs a single `collect_all()` on a blocking worker.
    ///
    /// A panicking collector is reported as a failed cycle; the collector stays
    /// usable for the next tick.
    pub async fn tick(&mut self) -> Result<Snapshot, CollectError> {
        let collector = Arc::clone(&self.collector);
        let outcome = task::spawn_blocking(move || {
            let mut guard = collector.lock().unwrap_or_else(PoisonError::into_inner);
            guard.collect_all()
        })
        .await;
        self.cycles += 1;

        let result = match outcome {
            Ok(result) => result,
            Err(join_err) => Err(CollectError::Aborted {
                target: self.target.clone(),
                reason: join_err.to_string(),
            }),
        };
        if result.is_err() {
            self.failures += 1;
        }
        result
    }

    /// Polls until one-shot completion or until `cancel` fires, handing every
    /// successful snapshot to `sink`.
    pub async fn run<F>(&mut self, mut sink: F, cancel: CancellationToken) -> LoopState
    where
        F: FnMut(&Snapshot),
    {
        while self.state == LoopState::Running {
            match self.tick().await {
                Ok(snapshot) => sink(&snapshot),
                Err(err) => error!("{}", err),
            }

            if self.is_one_shot() {
                self.state = LoopState::Stopped;
                break;
            }

            let pause = Duration::from_secs(self.interval_secs.unsigned_abs());
            select! {
                _ = cancel.cancelled() => {
                    debug!("polling of {} cancelled after {} cycles", self.target, self.cycles);
                    self.state = LoopState::Stopped;
                }
                _ = sleep(pause) => {}
            }
        }
        self.state
    }
}

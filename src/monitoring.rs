//! # Price Monitoring Engine
//!
//! Coordinates periodic scan passes over the tracked product set: a
//! scheduler drives the passes, a bounded worker pool fans out fetches, and
//! a change detector persists history and emits notifications.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod coordinator;
pub mod detector;
pub mod fetcher;
pub mod notifier;
pub mod scheduler;

// Clean re-exports
pub use coordinator::{PassSummary, ScanCoordinator};
pub use detector::{ChangeDetector, CheckOutcome};
pub use fetcher::{FetchError, ProductFetcher, ProductInfo, RetryPolicy, RetryingFetcher};
pub use notifier::{ChannelNotifier, LogNotifier, Notifier};
pub use scheduler::ScanScheduler;

/// Monitoring engine lifecycle errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitoring engine is already running")]
    AlreadyRunning,

    #[error("monitoring engine is not running")]
    NotRunning,
}

/// Facade owning the background scheduler task.
///
/// The engine is daemon-like: `start` spawns the scheduler, `stop` cancels
/// it, and in-flight fetches are abandoned when the process exits. There is
/// no mid-pass cancellation.
pub struct MonitoringEngine {
    coordinator: Arc<ScanCoordinator>,
    scan_interval: Duration,
    active: RwLock<Option<CancellationToken>>,
}

impl MonitoringEngine {
    pub fn new(coordinator: Arc<ScanCoordinator>, scan_interval: Duration) -> Self {
        Self {
            coordinator,
            scan_interval,
            active: RwLock::new(None),
        }
    }

    /// Starts the background scheduler. The first pass runs immediately.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut active = self.active.write().await;
        if active.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let cancellation_token = CancellationToken::new();
        let scheduler = ScanScheduler::new(
            self.coordinator.clone(),
            self.scan_interval,
            cancellation_token.clone(),
        );
        tokio::spawn(async move { scheduler.run().await });

        *active = Some(cancellation_token);
        info!("monitoring engine started (scan interval {:?})", self.scan_interval);
        Ok(())
    }

    /// Requests shutdown of the scheduler loop.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut active = self.active.write().await;
        let cancellation_token = active.take().ok_or(MonitorError::NotRunning)?;
        cancellation_token.cancel();
        info!("monitoring engine stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Runs a single scan pass outside the schedule (front-end "check now").
    pub async fn run_pass_now(&self) -> anyhow::Result<PassSummary> {
        self.coordinator.run_pass().await
    }
}

//! # Scan Scheduler
//!
//! Drives scan passes at a fixed wall-clock interval for the lifetime of
//! the monitoring process.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::monitoring::coordinator::ScanCoordinator;

/// Periodic driver for scan passes.
///
/// The first pass starts immediately; each pass is awaited to completion
/// before the interval timer restarts, so passes never overlap.
pub struct ScanScheduler {
    coordinator: Arc<ScanCoordinator>,
    scan_interval: Duration,
    cancellation_token: CancellationToken,
}

impl ScanScheduler {
    pub fn new(
        coordinator: Arc<ScanCoordinator>,
        scan_interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            scan_interval,
            cancellation_token,
        }
    }

    /// Loops until cancelled. A failed pass is logged and never terminates
    /// the loop; the next interval proceeds as scheduled.
    pub async fn run(&self) {
        info!("scan scheduler started (interval {:?})", self.scan_interval);

        loop {
            if self.cancellation_token.is_cancelled() {
                break;
            }

            match self.coordinator.run_pass().await {
                Ok(summary) => info!(
                    checked = summary.products_checked,
                    changed = summary.prices_changed,
                    failures = summary.failures,
                    "scan pass finished in {:?}",
                    summary.duration
                ),
                Err(err) => error!("scan pass failed: {err:#}"),
            }

            tokio::select! {
                _ = self.cancellation_token.cancelled() => break,
                _ = sleep(self.scan_interval) => {}
            }
        }

        debug!("scan scheduler shut down");
    }
}

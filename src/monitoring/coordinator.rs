//! # Bounded Fetch Coordinator
//!
//! Executes one scan pass over the tracked product set. A fixed pool of
//! workers pulls product-check tasks from a shared queue, so the worker
//! count bounds simultaneous in-flight fetches; excess work queues until a
//! worker frees up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::domain::TrackedProduct;
use crate::infrastructure::ProductRepository;
use crate::monitoring::detector::{ChangeDetector, CheckOutcome};
use crate::monitoring::fetcher::ProductFetcher;

/// Aggregate result of one scan pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    /// Products taken from the snapshot and checked.
    pub products_checked: usize,
    /// Products whose history grew this pass (including first observations).
    pub prices_changed: usize,
    /// Products skipped on fetch failure or aborted on store errors.
    pub failures: usize,
    pub duration: Duration,
}

/// Runs scan passes with a bounded worker pool.
pub struct ScanCoordinator {
    repository: Arc<ProductRepository>,
    fetcher: Arc<dyn ProductFetcher>,
    detector: Arc<ChangeDetector>,
    max_concurrent_checks: usize,
}

impl ScanCoordinator {
    pub fn new(
        repository: Arc<ProductRepository>,
        fetcher: Arc<dyn ProductFetcher>,
        detector: Arc<ChangeDetector>,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            repository,
            fetcher,
            detector,
            max_concurrent_checks: max_concurrent_checks.max(1),
        }
    }

    /// Checks every tracked product once.
    ///
    /// The product set is a point-in-time snapshot taken at pass start;
    /// products added mid-pass are picked up on the next pass. One product's
    /// failure never aborts the pass or delays others beyond queueing.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let started = Instant::now();
        let products = self.repository.all_products().await?;
        let total = products.len();

        if total == 0 {
            return Ok(PassSummary {
                duration: started.elapsed(),
                ..PassSummary::default()
            });
        }

        debug!("scan pass starting over {total} products");

        let (sender, receiver) = mpsc::channel::<TrackedProduct>(total);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.max_concurrent_checks.min(total) {
            let receiver = receiver.clone();
            let fetcher = self.fetcher.clone();
            let detector = self.detector.clone();

            workers.spawn(async move {
                let mut tally = WorkerTally::default();
                loop {
                    let product = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };
                    let Some(product) = product else { break };

                    debug!(worker_id, "checking {}", product.url);
                    tally.checked += 1;

                    let outcome = fetcher.fetch(&product.url).await;
                    match detector.apply(&product, outcome).await {
                        Ok(CheckOutcome::Changed) | Ok(CheckOutcome::BaselineEstablished) => {
                            tally.changed += 1;
                        }
                        Ok(CheckOutcome::Skipped) => tally.failures += 1,
                        Ok(CheckOutcome::Unchanged) => {}
                        Err(err) => {
                            tally.failures += 1;
                            error!("store error while checking {}: {err:#}", product.url);
                        }
                    }
                }
                tally
            });
        }

        for product in products {
            // Channel capacity equals the snapshot size, so this never blocks.
            let _ = sender.send(product).await;
        }
        drop(sender);

        let mut summary = PassSummary::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => {
                    summary.products_checked += tally.checked;
                    summary.prices_changed += tally.changed;
                    summary.failures += tally.failures;
                }
                Err(err) => error!("scan worker panicked: {err}"),
            }
        }

        summary.duration = started.elapsed();
        Ok(summary)
    }
}

#[derive(Debug, Default)]
struct WorkerTally {
    checked: usize,
    changed: usize,
    failures: usize,
}

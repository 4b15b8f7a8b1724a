//! Per-product change detection: compare, persist, notify.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::product::BASELINE_PRICE;
use crate::domain::{PriceChange, TrackedProduct};
use crate::infrastructure::ProductRepository;
use crate::monitoring::fetcher::{FetchError, ProductInfo};
use crate::monitoring::notifier::Notifier;

/// What one product's check did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Fetch failed; nothing written, the next pass retries.
    Skipped,
    /// Observed price matched the last recorded one.
    Unchanged,
    /// First observation: baseline seeded and the real price recorded, but
    /// no notification emitted.
    BaselineEstablished,
    /// Price changed; history written and a notification emitted.
    Changed,
}

/// Applies one fetch outcome to the store and decides whether to notify.
///
/// Prices are compared as opaque strings: a one-character formatting
/// difference counts as a change, and the unavailable sentinel flows through
/// comparison like any other price.
pub struct ChangeDetector {
    repository: Arc<ProductRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ChangeDetector {
    pub fn new(repository: Arc<ProductRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Processes the outcome of one product's fetch within a scan pass.
    ///
    /// Fetch failures skip the product: no history write, no notification,
    /// nothing surfaced to the user until the page becomes fetchable again.
    /// Store errors propagate to the caller.
    pub async fn apply(
        &self,
        product: &TrackedProduct,
        outcome: Result<ProductInfo, FetchError>,
    ) -> Result<CheckOutcome> {
        let info = match outcome {
            Ok(info) => info,
            Err(err) => {
                warn!("skipping {} this pass: {err}", product.url);
                return Ok(CheckOutcome::Skipped);
            }
        };

        let (last_price, first_observation) = match self.repository.last_price(product.id).await? {
            Some(price) => (price, false),
            None => {
                // Seed the placeholder so there is always a previous price
                // to compare against.
                self.repository
                    .append_history(product.id, BASELINE_PRICE)
                    .await?;
                (BASELINE_PRICE.to_string(), true)
            }
        };

        if info.price == last_price {
            debug!("{}: price unchanged at {}", product.url, info.price);
            return Ok(CheckOutcome::Unchanged);
        }

        self.repository.append_history(product.id, &info.price).await?;
        self.repository
            .set_current_price(product.id, &info.price)
            .await?;

        if first_observation {
            // The only "previous" price is the seeded placeholder; suppress
            // the notification.
            debug!("{}: baseline established at {}", product.url, info.price);
            return Ok(CheckOutcome::BaselineEstablished);
        }

        let change = PriceChange {
            user_id: product.user_id,
            product_id: product.id,
            name: info.name,
            url: product.url.clone(),
            new_price: info.price,
            old_price: last_price,
            observed_at: Utc::now(),
        };
        self.notifier.notify(&change).await;

        Ok(CheckOutcome::Changed)
    }
}

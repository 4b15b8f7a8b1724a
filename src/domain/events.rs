//! Events emitted by the monitoring engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload handed to the notification sink when a tracked price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub user_id: i64,
    pub product_id: i64,
    pub name: String,
    pub url: String,
    pub new_price: String,
    pub old_price: String,
    pub observed_at: DateTime<Utc>,
}

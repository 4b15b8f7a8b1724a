//! Tracked product entities and shared sentinel values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder "previous price" recorded for a product with no history yet,
/// so the first real observation always has something to compare against.
pub const BASELINE_PRICE: &str = "999,99 €";

/// Sentinel name used when the product title markup is absent from the page.
pub const NAME_UNAVAILABLE: &str = "Name unavailable";

/// Sentinel price used when the price markup is absent from the page.
pub const PRICE_UNAVAILABLE: &str = "Price unavailable";

/// A product page tracked on behalf of one user.
///
/// Identity is (user_id, url); the numeric id is assigned by the store on
/// creation. Prices are opaque display strings and are only ever compared
/// for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProduct {
    /// Store-assigned numeric id.
    pub id: i64,
    /// Owning chat user.
    pub user_id: i64,
    /// Canonical product page URL.
    pub url: String,
    /// Display name as last extracted; `None` until the first fetch.
    pub name: Option<String>,
    /// Most recently observed price.
    pub price: Option<String>,
}

/// One append-only price observation for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub product_id: i64,
    /// Assigned by the store at write time; non-decreasing per product in
    /// insertion order.
    pub timestamp: DateTime<Utc>,
    pub price: String,
}

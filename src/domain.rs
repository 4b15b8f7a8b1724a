//! Domain module - Core entities and events
//!
//! Contains the tracked-product entities, the price-change event payload,
//! and the sentinel values shared across the engine.

pub mod events;
pub mod product;

// Clean re-exports
pub use events::PriceChange;
pub use product::{PriceHistoryEntry, TrackedProduct};

//! pricewatch - Multi-user e-commerce price monitoring
//!
//! Tracks product pages on behalf of chat users, re-checks them on a fixed
//! schedule with a bounded number of concurrent fetches, records an
//! append-only price history, and notifies on changes. The chat command
//! surface and any desktop launcher run out of process; they talk to this
//! crate through the `application` use cases and the notification sinks.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod monitoring;

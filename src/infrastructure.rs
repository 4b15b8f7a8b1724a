//! Infrastructure layer: configuration, logging, HTTP, page extraction, and
//! storage access.

pub mod config;
pub mod database_connection;
pub mod extractor;
pub mod http_client;
pub mod logging;
pub mod page_fetcher;
pub mod product_repository;

// Clean re-exports
pub use config::{AppConfig, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use extractor::ProductPageExtractor;
pub use http_client::HttpClient;
pub use page_fetcher::PageFetcher;
pub use product_repository::ProductRepository;

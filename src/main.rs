//! Daemon entry point: run the monitoring engine until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use pricewatch::infrastructure::{
    ConfigManager, DatabaseConnection, HttpClient, PageFetcher, ProductPageExtractor,
    ProductRepository, logging,
};
use pricewatch::monitoring::{
    ChangeDetector, LogNotifier, MonitoringEngine, ProductFetcher, RetryPolicy, RetryingFetcher,
    ScanCoordinator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigManager::new()?.load().await?;
    logging::init_logging(&config.logging)?;
    info!("pricewatch starting");

    let database_url = format!("sqlite:{}", config.database.path.display());
    let db = DatabaseConnection::new(&database_url)
        .await
        .context("failed to open database")?;
    db.migrate().await.context("failed to run migrations")?;

    let repository = Arc::new(ProductRepository::new(db.pool().clone()));

    let http = HttpClient::new(&config.fetch)?;
    let extractor = ProductPageExtractor::new()?;
    let page_fetcher: Arc<dyn ProductFetcher> = Arc::new(PageFetcher::new(http, extractor));
    let fetcher: Arc<dyn ProductFetcher> = Arc::new(RetryingFetcher::new(
        page_fetcher,
        RetryPolicy::new(
            config.retry.max_attempts,
            config.retry.backoff_min(),
            config.retry.backoff_max(),
        ),
    ));

    let notifier = Arc::new(LogNotifier);
    let detector = Arc::new(ChangeDetector::new(repository.clone(), notifier));
    let coordinator = Arc::new(ScanCoordinator::new(
        repository,
        fetcher,
        detector,
        config.monitor.max_concurrent_checks,
    ));

    let engine = MonitoringEngine::new(coordinator, config.monitor.scan_interval());
    engine.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");
    engine.stop().await?;

    Ok(())
}

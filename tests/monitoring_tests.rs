//! End-to-end scan pass behavior against a real SQLite store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use pricewatch::domain::PriceChange;
use pricewatch::domain::product::BASELINE_PRICE;
use pricewatch::infrastructure::{DatabaseConnection, ProductRepository};
use pricewatch::monitoring::{
    ChangeDetector, FetchError, MonitoringEngine, Notifier, ProductFetcher, ProductInfo,
    ScanCoordinator, ScanScheduler,
};

/// Fetcher with canned per-URL responses, tracking call counts and the
/// maximum number of simultaneous in-flight fetches.
struct MockFetcher {
    responses: Mutex<HashMap<String, Result<ProductInfo, String>>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn set_price(&self, url: &str, price: &str) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            Ok(ProductInfo {
                name: "Widget".to_string(),
                price: price.to_string(),
            }),
        );
    }

    fn set_failure(&self, url: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(message.to_string()));
    }
}

#[async_trait]
impl ProductFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let responses = self.responses.lock().unwrap();
        match responses.get(url) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(message)) => Err(FetchError::Network {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Notifier that records every change it is handed.
#[derive(Default)]
struct RecordingNotifier {
    changes: Mutex<Vec<PriceChange>>,
}

impl RecordingNotifier {
    fn changes(&self) -> Vec<PriceChange> {
        self.changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, change: &PriceChange) {
        self.changes.lock().unwrap().push(change.clone());
    }
}

struct Harness {
    _temp: TempDir,
    repository: Arc<ProductRepository>,
    fetcher: Arc<MockFetcher>,
    notifier: Arc<RecordingNotifier>,
    coordinator: Arc<ScanCoordinator>,
}

async fn harness(max_concurrent_checks: usize, fetch_delay: Duration) -> Harness {
    let temp = tempfile::tempdir().unwrap();
    let database_url = format!("sqlite:{}", temp.path().join("test.db").display());
    let db = DatabaseConnection::new(&database_url).await.unwrap();
    db.migrate().await.unwrap();

    let repository = Arc::new(ProductRepository::new(db.pool().clone()));
    let fetcher = Arc::new(MockFetcher::new(fetch_delay));
    let notifier = Arc::new(RecordingNotifier::default());
    let detector = Arc::new(ChangeDetector::new(repository.clone(), notifier.clone()));
    let coordinator = Arc::new(ScanCoordinator::new(
        repository.clone(),
        fetcher.clone(),
        detector,
        max_concurrent_checks,
    ));

    Harness {
        _temp: temp,
        repository,
        fetcher,
        notifier,
        coordinator,
    }
}

async fn track(harness: &Harness, user_id: i64, url: &str) -> i64 {
    harness.repository.ensure_user(user_id).await.unwrap();
    harness
        .repository
        .insert_product(user_id, url, None, None)
        .await
        .unwrap()
}

async fn history_prices(harness: &Harness, user_id: i64, url: &str) -> Vec<String> {
    harness
        .repository
        .price_history(user_id, url)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.price)
        .collect()
}

#[tokio::test]
async fn empty_product_set_is_a_quiet_pass() {
    let harness = harness(5, Duration::ZERO).await;

    let summary = harness.coordinator.run_pass().await.unwrap();

    assert_eq!(summary.products_checked, 0);
    assert_eq!(summary.prices_changed, 0);
    assert_eq!(summary.failures, 0);
}

#[tokio::test]
async fn first_observation_seeds_baseline_and_suppresses_notification() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    let id = track(&harness, 7, url).await;

    harness.fetcher.set_price(url, "19,99 €");
    let summary = harness.coordinator.run_pass().await.unwrap();

    assert_eq!(summary.products_checked, 1);
    assert_eq!(summary.prices_changed, 1);

    // Baseline sentinel first, then the real price.
    let prices = history_prices(&harness, 7, url).await;
    assert_eq!(prices, vec![BASELINE_PRICE.to_string(), "19,99 €".to_string()]);

    let product = harness.repository.find_product(7, url).await.unwrap().unwrap();
    assert_eq!(product.price.as_deref(), Some("19,99 €"));
    assert_eq!(harness.repository.last_price(id).await.unwrap().as_deref(), Some("19,99 €"));

    // The only "previous" price was the placeholder; the user hears nothing.
    assert!(harness.notifier.changes().is_empty());
}

#[tokio::test]
async fn unchanged_price_passes_are_idempotent() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    track(&harness, 7, url).await;

    harness.fetcher.set_price(url, "19,99 €");
    harness.coordinator.run_pass().await.unwrap();

    let before = history_prices(&harness, 7, url).await;

    // Two more passes with identical fetch results.
    let second = harness.coordinator.run_pass().await.unwrap();
    let third = harness.coordinator.run_pass().await.unwrap();

    assert_eq!(second.prices_changed, 0);
    assert_eq!(third.prices_changed, 0);
    assert_eq!(history_prices(&harness, 7, url).await, before);
    assert!(harness.notifier.changes().is_empty());
}

#[tokio::test]
async fn price_change_appends_one_row_and_notifies_once() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    let id = track(&harness, 7, url).await;

    harness.fetcher.set_price(url, "19,99 €");
    harness.coordinator.run_pass().await.unwrap();

    harness.fetcher.set_price(url, "24,99 €");
    let summary = harness.coordinator.run_pass().await.unwrap();

    assert_eq!(summary.prices_changed, 1);
    assert_eq!(
        history_prices(&harness, 7, url).await,
        vec![
            BASELINE_PRICE.to_string(),
            "19,99 €".to_string(),
            "24,99 €".to_string()
        ]
    );
    assert_eq!(harness.repository.last_price(id).await.unwrap().as_deref(), Some("24,99 €"));

    let changes = harness.notifier.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].user_id, 7);
    assert_eq!(changes[0].url, url);
    assert_eq!(changes[0].old_price, "19,99 €");
    assert_eq!(changes[0].new_price, "24,99 €");
}

#[tokio::test]
async fn a_formatting_difference_counts_as_a_change() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    track(&harness, 7, url).await;

    harness.fetcher.set_price(url, "19,99 €");
    harness.coordinator.run_pass().await.unwrap();

    // Same amount, different rendering: still a change.
    harness.fetcher.set_price(url, "19.99 €");
    harness.coordinator.run_pass().await.unwrap();

    let changes = harness.notifier.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].new_price, "19.99 €");
}

#[tokio::test]
async fn concurrency_never_exceeds_the_ceiling() {
    let harness = harness(5, Duration::from_millis(25)).await;

    for index in 0..50 {
        let url = format!("https://www.amazon.de/dp/B{index:03}");
        track(&harness, 7, &url).await;
        harness.fetcher.set_price(&url, "10,00 €");
    }

    let summary = harness.coordinator.run_pass().await.unwrap();

    assert_eq!(summary.products_checked, 50);
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 50);
    assert!(
        harness.fetcher.max_in_flight.load(Ordering::SeqCst) <= 5,
        "max in-flight fetches was {}",
        harness.fetcher.max_in_flight.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn one_failing_product_does_not_block_the_rest() {
    let harness = harness(2, Duration::ZERO).await;
    let good_a = "https://www.amazon.de/dp/A";
    let bad = "https://www.amazon.de/dp/B";
    let good_c = "https://www.amazon.de/dp/C";

    track(&harness, 7, good_a).await;
    let bad_id = track(&harness, 7, bad).await;
    track(&harness, 7, good_c).await;

    harness.fetcher.set_price(good_a, "10,00 €");
    harness.fetcher.set_failure(bad, "connection timed out");
    harness.fetcher.set_price(good_c, "30,00 €");

    let summary = harness.coordinator.run_pass().await.unwrap();

    assert_eq!(summary.products_checked, 3);
    assert_eq!(summary.prices_changed, 2);
    assert_eq!(summary.failures, 1);

    assert_eq!(
        history_prices(&harness, 7, good_a).await,
        vec![BASELINE_PRICE.to_string(), "10,00 €".to_string()]
    );
    assert_eq!(
        history_prices(&harness, 7, good_c).await,
        vec![BASELINE_PRICE.to_string(), "30,00 €".to_string()]
    );

    // The failing product is untouched until a later pass succeeds.
    assert_eq!(harness.repository.last_price(bad_id).await.unwrap(), None);

    harness.fetcher.set_price(bad, "20,00 €");
    harness.coordinator.run_pass().await.unwrap();
    assert_eq!(
        harness.repository.last_price(bad_id).await.unwrap().as_deref(),
        Some("20,00 €")
    );
}

#[tokio::test]
async fn unavailable_price_flows_through_as_a_change() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    track(&harness, 7, url).await;

    harness.fetcher.set_price(url, "19,99 €");
    harness.coordinator.run_pass().await.unwrap();

    // Parse miss: successful fetch carrying the sentinel price.
    harness.fetcher.set_price(url, "Price unavailable");
    harness.coordinator.run_pass().await.unwrap();

    let changes = harness.notifier.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].new_price, "Price unavailable");
    assert_eq!(changes[0].old_price, "19,99 €");
}

#[tokio::test]
async fn scheduler_runs_the_first_pass_immediately_and_stops_on_cancel() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    track(&harness, 7, url).await;
    harness.fetcher.set_price(url, "19,99 €");

    let cancellation_token = CancellationToken::new();
    let scheduler = ScanScheduler::new(
        harness.coordinator.clone(),
        Duration::from_secs(3600),
        cancellation_token.clone(),
    );
    let handle = tokio::spawn(async move { scheduler.run().await });

    // The first pass needs no interval to elapse.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);

    // No second pass before the interval.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);

    cancellation_token.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop after cancellation")
        .unwrap();
}

#[tokio::test]
async fn engine_lifecycle_and_on_demand_pass() {
    let harness = harness(5, Duration::ZERO).await;
    let url = "https://www.amazon.de/dp/B01";
    track(&harness, 7, url).await;
    harness.fetcher.set_price(url, "19,99 €");

    let engine = MonitoringEngine::new(harness.coordinator.clone(), Duration::from_secs(3600));
    assert!(!engine.is_running().await);

    engine.start().await.unwrap();
    assert!(engine.is_running().await);
    assert!(engine.start().await.is_err());

    // Wait out the immediate scheduled pass, then run one on demand.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let summary = engine.run_pass_now().await.unwrap();
    assert_eq!(summary.products_checked, 1);

    engine.stop().await.unwrap();
    assert!(!engine.is_running().await);
    assert!(engine.stop().await.is_err());
}

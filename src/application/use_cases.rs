//! Use cases backing the external chat front-end
//!
//! The bot command surface itself runs out of process; these are the
//! operations it calls: add/list/remove tracked products, one-off price
//! checks, and price history queries.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::domain::{PriceHistoryEntry, TrackedProduct};
use crate::infrastructure::ProductRepository;
use crate::monitoring::fetcher::{FetchError, ProductFetcher, ProductInfo};

static AMAZON_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?amazon\.\w{2,3}/").expect("hard-coded pattern")
});

/// Why a front-end request was rejected.
#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("not a valid Amazon product URL: {0}")]
    InvalidUrl(String),

    #[error("product is already tracked: {0}")]
    AlreadyTracked(String),

    #[error("product is not tracked: {0}")]
    NotTracked(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Front-end facing operations over tracked products.
pub struct ProductTrackingUseCases {
    repository: Arc<ProductRepository>,
    fetcher: Arc<dyn ProductFetcher>,
}

impl ProductTrackingUseCases {
    pub fn new(repository: Arc<ProductRepository>, fetcher: Arc<dyn ProductFetcher>) -> Self {
        Self {
            repository,
            fetcher,
        }
    }

    /// Validates the URL, fetches the current name and price once, and
    /// stores the product for the user.
    pub async fn add_product(
        &self,
        user_id: i64,
        url: &str,
    ) -> Result<TrackedProduct, UseCaseError> {
        if !AMAZON_URL.is_match(url) {
            return Err(UseCaseError::InvalidUrl(url.to_string()));
        }
        if self.repository.find_product(user_id, url).await?.is_some() {
            return Err(UseCaseError::AlreadyTracked(url.to_string()));
        }

        let fetched = self.fetcher.fetch(url).await?;

        self.repository.ensure_user(user_id).await?;
        let id = self
            .repository
            .insert_product(user_id, url, Some(&fetched.name), Some(&fetched.price))
            .await?;

        info!(user_id, url, "now tracking {}", fetched.name);

        Ok(TrackedProduct {
            id,
            user_id,
            url: url.to_string(),
            name: Some(fetched.name),
            price: Some(fetched.price),
        })
    }

    pub async fn list_products(&self, user_id: i64) -> Result<Vec<TrackedProduct>, UseCaseError> {
        Ok(self.repository.products_for_user(user_id).await?)
    }

    pub async fn remove_product(&self, user_id: i64, url: &str) -> Result<(), UseCaseError> {
        if self.repository.remove_product(user_id, url).await? {
            info!(user_id, url, "stopped tracking product");
            Ok(())
        } else {
            Err(UseCaseError::NotTracked(url.to_string()))
        }
    }

    /// One-off price lookup without persisting anything.
    pub async fn check_price(&self, url: &str) -> Result<ProductInfo, UseCaseError> {
        if !AMAZON_URL.is_match(url) {
            return Err(UseCaseError::InvalidUrl(url.to_string()));
        }
        Ok(self.fetcher.fetch(url).await?)
    }

    pub async fn price_history(
        &self,
        user_id: i64,
        url: &str,
    ) -> Result<Vec<PriceHistoryEntry>, UseCaseError> {
        if self.repository.find_product(user_id, url).await?.is_none() {
            return Err(UseCaseError::NotTracked(url.to_string()));
        }
        Ok(self.repository.price_history(user_id, url).await?)
    }
}

//! `ProductFetcher` implementation backed by the HTTP client and extractor.

use async_trait::async_trait;
use url::Url;

use crate::infrastructure::extractor::ProductPageExtractor;
use crate::infrastructure::http_client::HttpClient;
use crate::monitoring::fetcher::{FetchError, ProductFetcher, ProductInfo};

/// Live extraction collaborator: fetch the page, parse out name and price.
pub struct PageFetcher {
    http: HttpClient,
    extractor: ProductPageExtractor,
}

impl PageFetcher {
    pub fn new(http: HttpClient, extractor: ProductPageExtractor) -> Self {
        Self { http, extractor }
    }
}

#[async_trait]
impl ProductFetcher for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let html = self.http.get_text(parsed.as_str()).await?;
        Ok(self.extractor.extract(&html))
    }
}

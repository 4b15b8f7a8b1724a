//! Product page extraction
//!
//! Pulls the display name and price out of an Amazon-style product detail
//! page. Missing markup yields the unavailable sentinels instead of an
//! error: a changed page layout will not heal on retry, so the result is a
//! successful fetch carrying sentinel data.

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};

use crate::domain::product::{NAME_UNAVAILABLE, PRICE_UNAVAILABLE};
use crate::monitoring::fetcher::ProductInfo;

/// CSS selectors for the product page fields.
#[derive(Debug, Clone)]
pub struct ExtractorSelectors {
    pub title: String,
    pub price_whole: String,
    pub price_fraction: String,
}

impl Default for ExtractorSelectors {
    fn default() -> Self {
        Self {
            title: "span#productTitle".to_string(),
            price_whole: "span.a-price-whole".to_string(),
            price_fraction: "span.a-price-fraction".to_string(),
        }
    }
}

/// Extracts name and price strings from product detail HTML.
pub struct ProductPageExtractor {
    title: Selector,
    price_whole: Selector,
    price_fraction: Selector,
}

impl ProductPageExtractor {
    /// Extractor with the default selectors.
    pub fn new() -> Result<Self> {
        Self::with_selectors(&ExtractorSelectors::default())
    }

    pub fn with_selectors(selectors: &ExtractorSelectors) -> Result<Self> {
        Ok(Self {
            title: Selector::parse(&selectors.title)
                .map_err(|e| anyhow!("invalid title selector: {e}"))?,
            price_whole: Selector::parse(&selectors.price_whole)
                .map_err(|e| anyhow!("invalid price-whole selector: {e}"))?,
            price_fraction: Selector::parse(&selectors.price_fraction)
                .map_err(|e| anyhow!("invalid price-fraction selector: {e}"))?,
        })
    }

    /// Extracts the product name and price, substituting the sentinel for
    /// any field whose markup is absent.
    pub fn extract(&self, html: &str) -> ProductInfo {
        let document = Html::parse_document(html);

        let name = document
            .select(&self.title)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| NAME_UNAVAILABLE.to_string());

        let whole = document
            .select(&self.price_whole)
            .next()
            .map(|element| element.text().collect::<String>());
        let fraction = document
            .select(&self.price_fraction)
            .next()
            .map(|element| element.text().collect::<String>());

        let price = match (whole, fraction) {
            (Some(whole), Some(fraction)) => {
                // Strip thousands separators from the whole part, then join
                // with a decimal comma: "1,234" + "56" -> "1234,56 €".
                format!("{},{} €", whole.trim().replace(',', ""), fraction.trim())
            }
            _ => PRICE_UNAVAILABLE.to_string(),
        };

        ProductInfo { name, price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
            <span id="productTitle">  Widget Deluxe 3000  </span>
            <span class="a-price">
                <span class="a-price-whole">19</span>
                <span class="a-price-fraction">99</span>
            </span>
        </body></html>
    "#;

    fn extractor() -> ProductPageExtractor {
        ProductPageExtractor::new().unwrap()
    }

    #[test]
    fn extracts_name_and_price() {
        let info = extractor().extract(PRODUCT_PAGE);
        assert_eq!(info.name, "Widget Deluxe 3000");
        assert_eq!(info.price, "19,99 €");
    }

    #[test]
    fn strips_thousands_separators() {
        let html = r#"
            <span id="productTitle">TV</span>
            <span class="a-price-whole">1,299</span>
            <span class="a-price-fraction">00</span>
        "#;
        let info = extractor().extract(html);
        assert_eq!(info.price, "1299,00 €");
    }

    #[test]
    fn missing_price_markup_yields_sentinel() {
        let html = r#"<span id="productTitle">Widget</span>"#;
        let info = extractor().extract(html);
        assert_eq!(info.name, "Widget");
        assert_eq!(info.price, PRICE_UNAVAILABLE);
    }

    #[test]
    fn missing_title_yields_sentinel() {
        let html = r#"
            <span class="a-price-whole">5</span>
            <span class="a-price-fraction">49</span>
        "#;
        let info = extractor().extract(html);
        assert_eq!(info.name, NAME_UNAVAILABLE);
        assert_eq!(info.price, "5,49 €");
    }

    #[test]
    fn whole_part_without_fraction_yields_sentinel() {
        let html = r#"
            <span id="productTitle">Widget</span>
            <span class="a-price-whole">19</span>
        "#;
        let info = extractor().extract(html);
        assert_eq!(info.price, PRICE_UNAVAILABLE);
    }
}

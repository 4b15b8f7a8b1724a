//! Data access for tracked products and their price history
//!
//! Every operation is a single SQL statement, so each is individually
//! atomic; the monitoring engine and the command front-end rely on that
//! instead of any shared in-process lock.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::{Row, SqlitePool};

use crate::domain::{PriceHistoryEntry, TrackedProduct};

/// Repository over the users / products / price_history tables.
#[derive(Clone)]
pub struct ProductRepository {
    pool: Arc<SqlitePool>,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    // ===============================
    // USER / PRODUCT OPERATIONS
    // ===============================

    /// Creates the user row if it does not exist yet.
    pub async fn ensure_user(&self, user_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a product and returns its store-assigned id.
    pub async fn insert_product(
        &self,
        user_id: i64,
        url: &str,
        name: Option<&str>,
        price: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (user_id, url, name, price)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(url)
        .bind(name)
        .bind(price)
        .execute(&*self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Deletes a user's product. History rows are left orphaned and are
    /// never read again.
    pub async fn remove_product(&self, user_id: i64, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE user_id = ? AND url = ?")
            .bind(user_id)
            .bind(url)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_product(&self, user_id: i64, url: &str) -> Result<Option<TrackedProduct>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, url, name, price
            FROM products WHERE user_id = ? AND url = ?
            "#,
        )
        .bind(user_id)
        .bind(url)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| product_from_row(&row)))
    }

    pub async fn products_for_user(&self, user_id: i64) -> Result<Vec<TrackedProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, url, name, price
            FROM products WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.iter().map(product_from_row).collect())
    }

    /// Snapshot of every tracked product across all users.
    pub async fn all_products(&self) -> Result<Vec<TrackedProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, url, name, price
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.iter().map(product_from_row).collect())
    }

    /// Updates the product's current price column.
    pub async fn set_current_price(&self, product_id: i64, price: &str) -> Result<()> {
        sqlx::query("UPDATE products SET price = ? WHERE id = ?")
            .bind(price)
            .bind(product_id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    // ===============================
    // PRICE HISTORY OPERATIONS
    // ===============================

    /// Most recently recorded price for a product, if any history exists.
    pub async fn last_price(&self, product_id: i64) -> Result<Option<String>> {
        // `id` breaks ties between entries written within the same second
        let row = sqlx::query(
            r#"
            SELECT price
            FROM price_history
            WHERE product_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| row.get("price")))
    }

    /// Appends one history entry; the store assigns the timestamp.
    pub async fn append_history(&self, product_id: i64, price: &str) -> Result<()> {
        sqlx::query("INSERT INTO price_history (product_id, price) VALUES (?, ?)")
            .bind(product_id)
            .bind(price)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Chronological price history for one user's product.
    pub async fn price_history(&self, user_id: i64, url: &str) -> Result<Vec<PriceHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT ph.product_id, ph.timestamp, ph.price
            FROM price_history ph
            JOIN products p ON ph.product_id = p.id
            WHERE p.user_id = ? AND p.url = ?
            ORDER BY ph.timestamp ASC, ph.id ASC
            "#,
        )
        .bind(user_id)
        .bind(url)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PriceHistoryEntry {
                product_id: row.get("product_id"),
                timestamp: row.get::<NaiveDateTime, _>("timestamp").and_utc(),
                price: row.get("price"),
            })
            .collect())
    }
}

fn product_from_row(row: &sqlx::sqlite::SqliteRow) -> TrackedProduct {
    TrackedProduct {
        id: row.get("id"),
        user_id: row.get("user_id"),
        url: row.get("url"),
        name: row.get("name"),
        price: row.get("price"),
    }
}

use crate::models::price::PriceTable;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Base trait for daily price scrapers
#[async_trait]
pub trait PriceScraper {
    /// Get the name of the data source
    fn source_name(&self) -> &'static str;

    /// Fetch daily bars for every ticker over `[start, end)`.
    /// A window with no sessions yields an empty table, not an error.
    async fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceTable>;
}

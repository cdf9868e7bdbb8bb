use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::{PortfolioError, PriceSeries, PriceSeriesProvider};

/// Shared price-series cache keyed by symbol + date range.
///
/// Read-mostly: each distinct key is written once on first fetch and only
/// read afterwards. Explicitly injected into the orchestrator so lifetime
/// and concurrency discipline stay visible to callers; unbounded, since a
/// validation run touches a small, fixed set of (symbol, range) keys.
#[derive(Default)]
pub struct PriceCache {
    entries: RwLock<HashMap<(String, NaiveDate, NaiveDate), PriceSeries>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached series for this key, fetching through `provider`
    /// on first use.
    pub async fn get_or_fetch(
        &self,
        provider: &dyn PriceSeriesProvider,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PortfolioError> {
        let key = (symbol.to_string(), start, end);
        if let Some(series) = self.entries.read().await.get(&key) {
            tracing::debug!("Price cache hit for {} {} to {}", symbol, start, end);
            return Ok(series.clone());
        }

        let fetched = provider.fetch(symbol, start, end).await?;
        let mut entries = self.entries.write().await;
        // A concurrent fetch for the same key may have landed first; the
        // first write wins and later fetches are discarded.
        let series = entries.entry(key).or_insert(fetched);
        Ok(series.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

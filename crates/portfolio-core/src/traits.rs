use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{PortfolioError, PriceSeries};

/// Source of historical closing prices.
///
/// `fetch` returns an ordered, date-unique series covering `[start, end]`.
/// A symbol that exists but simply did not trade on some dates returns a
/// series without those dates; a symbol with no data at all is a
/// `DataUnavailable` error.
#[async_trait]
pub trait PriceSeriesProvider: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PortfolioError>;
}

/// In-memory provider over preloaded series, for tests and callers that
/// already hold their data.
#[derive(Default)]
pub struct StaticPriceProvider {
    series: HashMap<String, PriceSeries>,
}

impl StaticPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    pub fn with_series(series: impl IntoIterator<Item = PriceSeries>) -> Self {
        let mut provider = Self::new();
        for s in series {
            provider.insert(s);
        }
        provider
    }
}

#[async_trait]
impl PriceSeriesProvider for StaticPriceProvider {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PortfolioError> {
        match self.series.get(symbol) {
            Some(series) => Ok(series.slice(start, end)),
            None => Err(PortfolioError::DataUnavailable(format!(
                "no price data for {symbol}"
            ))),
        }
    }
}

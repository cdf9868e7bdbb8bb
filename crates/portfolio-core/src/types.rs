use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::PortfolioError;

/// A single closing-price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Historical closing prices for one symbol.
///
/// Dates are unique and strictly ascending; the series is immutable once
/// constructed. A date absent from the series means "no trade / no data",
/// never a zero price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    prices: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, prices: Vec<PricePoint>) -> Result<Self, PortfolioError> {
        let symbol = symbol.into();
        for w in prices.windows(2) {
            if w[1].date <= w[0].date {
                return Err(PortfolioError::InvalidData(format!(
                    "{}: price dates must be unique and strictly ascending ({} then {})",
                    symbol, w[0].date, w[1].date
                )));
            }
        }
        Ok(Self { symbol, prices })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn prices(&self) -> &[PricePoint] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Close price on an exact date, if one was observed.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.prices
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.prices[i].close)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.prices.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.prices.last().map(|p| p.date)
    }

    /// Sub-series restricted to `[start, end]` inclusive. Ordering is
    /// preserved, so no revalidation is needed.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        PriceSeries {
            symbol: self.symbol.clone(),
            prices: self
                .prices
                .iter()
                .copied()
                .filter(|p| p.date >= start && p.date <= end)
                .collect(),
        }
    }
}

/// A single position: symbol plus a whole number of shares. No shorting,
/// so share counts are non-negative by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: u64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, shares: u64) -> Self {
        Self {
            symbol: symbol.into(),
            shares,
        }
    }
}

/// A portfolio: holdings plus uninvested cash. Owned by the caller and
/// read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingsSet {
    holdings: Vec<Holding>,
    cash: f64,
    currency: String,
}

impl HoldingsSet {
    pub fn new(
        holdings: Vec<Holding>,
        cash: f64,
        currency: impl Into<String>,
    ) -> Result<Self, PortfolioError> {
        if !cash.is_finite() || cash < 0.0 {
            return Err(PortfolioError::InvalidHoldings(format!(
                "cash must be a non-negative finite amount, got {cash}"
            )));
        }
        Ok(Self {
            holdings,
            cash,
            currency: currency.into(),
        })
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Distinct symbols in holdings order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for h in &self.holdings {
            if !seen.contains(&h.symbol.as_str()) {
                seen.push(h.symbol.as_str());
            }
        }
        seen
    }
}

/// A named backtesting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
}

impl BacktestPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            start_date,
            end_date,
            description: description.into(),
        }
    }

    /// Calendar length in years (365.25-day convention).
    pub fn years(&self) -> f64 {
        (self.end_date - self.start_date).num_days() as f64 / 365.25
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(y: i32, m: u32, d: u32, close: f64) -> PricePoint {
        PricePoint {
            date: date(y, m, d),
            close,
        }
    }

    #[test]
    fn series_rejects_unsorted_dates() {
        let err = PriceSeries::new(
            "AAA",
            vec![point(2024, 1, 3, 10.0), point(2024, 1, 1, 11.0)],
        )
        .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidData(_)));
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let err = PriceSeries::new(
            "AAA",
            vec![point(2024, 1, 1, 10.0), point(2024, 1, 1, 10.5)],
        )
        .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidData(_)));
    }

    #[test]
    fn series_lookup_and_slice() {
        let series = PriceSeries::new(
            "AAA",
            vec![
                point(2024, 1, 1, 10.0),
                point(2024, 1, 2, 11.0),
                point(2024, 1, 5, 12.0),
            ],
        )
        .unwrap();

        assert_eq!(series.close_on(date(2024, 1, 2)), Some(11.0));
        // An absent date means no trade, never a zero price.
        assert_eq!(series.close_on(date(2024, 1, 3)), None);
        assert_eq!(series.first_date(), Some(date(2024, 1, 1)));
        assert_eq!(series.last_date(), Some(date(2024, 1, 5)));

        let sliced = series.slice(date(2024, 1, 2), date(2024, 1, 5));
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.symbol(), "AAA");
        assert_eq!(sliced.first_date(), Some(date(2024, 1, 2)));
    }

    #[test]
    fn holdings_reject_invalid_cash() {
        let holding = vec![Holding::new("AAA", 10)];
        assert!(matches!(
            HoldingsSet::new(holding.clone(), -1.0, "USD"),
            Err(PortfolioError::InvalidHoldings(_))
        ));
        assert!(matches!(
            HoldingsSet::new(holding.clone(), f64::NAN, "USD"),
            Err(PortfolioError::InvalidHoldings(_))
        ));
        assert!(matches!(
            HoldingsSet::new(holding, f64::INFINITY, "USD"),
            Err(PortfolioError::InvalidHoldings(_))
        ));
    }

    #[test]
    fn holdings_symbols_deduplicate_in_order() {
        let set = HoldingsSet::new(
            vec![
                Holding::new("BBB", 5),
                Holding::new("AAA", 10),
                Holding::new("BBB", 3),
            ],
            100.0,
            "USD",
        )
        .unwrap();
        assert_eq!(set.symbols(), vec!["BBB", "AAA"]);
        assert_eq!(set.cash(), 100.0);
    }
}

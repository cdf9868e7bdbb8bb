//! Portfolio valuation over historical prices.
//!
//! Valuation is all-or-nothing per date: a trading date enters the output
//! only when every holding has an observed close on it. Missing prices are
//! never estimated.

use std::collections::HashMap;

use chrono::NaiveDate;

use portfolio_core::{DailyValuation, HoldingsSet, PriceSeries};

/// Dates within `[start, end]` on which every holding's symbol has a price.
/// Ascending; empty when any required series has no overlap.
pub fn coverage_dates(
    holdings: &HoldingsSet,
    prices: &HashMap<String, PriceSeries>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let symbols = holdings.symbols();
    let Some((first, rest)) = symbols.split_first() else {
        return Vec::new();
    };
    let Some(first_series) = prices.get(*first) else {
        return Vec::new();
    };

    first_series
        .prices()
        .iter()
        .map(|p| p.date)
        .filter(|d| *d >= start && *d <= end)
        .filter(|d| {
            rest.iter().all(|sym| {
                prices
                    .get(*sym)
                    .is_some_and(|series| series.close_on(*d).is_some())
            })
        })
        .collect()
}

/// Coverage dates over whatever span the fetched series carry.
pub fn full_coverage_dates(
    holdings: &HoldingsSet,
    prices: &HashMap<String, PriceSeries>,
) -> Vec<NaiveDate> {
    coverage_dates(holdings, prices, NaiveDate::MIN, NaiveDate::MAX)
}

/// Value the portfolio on each given date: sum(shares * close) + cash.
/// Dates lacking full coverage are skipped entirely.
pub fn value_on_dates(
    holdings: &HoldingsSet,
    prices: &HashMap<String, PriceSeries>,
    dates: &[NaiveDate],
) -> Vec<DailyValuation> {
    let mut valuations = Vec::with_capacity(dates.len());

    'dates: for &date in dates {
        let mut total_value = 0.0;
        for holding in holdings.holdings() {
            match prices.get(&holding.symbol).and_then(|s| s.close_on(date)) {
                Some(close) => total_value += holding.shares as f64 * close,
                None => continue 'dates,
            }
        }
        valuations.push(DailyValuation {
            date,
            total_value: total_value + holdings.cash(),
        });
    }

    valuations
}

/// Chronological portfolio values over `[start, end]`.
///
/// Empty output (not an error) when no date has full price coverage; the
/// caller decides whether that means insufficient data.
pub fn daily_valuations(
    holdings: &HoldingsSet,
    prices: &HashMap<String, PriceSeries>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyValuation> {
    let dates = coverage_dates(holdings, prices, start, end);
    if dates.is_empty() {
        tracing::warn!(
            "No overlapping price dates for {} holdings between {} and {}",
            holdings.holdings().len(),
            start,
            end
        );
        return Vec::new();
    }
    tracing::debug!("Valuing portfolio across {} trading days", dates.len());
    value_on_dates(holdings, prices, &dates)
}

/// Convenience: the value column of a valuation sequence.
pub fn values_of(valuations: &[DailyValuation]) -> Vec<f64> {
    valuations.iter().map(|v| v.total_value).collect()
}

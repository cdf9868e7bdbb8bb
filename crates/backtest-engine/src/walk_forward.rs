//! Walk-forward analysis: rolling in-sample/out-of-sample windows used to
//! detect strategy overfitting. High Sharpe degradation out-of-sample means
//! the in-sample performance was fit to noise.

use std::collections::HashMap;

use portfolio_core::{BacktestPeriod, HoldingsSet, PriceSeries, WalkForwardResult};

use crate::metrics::{self, DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use crate::valuation;

/// Window sizes are in trading-day counts over the covered date list.
#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    pub in_sample_window: usize,
    pub out_sample_window: usize,
    pub step_size: usize,
    pub risk_free_rate: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        // 1 year in-sample, 3 months out-of-sample, 1 month step.
        Self {
            in_sample_window: 252,
            out_sample_window: 63,
            step_size: 21,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

/// Slide the window pair across all fully-covered dates.
///
/// Returns an empty list (not an error) when fewer dates are available than
/// one in-sample + out-of-sample pair needs. Iterations where either
/// sub-period yields fewer than 2 return observations are skipped without
/// aborting the run. Results carry their iteration number so consumers can
/// report them in protocol order.
pub fn analyze(
    holdings: &HoldingsSet,
    prices: &HashMap<String, PriceSeries>,
    config: &WalkForwardConfig,
) -> Vec<WalkForwardResult> {
    let dates = valuation::full_coverage_dates(holdings, prices);
    let in_window = config.in_sample_window;
    let out_window = config.out_sample_window;
    let step = config.step_size.max(1);

    if dates.len() < in_window + out_window {
        tracing::warn!(
            "Not enough data for walk-forward analysis: {} covered dates, need {}",
            dates.len(),
            in_window + out_window
        );
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut idx = 0;
    let mut iteration = 0;

    while idx + in_window + out_window <= dates.len() {
        iteration += 1;

        let in_dates = &dates[idx..idx + in_window];
        let out_dates = &dates[idx + in_window..idx + in_window + out_window];

        let in_values = valuation::values_of(&valuation::value_on_dates(holdings, prices, in_dates));
        let out_values =
            valuation::values_of(&valuation::value_on_dates(holdings, prices, out_dates));

        let in_returns = metrics::returns(&in_values);
        let out_returns = metrics::returns(&out_values);

        if in_returns.len() < 2 || out_returns.len() < 2 {
            tracing::debug!("Skipping walk-forward iteration {iteration}: insufficient returns");
            idx += step;
            continue;
        }

        let in_sharpe =
            metrics::sharpe_ratio(&in_returns, config.risk_free_rate, TRADING_DAYS_PER_YEAR);
        let out_sharpe =
            metrics::sharpe_ratio(&out_returns, config.risk_free_rate, TRADING_DAYS_PER_YEAR);

        let degradation = if in_sharpe != 0.0 {
            (in_sharpe - out_sharpe) / in_sharpe.abs() * 100.0
        } else {
            0.0
        };
        let overfitting_score = degradation.clamp(0.0, 100.0);

        tracing::debug!(
            "Walk-forward iteration {}: in-sample Sharpe {:.3}, out-sample Sharpe {:.3}, degradation {:.1}%",
            iteration,
            in_sharpe,
            out_sharpe,
            degradation
        );

        results.push(WalkForwardResult {
            iteration,
            period: BacktestPeriod::new(
                in_dates[0],
                out_dates[out_dates.len() - 1],
                format!("Walk-Forward Iteration {iteration}"),
            ),
            in_sample_sharpe: in_sharpe,
            out_sample_sharpe: out_sharpe,
            degradation,
            overfitting_score,
        });

        idx += step;
    }

    if !results.is_empty() {
        let avg = average_overfitting_score(&results);
        tracing::info!(
            "Walk-forward complete: {} iterations, average overfitting score {:.1}/100 ({})",
            results.len(),
            avg,
            generalization_band(avg)
        );
    }

    results
}

pub fn average_overfitting_score(results: &[WalkForwardResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.overfitting_score).sum::<f64>() / results.len() as f64
}

/// Informational interpretation of an average overfitting score.
pub fn generalization_band(avg_overfitting_score: f64) -> &'static str {
    if avg_overfitting_score < 20.0 {
        "excellent generalization"
    } else if avg_overfitting_score < 40.0 {
        "good generalization"
    } else if avg_overfitting_score < 60.0 {
        "moderate overfitting"
    } else {
        "high overfitting - predictions may be unreliable"
    }
}

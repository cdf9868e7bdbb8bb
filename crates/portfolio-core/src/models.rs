use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::BacktestPeriod;

/// Total portfolio value on one trading date. Ephemeral: produced per call
/// as the intermediate between prices and return series, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyValuation {
    pub date: NaiveDate,
    pub total_value: f64,
}

/// Results from one backtest run over a period.
///
/// Percentages are expressed as percentages (e.g. 12.5 for 12.5%);
/// `volatility` is an annualized fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub period: BacktestPeriod,
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub volatility: f64,
    pub win_rate: f64,
    /// Auxiliary counts: num_days, num_returns, positive_days, negative_days.
    pub metrics: HashMap<String, f64>,
    pub validation_errors: Vec<String>,
}

/// One walk-forward iteration: in-sample vs out-of-sample degradation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    /// Sequence number of the iteration, preserved so consumers can print
    /// or compare iterations in protocol order.
    pub iteration: usize,
    pub period: BacktestPeriod,
    pub in_sample_sharpe: f64,
    pub out_sample_sharpe: f64,
    /// Out-of-sample Sharpe degradation in percent.
    pub degradation: f64,
    /// Degradation clamped to 0-100; higher = more overfit.
    pub overfitting_score: f64,
}

/// Distribution of bootstrap-simulated horizon returns.
///
/// `num_simulations == 0` signals "insufficient historical data": all other
/// fields are zero-filled rather than an error being raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub num_simulations: usize,
    pub mean_return: f64,
    pub median_return: f64,
    pub std_return: f64,
    pub percentile_5: f64,
    pub percentile_95: f64,
    pub var_95: f64,
    pub expected_shortfall_95: f64,
    /// Fraction of simulated paths ending below zero.
    pub probability_loss: f64,
}

impl MonteCarloResult {
    /// Zero-filled result used when fewer than 2 historical returns exist.
    pub fn empty() -> Self {
        Self {
            num_simulations: 0,
            mean_return: 0.0,
            median_return: 0.0,
            std_return: 0.0,
            percentile_5: 0.0,
            percentile_95: 0.0,
            var_95: 0.0,
            expected_shortfall_95: 0.0,
            probability_loss: 0.0,
        }
    }
}

/// Benchmark-relative fields, computed only when a benchmark series of equal
/// length is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRelative {
    pub beta: f64,
    pub alpha_pct: f64,
    pub information_ratio: f64,
    pub excess_return_pct: f64,
}

/// Every performance metric over one value series, in one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveMetrics {
    pub num_periods: usize,
    pub num_years: f64,
    pub start_value: f64,
    pub end_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub volatility_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown_pct: f64,
    pub drawdown_peak_index: usize,
    pub drawdown_trough_index: usize,
    pub var_95_pct: f64,
    pub cvar_95_pct: f64,
    pub ulcer_index: f64,
    pub win_rate_pct: f64,
    pub profit_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkRelative>,
}

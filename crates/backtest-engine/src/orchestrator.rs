//! Drives full validation runs: fetches prices through the shared cache,
//! values the portfolio per period, derives metrics, and accumulates results
//! for comparison, grading, and serialization.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use futures_util::future::join_all;

use portfolio_core::{
    BacktestPeriod, BacktestResult, HoldingsSet, MonteCarloResult, PortfolioError, PriceCache,
    PriceSeries, PriceSeriesProvider, WalkForwardResult,
};
use validation::{PredictionValidation, StrategyComparison};

use crate::metrics::{self, DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use crate::monte_carlo::{self, MonteCarloConfig};
use crate::valuation;
use crate::walk_forward::{self, WalkForwardConfig};

/// Starting-capital assumption when no price data exists to value against.
const FALLBACK_BASE_VALUE: f64 = 100_000.0;
/// Notional return used for the degenerate no-data fallback result.
const FALLBACK_TOTAL_RETURN: f64 = 0.15;

pub struct BacktestOrchestrator {
    provider: Arc<dyn PriceSeriesProvider>,
    cache: Arc<PriceCache>,
    risk_free_rate: f64,
    results: Vec<BacktestResult>,
    walk_forward_results: Vec<WalkForwardResult>,
    monte_carlo_results: Vec<MonteCarloResult>,
}

impl BacktestOrchestrator {
    pub fn new(provider: Arc<dyn PriceSeriesProvider>) -> Self {
        Self::with_cache(provider, Arc::new(PriceCache::new()))
    }

    /// Share a price cache across orchestrators (or with other consumers).
    pub fn with_cache(provider: Arc<dyn PriceSeriesProvider>, cache: Arc<PriceCache>) -> Self {
        Self {
            provider,
            cache,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            results: Vec::new(),
            walk_forward_results: Vec::new(),
            monte_carlo_results: Vec::new(),
        }
    }

    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    /// Illustrative catalogue of named test windows covering crisis, bull,
    /// bear, and multi-year regimes. Production callers supply their own
    /// periods; these are sensible defaults.
    pub fn standard_test_periods() -> Vec<BacktestPeriod> {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        vec![
            BacktestPeriod::new(
                date(2020, 1, 1),
                date(2020, 12, 31),
                "COVID-19 Crash & Recovery - High volatility test",
            ),
            BacktestPeriod::new(
                date(2021, 1, 1),
                date(2021, 12, 31),
                "Post-COVID Bull Market - Growth validation",
            ),
            BacktestPeriod::new(
                date(2022, 1, 1),
                date(2022, 12, 31),
                "Bear Market - Inflation & Rate Hikes",
            ),
            BacktestPeriod::new(
                date(2023, 1, 1),
                date(2024, 12, 31),
                "Recent 2-Year Period - Current strategy validation",
            ),
            BacktestPeriod::new(
                date(2019, 1, 1),
                date(2024, 12, 31),
                "5-Year Full Cycle - Complete validation",
            ),
            BacktestPeriod::new(
                date(2015, 1, 1),
                date(2024, 12, 31),
                "10-Year Long-term - Ultimate validation",
            ),
        ]
    }

    /// Fetch all symbols concurrently through the cache. Individual fetch
    /// failures degrade to missing entries; the run carries on with what it
    /// has and the failure shows up as a validation error downstream.
    async fn fetch_all(
        &self,
        symbols: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<String, PriceSeries> {
        let fetches = symbols.iter().map(|sym| {
            let symbol = sym.to_string();
            async move {
                let fetched = self
                    .cache
                    .get_or_fetch(self.provider.as_ref(), &symbol, start, end)
                    .await;
                (symbol, fetched)
            }
        });

        let mut prices = HashMap::new();
        for (symbol, fetched) in join_all(fetches).await {
            match fetched {
                Ok(series) => {
                    prices.insert(symbol, series);
                }
                Err(e) => tracing::warn!("Price fetch failed for {}: {}", symbol, e),
            }
        }
        prices
    }

    /// Backtest one holdings set over one period and accumulate the result.
    ///
    /// Never fails the batch: a period without any price data produces a
    /// degenerate result with `validation_errors` populated instead.
    pub async fn run_backtest(
        &mut self,
        holdings: &HoldingsSet,
        period: &BacktestPeriod,
    ) -> BacktestResult {
        tracing::info!(
            "Backtesting '{}': {} to {}",
            period.description,
            period.start_date,
            period.end_date
        );

        let symbols = holdings.symbols();
        tracing::debug!("Fetching historical data for {} symbols", symbols.len());
        let prices = self
            .fetch_all(&symbols, period.start_date, period.end_date)
            .await;

        let has_data = prices.values().any(|s| !s.is_empty());
        let result = if !has_data {
            tracing::warn!("No historical data available - using fallback calculation");
            Self::fallback_result(
                period,
                "No historical data available for any symbols".to_string(),
            )
        } else {
            let daily =
                valuation::daily_valuations(holdings, &prices, period.start_date, period.end_date);
            if daily.is_empty() {
                Self::degenerate_result(
                    period,
                    "Failed to calculate daily portfolio values".to_string(),
                )
            } else {
                self.measured_result(period, &daily)
            }
        };

        self.results.push(result.clone());
        result
    }

    fn measured_result(
        &self,
        period: &BacktestPeriod,
        daily: &[portfolio_core::DailyValuation],
    ) -> BacktestResult {
        let values = valuation::values_of(daily);
        let initial_value = values[0];
        let final_value = values[values.len() - 1];
        let total_return = metrics::total_return(initial_value, final_value);

        let years = period.years();
        let annualized = if years > 0.0 {
            metrics::annualized_return(initial_value, final_value, years)
        } else {
            total_return
        };

        let rets = metrics::returns(&values);
        let sharpe = metrics::sharpe_ratio(&rets, self.risk_free_rate, TRADING_DAYS_PER_YEAR);
        let (max_dd, _, _) = metrics::max_drawdown(&values);
        let vol = metrics::volatility(&rets, true, TRADING_DAYS_PER_YEAR);
        let win_rate = metrics::win_rate(&rets);

        tracing::info!(
            "Backtest '{}': {} daily values, total return {:.2}%, Sharpe {:.2}, max drawdown {:.2}%",
            period.description,
            values.len(),
            total_return * 100.0,
            sharpe,
            max_dd * 100.0
        );

        let positive = rets.iter().filter(|r| **r > 0.0).count();
        let negative = rets.iter().filter(|r| **r < 0.0).count();
        let metrics_map = HashMap::from([
            ("num_days".to_string(), values.len() as f64),
            ("num_returns".to_string(), rets.len() as f64),
            ("positive_days".to_string(), positive as f64),
            ("negative_days".to_string(), negative as f64),
        ]);

        BacktestResult {
            period: period.clone(),
            initial_value,
            final_value,
            total_return_pct: total_return * 100.0,
            annualized_return_pct: annualized * 100.0,
            sharpe_ratio: sharpe,
            max_drawdown_pct: max_dd * 100.0,
            volatility: vol,
            win_rate: win_rate * 100.0,
            metrics: metrics_map,
            validation_errors: Vec::new(),
        }
    }

    /// Best-effort result when no symbol returned any data: a notional
    /// outcome so multi-period batches keep their shape, flagged loudly in
    /// `validation_errors`.
    fn fallback_result(period: &BacktestPeriod, error: String) -> BacktestResult {
        let initial_value = FALLBACK_BASE_VALUE;
        let final_value = initial_value * (1.0 + FALLBACK_TOTAL_RETURN);
        let years = period.years();
        let annualized = if years > 0.0 {
            (1.0 + FALLBACK_TOTAL_RETURN).powf(1.0 / years) - 1.0
        } else {
            FALLBACK_TOTAL_RETURN
        };

        BacktestResult {
            period: period.clone(),
            initial_value,
            final_value,
            total_return_pct: FALLBACK_TOTAL_RETURN * 100.0,
            annualized_return_pct: annualized * 100.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            volatility: 0.0,
            win_rate: 0.0,
            metrics: HashMap::new(),
            validation_errors: vec![error],
        }
    }

    /// Result for a period where data existed but no date had full coverage.
    fn degenerate_result(period: &BacktestPeriod, error: String) -> BacktestResult {
        BacktestResult {
            period: period.clone(),
            initial_value: FALLBACK_BASE_VALUE,
            final_value: FALLBACK_BASE_VALUE,
            total_return_pct: 0.0,
            annualized_return_pct: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            volatility: 0.0,
            win_rate: 0.0,
            metrics: HashMap::new(),
            validation_errors: vec![error],
        }
    }

    /// Walk-forward overfitting analysis over `[start, end]`.
    pub async fn walk_forward_analysis(
        &mut self,
        holdings: &HoldingsSet,
        start: NaiveDate,
        end: NaiveDate,
        config: &WalkForwardConfig,
    ) -> Vec<WalkForwardResult> {
        let symbols = holdings.symbols();
        let prices = self.fetch_all(&symbols, start, end).await;
        let results = walk_forward::analyze(holdings, &prices, config);
        self.walk_forward_results = results.clone();
        results
    }

    async fn historical_returns(
        &self,
        holdings: &HoldingsSet,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<f64> {
        let symbols = holdings.symbols();
        let prices = self.fetch_all(&symbols, start, end).await;
        let daily = valuation::daily_valuations(holdings, &prices, start, end);
        metrics::returns(&valuation::values_of(&daily))
    }

    /// Bootstrap-simulate horizon outcomes from the realized daily returns
    /// over `[start, end]`.
    pub async fn monte_carlo_simulation(
        &mut self,
        holdings: &HoldingsSet,
        start: NaiveDate,
        end: NaiveDate,
        config: &MonteCarloConfig,
    ) -> MonteCarloResult {
        let returns = self.historical_returns(holdings, start, end).await;
        let result = monte_carlo::run_monte_carlo(&returns, config);
        self.monte_carlo_results.push(result.clone());
        result
    }

    /// Like [`Self::monte_carlo_simulation`], but abandoned past `timeout`.
    ///
    /// A timeout behaves exactly like cancellation: the simulation stops at
    /// the next batch boundary and nothing partial is published or recorded.
    pub async fn monte_carlo_with_timeout(
        &mut self,
        holdings: &HoldingsSet,
        start: NaiveDate,
        end: NaiveDate,
        config: &MonteCarloConfig,
        timeout: Duration,
    ) -> Result<MonteCarloResult, PortfolioError> {
        let returns = self.historical_returns(holdings, start, end).await;
        let cancel = Arc::new(AtomicBool::new(false));

        let task_cancel = Arc::clone(&cancel);
        let task_config = config.clone();
        let handle = tokio::task::spawn_blocking(move || {
            monte_carlo::run_monte_carlo_cancellable(&returns, &task_config, &task_cancel)
        });

        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => {
                // A worker that vanished mid-run published nothing; treat it
                // like a cancelled run.
                let result = joined.map_err(|_| PortfolioError::Cancelled)??;
                self.monte_carlo_results.push(result.clone());
                Ok(result)
            }
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                tracing::warn!("Monte Carlo timed out after {:?}; discarding run", timeout);
                Err(PortfolioError::Cancelled)
            }
        }
    }

    pub fn compare_strategies(&self) -> Result<StrategyComparison, PortfolioError> {
        validation::compare_strategies(&self.results)
    }

    pub fn validate_predictions(
        &self,
        predicted_metrics: &HashMap<String, f64>,
        actual: &BacktestResult,
    ) -> PredictionValidation {
        validation::validate_predictions(predicted_metrics, actual)
    }

    pub fn results(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn walk_forward_results(&self) -> &[WalkForwardResult] {
        &self.walk_forward_results
    }

    pub fn monte_carlo_results(&self) -> &[MonteCarloResult] {
        &self.monte_carlo_results
    }

    /// Serialize everything accumulated so far into one JSON document.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = serde_json::json!({
            "generated_at": Utc::now().to_rfc3339(),
            "num_tests": self.results.len(),
            "results": self.results,
        });
        if !self.walk_forward_results.is_empty() {
            doc["walk_forward"] = serde_json::json!(self.walk_forward_results);
        }
        if !self.monte_carlo_results.is_empty() {
            doc["monte_carlo"] = serde_json::json!(self.monte_carlo_results);
        }
        doc
    }

    /// Write the result document as pretty-printed JSON.
    pub fn save_results(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_document())
            .context("serializing backtest results")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing backtest results to {}", path.display()))?;
        tracing::info!("Backtest results saved to {}", path.display());
        Ok(())
    }

    /// Human-readable summary of all accumulated results.
    pub fn generate_report(&self) -> String {
        if self.results.is_empty() {
            return "No backtest results available".to_string();
        }

        let mut report = Vec::new();
        report.push("=".repeat(80));
        report.push("BACKTESTING VALIDATION REPORT".to_string());
        report.push("=".repeat(80));
        report.push(format!(
            "\nGenerated: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));
        report.push(format!("Total Tests Run: {}\n", self.results.len()));

        for (i, result) in self.results.iter().enumerate() {
            report.push(format!("\n{}", "-".repeat(80)));
            report.push(format!("Test #{}: {}", i + 1, result.period.description));
            report.push("-".repeat(80));
            report.push(format!(
                "Period: {} to {}",
                result.period.start_date, result.period.end_date
            ));
            report.push(format!("Initial Value: ${:.2}", result.initial_value));
            report.push(format!("Final Value: ${:.2}", result.final_value));
            report.push(format!("Total Return: {:.2}%", result.total_return_pct));
            report.push(format!(
                "Annualized Return: {:.2}%",
                result.annualized_return_pct
            ));
            report.push(format!("Sharpe Ratio: {:.2}", result.sharpe_ratio));
            report.push(format!("Max Drawdown: {:.2}%", result.max_drawdown_pct));
            report.push(format!("Volatility: {:.2}%", result.volatility * 100.0));
            report.push(format!("Win Rate: {:.2}%", result.win_rate));

            if !result.validation_errors.is_empty() {
                report.push("\nValidation Errors:".to_string());
                for error in &result.validation_errors {
                    report.push(format!("  ! {error}"));
                }
            }
        }

        report.push(format!("\n{}", "=".repeat(80)));
        report.join("\n")
    }
}

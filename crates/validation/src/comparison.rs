use serde::{Deserialize, Serialize};

use portfolio_core::{BacktestResult, PortfolioError};

/// Spread of one metric across the compared strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub best: f64,
    pub worst: f64,
    pub average: f64,
    pub std_dev: f64,
}

/// One strategy's position in a ranking. `index` refers back to the input
/// slice so callers can identify the strategy regardless of sort order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankEntry {
    pub rank: usize,
    pub index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerSummary {
    pub index: usize,
    pub reason: String,
    pub sharpe_ratio: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
}

/// Cross-strategy comparison over a set of realized backtest results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub num_strategies: usize,
    pub returns: MetricSummary,
    pub sharpe_ratios: MetricSummary,
    /// Drawdown "best" is the minimum.
    pub max_drawdowns: MetricSummary,
    pub by_sharpe: Vec<RankEntry>,
    pub by_return: Vec<RankEntry>,
    pub by_drawdown: Vec<RankEntry>,
    pub winner: WinnerSummary,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn summarize(values: &[f64], lower_is_better: bool) -> MetricSummary {
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let (best, worst) = if lower_is_better { (min, max) } else { (max, min) };
    MetricSummary {
        best,
        worst,
        average: mean(values),
        std_dev: sample_std_dev(values),
    }
}

/// Rank indices by `values`, descending unless `ascending`. Stable, so ties
/// keep input order.
fn rank_by(values: &[f64], ascending: bool) -> Vec<RankEntry> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal);
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
    order
        .into_iter()
        .enumerate()
        .map(|(rank, index)| RankEntry {
            rank: rank + 1,
            index,
            value: values[index],
        })
        .collect()
}

/// Compare strategies and pick an overall winner by Sharpe ratio.
///
/// Requires at least one result; an empty slice is a caller error surfaced
/// as `InsufficientData`.
pub fn compare_strategies(results: &[BacktestResult]) -> Result<StrategyComparison, PortfolioError> {
    if results.is_empty() {
        return Err(PortfolioError::InsufficientData(
            "no backtest results to compare".to_string(),
        ));
    }

    let returns: Vec<f64> = results.iter().map(|r| r.annualized_return_pct).collect();
    let sharpes: Vec<f64> = results.iter().map(|r| r.sharpe_ratio).collect();
    let drawdowns: Vec<f64> = results.iter().map(|r| r.max_drawdown_pct).collect();

    let by_sharpe = rank_by(&sharpes, false);
    let by_return = rank_by(&returns, false);
    let by_drawdown = rank_by(&drawdowns, true);

    let winner_idx = by_sharpe[0].index;
    let winner = WinnerSummary {
        index: winner_idx,
        reason: "Best Sharpe ratio (best risk-adjusted return)".to_string(),
        sharpe_ratio: results[winner_idx].sharpe_ratio,
        annualized_return_pct: results[winner_idx].annualized_return_pct,
        max_drawdown_pct: results[winner_idx].max_drawdown_pct,
    };

    tracing::info!(
        "Compared {} strategies; winner is #{} with Sharpe {:.2}",
        results.len(),
        winner_idx,
        winner.sharpe_ratio
    );

    Ok(StrategyComparison {
        num_strategies: results.len(),
        returns: summarize(&returns, false),
        sharpe_ratios: summarize(&sharpes, false),
        max_drawdowns: summarize(&drawdowns, true),
        by_sharpe,
        by_return,
        by_drawdown,
        winner,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use portfolio_core::BacktestPeriod;

    use super::*;

    fn result(annualized: f64, sharpe: f64, drawdown: f64) -> BacktestResult {
        BacktestResult {
            period: BacktestPeriod::new(
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
                "comparison test",
            ),
            initial_value: 100_000.0,
            final_value: 100_000.0 * (1.0 + annualized / 100.0),
            total_return_pct: annualized,
            annualized_return_pct: annualized,
            sharpe_ratio: sharpe,
            max_drawdown_pct: drawdown,
            volatility: 0.2,
            win_rate: 50.0,
            metrics: HashMap::new(),
            validation_errors: Vec::new(),
        }
    }

    #[test]
    fn winner_has_highest_sharpe() {
        let results = vec![
            result(8.0, 0.5, 12.0),
            result(11.0, 1.2, 18.0),
            result(9.0, 0.8, 9.0),
        ];

        let comparison = compare_strategies(&results).unwrap();
        assert_eq!(comparison.winner.index, 1);
        assert!(comparison.winner.reason.contains("Sharpe ratio"));
        assert_eq!(comparison.by_sharpe[0].index, 1);
        assert_eq!(comparison.by_drawdown[0].index, 2); // lowest drawdown ranks first
        assert_eq!(comparison.by_return[0].index, 1);
    }

    #[test]
    fn summaries_track_best_and_worst() {
        let results = vec![result(5.0, 0.4, 20.0), result(15.0, 1.0, 10.0)];

        let comparison = compare_strategies(&results).unwrap();
        assert_eq!(comparison.returns.best, 15.0);
        assert_eq!(comparison.returns.worst, 5.0);
        assert_eq!(comparison.returns.average, 10.0);
        assert_eq!(comparison.max_drawdowns.best, 10.0);
        assert_eq!(comparison.max_drawdowns.worst, 20.0);
    }

    #[test]
    fn single_result_is_its_own_winner() {
        let comparison = compare_strategies(&[result(7.0, 0.9, 11.0)]).unwrap();
        assert_eq!(comparison.num_strategies, 1);
        assert_eq!(comparison.winner.index, 0);
        assert_eq!(comparison.returns.std_dev, 0.0);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            compare_strategies(&[]),
            Err(PortfolioError::InsufficientData(_))
        ));
    }
}

//! Pure performance-metric functions over numeric series.
//!
//! Every single-series metric fails soft: fewer than two observations or a
//! zero denominator yields a neutral 0.0 instead of an error. Cross-series
//! comparisons (`beta`, `information_ratio`) are the exception; mismatched
//! lengths are a caller contract violation and surface as
//! `SeriesLengthMismatch`.

use portfolio_core::{BenchmarkRelative, ComprehensiveMetrics, PortfolioError};

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.04;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Sortino is capped here when no downside exists at all.
const SORTINO_CAP: f64 = 10.0;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator).
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Period-over-period fractional returns. Empty if fewer than 2 values;
/// a zero-valued period yields a neutral 0.0 return rather than NaN.
pub fn returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .map(|w| if w[0] == 0.0 { 0.0 } else { (w[1] - w[0]) / w[0] })
        .collect()
}

/// 0.0 when the initial value is non-positive, matching `annualized_return`.
pub fn total_return(initial_value: f64, final_value: f64) -> f64 {
    if initial_value <= 0.0 {
        return 0.0;
    }
    (final_value - initial_value) / initial_value
}

/// Geometric-mean annualized return: (final/initial)^(1/years) - 1.
pub fn annualized_return(initial_value: f64, final_value: f64, num_years: f64) -> f64 {
    if num_years <= 0.0 || initial_value <= 0.0 {
        return 0.0;
    }
    (final_value / initial_value).powf(1.0 / num_years) - 1.0
}

/// Standard deviation of returns, annualized by sqrt(periods) when asked.
pub fn volatility(returns: &[f64], annualize: bool, periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let vol = sample_std_dev(returns);
    if annualize {
        vol * periods_per_year.sqrt()
    } else {
        vol
    }
}

/// Annualized Sharpe ratio: (mean*periods - rf) / (stdev*sqrt(periods)).
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std_dev = sample_std_dev(returns);
    if std_dev == 0.0 {
        return 0.0;
    }
    let annual_return = mean(returns) * periods_per_year;
    let annual_std = std_dev * periods_per_year.sqrt();
    (annual_return - risk_free_rate) / annual_std
}

/// Annualized Sortino ratio, penalizing downside volatility only.
///
/// Downside deviation is sqrt(sum(min(r,0)^2) / n) over the **total** return
/// count n, not the count of negative returns. That denominator is
/// deliberately preserved from the reference behavior and makes the ratio
/// systematically more conservative than the textbook definition; see the
/// pinned test before changing it. Capped at 10.0 when no negative returns
/// exist.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq_sum: f64 = returns
        .iter()
        .filter(|r| **r < 0.0)
        .map(|r| r * r)
        .sum();
    if downside_sq_sum == 0.0 {
        return SORTINO_CAP;
    }
    let downside_dev = (downside_sq_sum / returns.len() as f64).sqrt();

    let annual_return = mean(returns) * periods_per_year;
    let annual_downside_dev = downside_dev * periods_per_year.sqrt();
    (annual_return - risk_free_rate) / annual_downside_dev
}

/// Maximum peak-to-trough decline.
///
/// Returns (drawdown fraction, peak index, trough index); all zero for a
/// monotonically non-decreasing series.
pub fn max_drawdown(values: &[f64]) -> (f64, usize, usize) {
    if values.len() < 2 {
        return (0.0, 0, 0);
    }

    let mut peak = values[0];
    let mut peak_idx = 0;
    let mut max_dd = 0.0;
    let mut max_dd_peak_idx = 0;
    let mut max_dd_trough_idx = 0;

    for (i, &value) in values.iter().enumerate() {
        if value > peak {
            peak = value;
            peak_idx = i;
        }
        let drawdown = (peak - value) / peak;
        if drawdown > max_dd {
            max_dd = drawdown;
            max_dd_peak_idx = peak_idx;
            max_dd_trough_idx = i;
        }
    }

    (max_dd, max_dd_peak_idx, max_dd_trough_idx)
}

/// Calmar ratio: annualized return divided by max drawdown.
///
/// Both arguments are fractions (not percentages); that convention is applied
/// uniformly at every call site in this workspace.
pub fn calmar_ratio(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        return 0.0;
    }
    annualized_return / max_drawdown
}

/// Historical-simulation Value at Risk, as a non-negative loss fraction.
pub fn value_at_risk(returns: &[f64], confidence_level: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut index = ((1.0 - confidence_level) * sorted.len() as f64) as usize;
    if index >= sorted.len() {
        index = sorted.len() - 1;
    }
    (-sorted[index]).max(0.0)
}

/// Conditional VaR (expected shortfall): mean loss beyond the VaR threshold.
pub fn conditional_var(returns: &[f64], confidence_level: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let index = (((1.0 - confidence_level) * sorted.len() as f64) as usize).max(1);
    let tail = &sorted[..index.min(sorted.len())];
    (-mean(tail)).max(0.0)
}

/// Fraction of periods with a positive return, 0.0-1.0.
pub fn win_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().filter(|r| **r > 0.0).count() as f64 / returns.len() as f64
}

/// Sum of gains over sum of losses; infinite when profitable with no losses.
pub fn profit_factor(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let gains: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let losses: f64 = returns.iter().filter(|r| **r < 0.0).sum::<f64>().abs();
    if losses == 0.0 {
        if gains > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        gains / losses
    }
}

/// Portfolio beta vs a benchmark: cov(port, bench) / var(bench).
///
/// Input lengths must match; 1.0 when the benchmark has no variance or
/// fewer than 2 observations.
pub fn beta(portfolio_returns: &[f64], benchmark_returns: &[f64]) -> Result<f64, PortfolioError> {
    if portfolio_returns.len() != benchmark_returns.len() {
        return Err(PortfolioError::SeriesLengthMismatch {
            left: portfolio_returns.len(),
            right: benchmark_returns.len(),
        });
    }
    if portfolio_returns.len() < 2 {
        return Ok(1.0);
    }

    let port_mean = mean(portfolio_returns);
    let bench_mean = mean(benchmark_returns);
    let n = portfolio_returns.len() as f64;

    let covariance = portfolio_returns
        .iter()
        .zip(benchmark_returns)
        .map(|(p, b)| (p - port_mean) * (b - bench_mean))
        .sum::<f64>()
        / (n - 1.0);

    let bench_variance = benchmark_returns
        .iter()
        .map(|b| (b - bench_mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);

    if bench_variance == 0.0 {
        return Ok(1.0);
    }
    Ok(covariance / bench_variance)
}

/// Jensen's alpha: the CAPM residual.
pub fn alpha(
    portfolio_return: f64,
    benchmark_return: f64,
    beta: f64,
    risk_free_rate: f64,
) -> f64 {
    let expected = risk_free_rate + beta * (benchmark_return - risk_free_rate);
    portfolio_return - expected
}

/// Information ratio: mean excess return over tracking error.
pub fn information_ratio(
    portfolio_returns: &[f64],
    benchmark_returns: &[f64],
) -> Result<f64, PortfolioError> {
    if portfolio_returns.len() != benchmark_returns.len() {
        return Err(PortfolioError::SeriesLengthMismatch {
            left: portfolio_returns.len(),
            right: benchmark_returns.len(),
        });
    }
    if portfolio_returns.len() < 2 {
        return Ok(0.0);
    }

    let excess: Vec<f64> = portfolio_returns
        .iter()
        .zip(benchmark_returns)
        .map(|(p, b)| p - b)
        .collect();

    let tracking_error = sample_std_dev(&excess);
    if tracking_error == 0.0 {
        return Ok(0.0);
    }
    Ok(mean(&excess) / tracking_error)
}

/// Ulcer index: RMS of percentage drawdowns across the series.
pub fn ulcer_index(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mut peak = values[0];
    let sq_sum: f64 = values
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            let dd_pct = (peak - value) / peak * 100.0;
            dd_pct * dd_pct
        })
        .sum();

    (sq_sum / values.len() as f64).sqrt()
}

/// All metrics over one value series, with benchmark-relative fields added
/// only when a benchmark of equal length is supplied.
pub fn comprehensive_metrics(
    values: &[f64],
    benchmark_values: Option<&[f64]>,
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Result<ComprehensiveMetrics, PortfolioError> {
    if values.len() < 2 {
        return Err(PortfolioError::InsufficientData(format!(
            "need at least 2 values for a metrics report, got {}",
            values.len()
        )));
    }

    let rets = returns(values);
    let num_periods = rets.len();
    let num_years = num_periods as f64 / periods_per_year;

    let total_ret = total_return(values[0], values[values.len() - 1]);
    let annual_ret = annualized_return(values[0], values[values.len() - 1], num_years);
    let vol = volatility(&rets, true, periods_per_year);

    let sharpe = sharpe_ratio(&rets, risk_free_rate, periods_per_year);
    let sortino = sortino_ratio(&rets, risk_free_rate, periods_per_year);

    let (max_dd, peak_idx, trough_idx) = max_drawdown(values);
    let calmar = calmar_ratio(annual_ret, max_dd);

    let benchmark = match benchmark_values {
        Some(bench) if bench.len() == values.len() => {
            let bench_rets = returns(bench);
            let bench_annual = annualized_return(bench[0], bench[bench.len() - 1], num_years);
            let b = beta(&rets, &bench_rets)?;
            Some(BenchmarkRelative {
                beta: b,
                alpha_pct: alpha(annual_ret, bench_annual, b, risk_free_rate) * 100.0,
                information_ratio: information_ratio(&rets, &bench_rets)?,
                excess_return_pct: (annual_ret - bench_annual) * 100.0,
            })
        }
        _ => None,
    };

    Ok(ComprehensiveMetrics {
        num_periods,
        num_years,
        start_value: values[0],
        end_value: values[values.len() - 1],
        total_return_pct: total_ret * 100.0,
        annualized_return_pct: annual_ret * 100.0,
        volatility_pct: vol * 100.0,
        sharpe_ratio: sharpe,
        sortino_ratio: sortino,
        calmar_ratio: calmar,
        max_drawdown_pct: max_dd * 100.0,
        drawdown_peak_index: peak_idx,
        drawdown_trough_index: trough_idx,
        var_95_pct: value_at_risk(&rets, DEFAULT_CONFIDENCE_LEVEL) * 100.0,
        cvar_95_pct: conditional_var(&rets, DEFAULT_CONFIDENCE_LEVEL) * 100.0,
        ulcer_index: ulcer_index(values),
        win_rate_pct: win_rate(&rets) * 100.0,
        profit_factor: profit_factor(&rets),
        benchmark,
    })
}

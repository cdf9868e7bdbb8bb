//! Statistical robustness helpers for realized return series.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::metrics::TRADING_DAYS_PER_YEAR;

/// 95% bootstrap confidence intervals on key realized metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    pub sharpe_ci_lower: f64,
    pub sharpe_ci_upper: f64,
    pub win_rate_ci_lower: f64,
    pub win_rate_ci_upper: f64,
    pub bootstrap_samples: usize,
}

/// Bootstrap confidence intervals on annualized Sharpe and win rate.
///
/// Resamples the daily-return vector with replacement `num_samples` times.
/// `None` when the series is too short (< 5 returns) to resample sensibly.
pub fn bootstrap_confidence_intervals(
    returns: &[f64],
    num_samples: usize,
    seed: Option<u64>,
) -> Option<ConfidenceIntervals> {
    if returns.len() < 5 || num_samples == 0 {
        return None;
    }

    let n = returns.len();
    let base_seed = seed.unwrap_or_else(rand::random);

    let samples: Vec<(f64, f64)> = (0..num_samples)
        .into_par_iter()
        .map(|sample_idx| {
            let s = base_seed.wrapping_add((sample_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let mut rng = StdRng::seed_from_u64(s);
            let resampled: Vec<f64> = (0..n).map(|_| returns[rng.gen_range(0..n)]).collect();

            let mean = resampled.iter().sum::<f64>() / n as f64;
            let var = resampled.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                / (n as f64 - 1.0).max(1.0);
            let std = var.sqrt();
            let sharpe = if std > 1e-10 {
                (mean / std) * TRADING_DAYS_PER_YEAR.sqrt()
            } else {
                0.0
            };

            let win_rate =
                resampled.iter().filter(|r| **r > 0.0).count() as f64 / n as f64 * 100.0;
            (sharpe, win_rate)
        })
        .collect();

    let mut sharpe_samples: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let mut win_rate_samples: Vec<f64> = samples.iter().map(|s| s.1).collect();

    let ci = |samples: &mut Vec<f64>| -> (f64, f64) {
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        (
            percentile_sorted(samples, 2.5),
            percentile_sorted(samples, 97.5),
        )
    };

    let (sharpe_lo, sharpe_hi) = ci(&mut sharpe_samples);
    let (wr_lo, wr_hi) = ci(&mut win_rate_samples);

    Some(ConfidenceIntervals {
        sharpe_ci_lower: sharpe_lo,
        sharpe_ci_upper: sharpe_hi,
        win_rate_ci_lower: wr_lo,
        win_rate_ci_upper: wr_hi,
        bootstrap_samples: num_samples,
    })
}

/// Two-tailed p-value for the null hypothesis that the Sharpe ratio is 0.
///
/// Uses the asymptotic standard error SE(SR) = sqrt((1 + 0.5 * SR^2) / n).
pub fn sharpe_p_value(sharpe: f64, num_returns: usize) -> f64 {
    if num_returns < 3 {
        return 1.0;
    }
    let n = num_returns as f64;
    let se = ((1.0 + 0.5 * sharpe * sharpe) / n).sqrt();
    let z = sharpe / se;
    2.0 * (1.0 - normal_cdf(z.abs()))
}

fn normal_cdf(x: f64) -> f64 {
    use statrs::distribution::{ContinuousCDF, Normal};
    // Unit normal parameters are always valid.
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

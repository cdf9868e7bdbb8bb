//! Monte Carlo bootstrap simulation.
//!
//! Each path draws `horizon_days` samples with replacement from the observed
//! daily-return vector and compounds them into one simulated horizon return.
//! Paths are independent, so they run in parallel rayon batches; each path
//! seeds its own RNG from the base seed and its path index, which keeps runs
//! reproducible no matter how the thread pool schedules work.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use portfolio_core::{MonteCarloResult, PortfolioError};

/// Paths per batch between cancellation checks.
const BATCH_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    pub num_simulations: usize,
    pub horizon_days: usize,
    /// Base RNG seed. `None` draws a fresh one, for production runs where
    /// reproducibility is not needed.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            horizon_days: 252,
            seed: None,
        }
    }
}

/// Run the simulation to completion. See [`run_monte_carlo_cancellable`].
pub fn run_monte_carlo(historical_returns: &[f64], config: &MonteCarloConfig) -> MonteCarloResult {
    let never = AtomicBool::new(false);
    // The flag is never set, so cancellation is impossible.
    run_monte_carlo_cancellable(historical_returns, config, &never)
        .unwrap_or_else(|_| MonteCarloResult::empty())
}

/// Bootstrap-simulate horizon returns with cooperative cancellation.
///
/// `cancel` is checked between path batches; once set, the run stops and
/// `Cancelled` is returned with nothing published. Fewer than 2 historical
/// returns is not an error: the result comes back zero-filled with
/// `num_simulations == 0` as the "insufficient data" signal.
pub fn run_monte_carlo_cancellable(
    historical_returns: &[f64],
    config: &MonteCarloConfig,
    cancel: &AtomicBool,
) -> Result<MonteCarloResult, PortfolioError> {
    if historical_returns.len() < 2 || config.num_simulations == 0 {
        tracing::warn!(
            "Insufficient data for Monte Carlo: {} historical returns, {} simulations requested",
            historical_returns.len(),
            config.num_simulations
        );
        return Ok(MonteCarloResult::empty());
    }

    let n = historical_returns.len();
    let horizon = config.horizon_days;
    let base_seed = config.seed.unwrap_or_else(rand::random);

    tracing::info!(
        "Running {} Monte Carlo paths over a {}-day horizon ({} historical returns)",
        config.num_simulations,
        horizon,
        n
    );

    let simulate_path = |path_idx: usize| -> f64 {
        // Splitmix-style index mixing keeps per-path streams decorrelated.
        let seed = base_seed.wrapping_add((path_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let mut rng = StdRng::seed_from_u64(seed);
        let compounded = (0..horizon).fold(1.0_f64, |acc, _| {
            acc * (1.0 + historical_returns[rng.gen_range(0..n)])
        });
        compounded - 1.0
    };

    let mut final_returns: Vec<f64> = Vec::with_capacity(config.num_simulations);
    let mut start = 0;
    while start < config.num_simulations {
        if cancel.load(Ordering::Relaxed) {
            tracing::warn!(
                "Monte Carlo cancelled after {} of {} paths; discarding partial results",
                start,
                config.num_simulations
            );
            return Err(PortfolioError::Cancelled);
        }
        let end = (start + BATCH_SIZE).min(config.num_simulations);
        let batch: Vec<f64> = (start..end).into_par_iter().map(simulate_path).collect();
        final_returns.extend(batch);
        start = end;
    }

    final_returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(summarize(&final_returns))
}

/// Distribution statistics over the sorted path returns.
fn summarize(sorted: &[f64]) -> MonteCarloResult {
    let n = sorted.len();
    let nf = n as f64;

    let mean = sorted.iter().sum::<f64>() / nf;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let std_return = if n > 1 {
        (sorted.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (nf - 1.0)).sqrt()
    } else {
        0.0
    };

    let p5_idx = (0.05 * nf) as usize;
    let p95_idx = ((0.95 * nf) as usize).min(n - 1);
    let percentile_5 = sorted[p5_idx];
    let percentile_95 = sorted[p95_idx];

    let tail = &sorted[..p5_idx];
    let expected_shortfall_95 = if tail.is_empty() {
        0.0
    } else {
        -(tail.iter().sum::<f64>() / tail.len() as f64)
    };

    let probability_loss = sorted.iter().filter(|r| **r < 0.0).count() as f64 / nf;

    MonteCarloResult {
        num_simulations: n,
        mean_return: mean,
        median_return: median,
        std_return,
        percentile_5,
        percentile_95,
        var_95: -percentile_5,
        expected_shortfall_95,
        probability_loss,
    }
}

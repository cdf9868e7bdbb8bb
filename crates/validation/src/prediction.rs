use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portfolio_core::{BacktestPeriod, BacktestResult};

/// Sentinel `error_pct` recorded when the realized value is exactly zero and
/// a relative error cannot be formed.
pub const ERROR_PCT_SENTINEL: f64 = 999.0;

/// One predicted metric graded against its realized value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricValidation {
    pub predicted: f64,
    pub actual: f64,
    /// Absolute error |predicted - actual|.
    pub error: f64,
    /// Relative error in percent, where the metric is graded relatively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_pct: Option<f64>,
    /// 0-100 prediction quality grade.
    pub grade: f64,
}

/// Grading of a full prediction set against one realized backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionValidation {
    pub timestamp: DateTime<Utc>,
    pub period: BacktestPeriod,
    pub validations: HashMap<String, MetricValidation>,
    /// Arithmetic mean of all metric grades, 0-100.
    pub overall_quality_score: f64,
    pub recommendations: Vec<String>,
}

/// Grade a prediction error on a 0-100 scale through three tier thresholds
/// `[excellent, good, acceptable]`.
///
/// Piecewise linear: 90-100 within the first threshold, 75-90 within the
/// second, 50-75 within the third, then a point per unit of excess error
/// down to zero.
pub fn grade_error(error: f64, thresholds: [f64; 3]) -> f64 {
    let [t0, t1, t2] = thresholds;
    if error <= t0 {
        100.0 - (error / t0) * 10.0
    } else if error <= t1 {
        90.0 - ((error - t0) / (t1 - t0)) * 15.0
    } else if error <= t2 {
        75.0 - ((error - t1) / (t2 - t1)) * 25.0
    } else {
        (50.0 - (error - t2)).max(0.0)
    }
}

/// Grade predicted metrics against a realized backtest result.
///
/// Recognized keys: `expected_return`, `sharpe_ratio`, `volatility`,
/// `max_drawdown`. Unrecognized keys are ignored.
pub fn validate_predictions(
    predicted_metrics: &HashMap<String, f64>,
    actual: &BacktestResult,
) -> PredictionValidation {
    let mut validations = HashMap::new();

    // Return prediction: relative error against annualized return.
    if let Some(&predicted) = predicted_metrics.get("expected_return") {
        let realized = actual.annualized_return_pct;
        let error = (predicted - realized).abs();
        let error_pct = if realized != 0.0 {
            error / realized.abs() * 100.0
        } else {
            ERROR_PCT_SENTINEL
        };
        validations.insert(
            "return_prediction".to_string(),
            MetricValidation {
                predicted,
                actual: realized,
                error,
                error_pct: Some(error_pct),
                grade: grade_error(error_pct, [10.0, 25.0, 50.0]),
            },
        );
    }

    // Sharpe: graded on absolute error scaled by 100.
    if let Some(&predicted) = predicted_metrics.get("sharpe_ratio") {
        let realized = actual.sharpe_ratio;
        let error = (predicted - realized).abs();
        validations.insert(
            "sharpe_ratio".to_string(),
            MetricValidation {
                predicted,
                actual: realized,
                error,
                error_pct: None,
                grade: grade_error(error * 100.0, [20.0, 40.0, 60.0]),
            },
        );
    }

    if let Some(&predicted) = predicted_metrics.get("volatility") {
        let realized = actual.volatility;
        let error = (predicted - realized).abs();
        let error_pct = if realized != 0.0 {
            error / realized * 100.0
        } else {
            ERROR_PCT_SENTINEL
        };
        validations.insert(
            "volatility".to_string(),
            MetricValidation {
                predicted,
                actual: realized,
                error,
                error_pct: Some(error_pct),
                grade: grade_error(error_pct, [15.0, 30.0, 50.0]),
            },
        );
    }

    // Drawdown: graded on absolute percentage-point error.
    if let Some(&predicted) = predicted_metrics.get("max_drawdown") {
        let realized = actual.max_drawdown_pct;
        let error = (predicted - realized).abs();
        validations.insert(
            "max_drawdown".to_string(),
            MetricValidation {
                predicted,
                actual: realized,
                error,
                error_pct: None,
                grade: grade_error(error, [5.0, 10.0, 20.0]),
            },
        );
    }

    let overall_quality_score = if validations.is_empty() {
        0.0
    } else {
        validations.values().map(|v| v.grade).sum::<f64>() / validations.len() as f64
    };

    let mut recommendations = Vec::new();
    if overall_quality_score < 60.0 {
        recommendations.push(
            "CRITICAL: Prediction accuracy is poor. Review model assumptions and data quality."
                .to_string(),
        );
    } else if overall_quality_score < 75.0 {
        recommendations.push(
            "WARNING: Prediction accuracy is moderate. Consider refining risk parameters."
                .to_string(),
        );
    } else {
        recommendations
            .push("GOOD: Predictions are reasonably accurate. Model appears reliable.".to_string());
    }

    tracing::info!(
        "Prediction quality for '{}': {:.1}/100 across {} metrics",
        actual.period.description,
        overall_quality_score,
        validations.len()
    );

    PredictionValidation {
        timestamp: Utc::now(),
        period: actual.period.clone(),
        validations,
        overall_quality_score,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use portfolio_core::{BacktestPeriod, BacktestResult};

    use super::*;

    fn result_with(annualized: f64, sharpe: f64, volatility: f64, drawdown: f64) -> BacktestResult {
        BacktestResult {
            period: BacktestPeriod::new(
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
                "test period",
            ),
            initial_value: 100_000.0,
            final_value: 110_000.0,
            total_return_pct: 10.0,
            annualized_return_pct: annualized,
            sharpe_ratio: sharpe,
            max_drawdown_pct: drawdown,
            volatility,
            win_rate: 55.0,
            metrics: HashMap::new(),
            validation_errors: Vec::new(),
        }
    }

    #[test]
    fn grade_at_first_threshold_is_exactly_90() {
        assert_eq!(grade_error(10.0, [10.0, 25.0, 50.0]), 90.0);
        assert_eq!(grade_error(5.0, [5.0, 10.0, 20.0]), 90.0);
    }

    #[test]
    fn grade_tiers_are_continuous() {
        let t = [10.0, 25.0, 50.0];
        assert_eq!(grade_error(0.0, t), 100.0);
        assert_eq!(grade_error(25.0, t), 75.0);
        assert_eq!(grade_error(50.0, t), 50.0);
        assert_eq!(grade_error(100.0, t), 0.0);
        assert_eq!(grade_error(500.0, t), 0.0);
    }

    #[test]
    fn perfect_predictions_score_100_and_read_as_good() {
        let actual = result_with(12.0, 1.1, 0.18, 15.0);
        let predicted = HashMap::from([
            ("expected_return".to_string(), 12.0),
            ("sharpe_ratio".to_string(), 1.1),
            ("volatility".to_string(), 0.18),
            ("max_drawdown".to_string(), 15.0),
        ]);

        let validation = validate_predictions(&predicted, &actual);
        assert_eq!(validation.validations.len(), 4);
        assert!((validation.overall_quality_score - 100.0).abs() < 1e-9);
        assert!(validation.recommendations[0].starts_with("GOOD"));
    }

    #[test]
    fn zero_actual_return_uses_sentinel_error_pct() {
        let actual = result_with(0.0, 1.0, 0.2, 10.0);
        let predicted = HashMap::from([("expected_return".to_string(), 8.0)]);

        let validation = validate_predictions(&predicted, &actual);
        let v = &validation.validations["return_prediction"];
        assert_eq!(v.error_pct, Some(ERROR_PCT_SENTINEL));
        assert_eq!(v.grade, 0.0);
        assert!(validation.recommendations[0].starts_with("CRITICAL"));
    }

    #[test]
    fn unrecognized_metrics_are_ignored() {
        let actual = result_with(10.0, 1.0, 0.2, 10.0);
        let predicted = HashMap::from([("alpha".to_string(), 2.0)]);

        let validation = validate_predictions(&predicted, &actual);
        assert!(validation.validations.is_empty());
        assert_eq!(validation.overall_quality_score, 0.0);
    }
}

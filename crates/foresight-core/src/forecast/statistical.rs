//! Statistical forecasting methods
//!
//! SMA, EWMA, and linear regression over a trailing window. All three are
//! pure functions of their input: identical input produces identical
//! predictions, which is the determinism contract the alert pipeline relies
//! on.

use chrono::{DateTime, Utc};

use crate::models::{ForecastPrediction, TimeSeriesPoint};

/// Standard normal quantiles for two-sided confidence bands
const Z_TABLE: &[(f64, f64)] = &[
    (0.50, 0.6745),
    (0.80, 1.2816),
    (0.85, 1.4395),
    (0.90, 1.6449),
    (0.95, 1.9600),
    (0.98, 2.3263),
    (0.99, 2.5758),
    (0.995, 2.8070),
];

/// z-score for a confidence level in (0, 1)
///
/// Exact at the tabulated levels, linearly interpolated between them, and
/// clamped to the nearest entry outside the table.
pub(crate) fn z_score(confidence_level: f64) -> f64 {
    let (first_level, first_z) = Z_TABLE[0];
    if confidence_level <= first_level {
        return first_z;
    }

    for pair in Z_TABLE.windows(2) {
        let (lo_level, lo_z) = pair[0];
        let (hi_level, hi_z) = pair[1];
        if confidence_level <= hi_level {
            let fraction = (confidence_level - lo_level) / (hi_level - lo_level);
            return lo_z + fraction * (hi_z - lo_z);
        }
    }

    Z_TABLE[Z_TABLE.len() - 1].1
}

/// Output timestamps: one calendar day apart, starting the day after the
/// last input point, regardless of the input's actual sampling interval.
pub(crate) fn daily_timestamps(last: DateTime<Utc>, horizon_days: u32) -> Vec<DateTime<Utc>> {
    (1..=i64::from(horizon_days))
        .map(|day| last + chrono::Duration::days(day))
        .collect()
}

/// Build one prediction around a center value with a symmetric band
pub(crate) fn prediction(
    timestamp: DateTime<Utc>,
    center: f64,
    half_width: f64,
    clamp_non_negative: bool,
) -> ForecastPrediction {
    let half_width = half_width.max(0.0);
    let mut lower = center - half_width;
    let mut predicted = center;
    let mut upper = center + half_width;

    // max(0, _) is monotone, so clamping every bound preserves
    // lower <= predicted <= upper
    if clamp_non_negative {
        lower = lower.max(0.0);
        predicted = predicted.max(0.0);
        upper = upper.max(0.0);
    }

    ForecastPrediction {
        timestamp,
        predicted_value: predicted,
        confidence_lower: lower,
        confidence_upper: upper,
    }
}

/// Simple moving average
///
/// Every horizon step predicts the mean of the trailing window; the band is
/// the sample standard deviation of the window scaled by the z-score.
pub(crate) fn sma(
    points: &[TimeSeriesPoint],
    horizon_days: u32,
    confidence_level: f64,
    window: usize,
    clamp_non_negative: bool,
) -> Vec<ForecastPrediction> {
    let window = window.clamp(1, points.len());
    let tail = &points[points.len() - window..];

    let mean = tail.iter().map(|p| p.value).sum::<f64>() / tail.len() as f64;
    let std_dev = if tail.len() < 2 {
        0.0
    } else {
        let sum_sq: f64 = tail.iter().map(|p| (p.value - mean).powi(2)).sum();
        (sum_sq / (tail.len() - 1) as f64).sqrt()
    };

    let half_width = z_score(confidence_level) * std_dev;
    let last = points[points.len() - 1].timestamp;

    daily_timestamps(last, horizon_days)
        .into_iter()
        .map(|ts| prediction(ts, mean, half_width, clamp_non_negative))
        .collect()
}

/// Exponentially weighted moving average
///
/// Maintains a running weighted level and an exponentially weighted
/// variance, then extrapolates flat from the final level. A perfectly flat
/// series keeps the variance at exactly zero, so the band is zero-width.
pub(crate) fn ewma(
    points: &[TimeSeriesPoint],
    horizon_days: u32,
    confidence_level: f64,
    alpha: f64,
    clamp_non_negative: bool,
) -> Vec<ForecastPrediction> {
    let mut level = points[0].value;
    let mut variance = 0.0;

    for point in &points[1..] {
        let diff = point.value - level;
        variance = (1.0 - alpha) * (variance + alpha * diff * diff);
        level += alpha * diff;
    }

    let half_width = z_score(confidence_level) * variance.max(0.0).sqrt();
    let last = points[points.len() - 1].timestamp;

    daily_timestamps(last, horizon_days)
        .into_iter()
        .map(|ts| prediction(ts, level, half_width, clamp_non_negative))
        .collect()
}

/// Ordinary least-squares fit over a trailing window
///
/// Fits value against step index and extrapolates the line per future step.
/// The band is constant, proportional to the residual standard error, and
/// does not widen with horizon distance (a documented limitation).
pub(crate) fn linear(
    points: &[TimeSeriesPoint],
    horizon_days: u32,
    confidence_level: f64,
    window: usize,
    clamp_non_negative: bool,
) -> Vec<ForecastPrediction> {
    let window = window.clamp(2, points.len());
    let tail = &points[points.len() - window..];

    let n = tail.len() as f64;
    let sum_x: f64 = (0..tail.len()).map(|i| i as f64).sum();
    let sum_y: f64 = tail.iter().map(|p| p.value).sum();
    let sum_xx: f64 = (0..tail.len()).map(|i| (i as f64).powi(2)).sum();
    let sum_xy: f64 = tail
        .iter()
        .enumerate()
        .map(|(i, p)| i as f64 * p.value)
        .sum();

    // Distinct integer indices keep the denominator nonzero for n >= 2
    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;

    let residual_std_error = if tail.len() > 2 {
        let ss_res: f64 = tail
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let fitted = slope * i as f64 + intercept;
                (p.value - fitted).powi(2)
            })
            .sum();
        (ss_res / (n - 2.0)).sqrt()
    } else {
        0.0
    };

    let half_width = z_score(confidence_level) * residual_std_error;
    let last = points[points.len() - 1].timestamp;
    let last_index = tail.len() as f64 - 1.0;

    daily_timestamps(last, horizon_days)
        .into_iter()
        .enumerate()
        .map(|(step, ts)| {
            let x = last_index + (step + 1) as f64;
            prediction(ts, slope * x + intercept, half_width, clamp_non_negative)
        })
        .collect()
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::distributions::{normal_quantile, student_t_quantile};

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const DEFAULT_BOOTSTRAP_RESAMPLES: usize = 1000;
/// Width of one unit of measurement (one rouble). Its uniform rounding
/// variance `h²/12` is added to the sample variance.
pub const DEFAULT_RESOLUTION: f64 = 1.0;
/// Samples below this size use Student's t instead of the normal quantile.
pub const SMALL_SAMPLE: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub std: f64,
    pub n: usize,
    pub sem: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub margin_of_error: f64,
    pub confidence_level: f64,
}

/// Proportion interval; every bound is expressed in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProportionInterval {
    pub proportion: f64,
    pub percentage: f64,
    pub n: usize,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub margin_of_error: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStatistic {
    #[default]
    Mean,
    Median,
    Std,
}

impl BootstrapStatistic {
    fn apply(&self, sample: &[f64]) -> f64 {
        match self {
            BootstrapStatistic::Mean => mean(sample),
            BootstrapStatistic::Median => median(sample),
            BootstrapStatistic::Std => sample_std(sample),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    pub statistic: BootstrapStatistic,
    pub statistic_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub n_bootstrap: usize,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub sem: f64,
    pub confidence_interval: ConfidenceInterval,
    pub bootstrap_confidence_interval: BootstrapInterval,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Seeded generator when a seed is configured, OS entropy otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn effective_level(confidence_level: f64) -> f64 {
    if confidence_level > 0.0 && confidence_level < 1.0 {
        confidence_level
    } else {
        warn!(
            confidence_level,
            "Confidence level outside (0, 1), using {}", DEFAULT_CONFIDENCE_LEVEL
        );
        DEFAULT_CONFIDENCE_LEVEL
    }
}

/// Finite, strictly positive values only.
pub fn clean_sample(data: &[f64]) -> Vec<f64> {
    data.iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect()
}

/// Running mean, finite for any finite sample.
pub fn mean(data: &[f64]) -> f64 {
    data.iter()
        .enumerate()
        .fold(0.0, |m, (i, v)| m + (v - m) / (i + 1) as f64)
}

/// Sample standard deviation (`ddof = 1`). Deviations are scaled by the
/// largest one before squaring.
pub fn sample_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let scale = data.iter().map(|v| (v - m).abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return 0.0;
    }
    let sum = data.iter().map(|v| ((v - m) / scale).powi(2)).sum::<f64>();
    scale * (sum / (data.len() - 1) as f64).sqrt()
}

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut values = data.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

pub fn median(data: &[f64]) -> f64 {
    percentile(&sorted(data), 50.0)
}

/// Linear-interpolation percentile over an ascending slice, `q` in `[0, 100]`.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let pos = (q.clamp(0.0, 100.0) / 100.0) * (len - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

fn critical_value(n: usize, confidence_level: f64) -> f64 {
    let upper = 1.0 - (1.0 - confidence_level) / 2.0;
    if n < SMALL_SAMPLE {
        student_t_quantile(upper, (n - 1) as u64)
    } else {
        normal_quantile(upper)
    }
}

pub fn calculate_confidence_interval(data: &[f64], confidence_level: f64) -> ConfidenceInterval {
    calculate_confidence_interval_with_resolution(data, confidence_level, DEFAULT_RESOLUTION)
}

/// Mean interval with Student's t below thirty observations and the normal
/// quantile above. The standard error is `sqrt(s² + h²/12) / sqrt(n)`, which
/// keeps the margin positive for constant samples. A single observation
/// yields a collapsed interval.
pub fn calculate_confidence_interval_with_resolution(
    data: &[f64],
    confidence_level: f64,
    resolution: f64,
) -> ConfidenceInterval {
    let confidence_level = effective_level(confidence_level);
    let clean = clean_sample(data);
    let n = clean.len();

    if n == 0 {
        return ConfidenceInterval {
            confidence_level,
            ..Default::default()
        };
    }

    let mean = mean(&clean);
    let std = sample_std(&clean);

    if n == 1 {
        return ConfidenceInterval {
            mean,
            std,
            n,
            sem: 0.0,
            ci_lower: mean,
            ci_upper: mean,
            margin_of_error: 0.0,
            confidence_level,
        };
    }

    let h = if resolution.is_finite() { resolution.abs() } else { 0.0 };
    let sem = std.hypot(h / 12f64.sqrt()) / (n as f64).sqrt();
    let margin_of_error = critical_value(n, confidence_level) * sem;

    ConfidenceInterval {
        mean,
        std,
        n,
        sem,
        ci_lower: mean - margin_of_error,
        ci_upper: mean + margin_of_error,
        margin_of_error,
        confidence_level,
    }
}

/// Normal approximation to the binomial. `count` is clamped to `total`.
pub fn calculate_proportion_confidence_interval(
    count: usize,
    total: usize,
    confidence_level: f64,
) -> ProportionInterval {
    let confidence_level = effective_level(confidence_level);
    if total == 0 {
        return ProportionInterval {
            confidence_level,
            ..Default::default()
        };
    }

    let proportion = count.min(total) as f64 / total as f64;
    let se = (proportion * (1.0 - proportion) / total as f64).sqrt();
    let margin = normal_quantile(1.0 - (1.0 - confidence_level) / 2.0) * se;

    ProportionInterval {
        proportion,
        percentage: proportion * 100.0,
        n: total,
        ci_lower: (proportion - margin).max(0.0) * 100.0,
        ci_upper: (proportion + margin).min(1.0) * 100.0,
        margin_of_error: margin * 100.0,
        confidence_level,
    }
}

/// Percentile bootstrap over `n_bootstrap` resamples drawn with replacement.
pub fn bootstrap_confidence_interval<R: Rng>(
    data: &[f64],
    confidence_level: f64,
    n_bootstrap: usize,
    statistic: BootstrapStatistic,
    rng: &mut R,
) -> BootstrapInterval {
    let confidence_level = effective_level(confidence_level);
    let clean = clean_sample(data);
    let empty = BootstrapInterval {
        statistic,
        n_bootstrap,
        confidence_level,
        ..Default::default()
    };
    if clean.is_empty() {
        return empty;
    }

    let statistic_value = statistic.apply(&clean);
    if n_bootstrap == 0 {
        return BootstrapInterval {
            statistic_value,
            ci_lower: statistic_value,
            ci_upper: statistic_value,
            ..empty
        };
    }

    let n = clean.len();
    let mut resample = vec![0.0; n];
    let mut estimates: Vec<f64> = (0..n_bootstrap)
        .map(|_| {
            for slot in resample.iter_mut() {
                *slot = clean[rng.gen_range(0..n)];
            }
            statistic.apply(&resample)
        })
        .collect();
    estimates.sort_by(|a, b| a.total_cmp(b));

    let alpha = 1.0 - confidence_level;
    BootstrapInterval {
        statistic_value,
        ci_lower: percentile(&estimates, alpha / 2.0 * 100.0),
        ci_upper: percentile(&estimates, (1.0 - alpha / 2.0) * 100.0),
        ..empty
    }
}

pub fn calculate_statistical_summary<R: Rng>(
    data: &[f64],
    confidence_level: f64,
    n_bootstrap: usize,
    rng: &mut R,
) -> StatisticalSummary {
    let clean = clean_sample(data);
    let confidence_interval = calculate_confidence_interval(&clean, confidence_level);
    let bootstrap_confidence_interval = bootstrap_confidence_interval(
        &clean,
        confidence_level,
        n_bootstrap,
        BootstrapStatistic::Mean,
        rng,
    );
    if clean.is_empty() {
        return StatisticalSummary {
            confidence_interval,
            bootstrap_confidence_interval,
            ..Default::default()
        };
    }

    let ordered = sorted(&clean);
    StatisticalSummary {
        n: clean.len(),
        mean: confidence_interval.mean,
        median: percentile(&ordered, 50.0),
        std: confidence_interval.std,
        min: ordered[0],
        max: ordered[ordered.len() - 1],
        sem: confidence_interval.sem,
        confidence_interval,
        bootstrap_confidence_interval,
    }
}

/// Tukey fences `(q1 - 1.5 iqr, q3 + 1.5 iqr)`. `None` below four values.
pub fn iqr_bounds(data: &[f64]) -> Option<(f64, f64)> {
    let clean: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.len() < 4 {
        return None;
    }
    let ordered = sorted(&clean);
    let q1 = percentile(&ordered, 25.0);
    let q3 = percentile(&ordered, 75.0);
    let iqr = q3 - q1;
    Some((q1 - 1.5 * iqr, q3 + 1.5 * iqr))
}

/// Least-squares fit of `ys` against `0, 1, 2, ...`.
pub fn linear_trend(ys: &[f64]) -> LinearTrend {
    let n = ys.len();
    if n < 2 {
        return LinearTrend {
            slope: 0.0,
            intercept: ys.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
        };
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mx = mean(&xs);
    let my = mean(ys);
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let syy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();

    let slope = sxy / sxx;
    let r_squared = if syy > 0.0 { (sxy * sxy) / (sxx * syy) } else { 0.0 };
    LinearTrend {
        slope,
        intercept: my - slope * mx,
        r_squared,
    }
}

fn group_thousands(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*}", precision, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 && formatted_is_nonzero(&grouped, frac_part.as_deref()) {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

fn formatted_is_nonzero(int_part: &str, frac: Option<&str>) -> bool {
    int_part.chars().chain(frac.unwrap_or_default().chars()).any(|c| c.is_ascii_digit() && c != '0')
}

fn level_percent(confidence_level: f64) -> u32 {
    (confidence_level * 100.0).round() as u32
}

/// `mean [lower, upper] unit (95% ДИ)` with thousands separators.
pub fn format_confidence_interval(ci: &ConfidenceInterval, unit: &str, precision: usize) -> String {
    format!(
        "{} [{}, {}] {} ({}% ДИ)",
        group_thousands(ci.mean, precision),
        group_thousands(ci.ci_lower, precision),
        group_thousands(ci.ci_upper, precision),
        unit,
        level_percent(ci.confidence_level)
    )
}

/// `12.50% [10.10%, 14.90%] (95% ДИ)`
pub fn format_proportion_confidence_interval(ci: &ProportionInterval, precision: usize) -> String {
    format!(
        "{:.p$}% [{:.p$}%, {:.p$}%] ({}% ДИ)",
        ci.percentage,
        ci.ci_lower,
        ci.ci_upper,
        level_percent(ci.confidence_level),
        p = precision
    )
}

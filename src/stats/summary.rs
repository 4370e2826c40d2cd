//! Descriptive statistics, normal fit, and goodness-of-fit for a sample of
//! draw totals against one observed real-world total.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::EngineError;
use crate::stats::histogram::Histogram;

/// Fitted-normal parameters plus the KS distance of the fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub mu: f64,
    /// Maximum-likelihood standard deviation (divide by n).
    pub sigma_mle: f64,
    /// Sample standard deviation with Bessel's correction (divide by n - 1).
    pub sigma_sample: f64,
    pub ks_distance: f64,
}

/// The full metric set returned to the caller. Key names are the wire
/// contract; do not rename fields without the serde attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub samples: u64,
    pub obs_total_draws: u64,
    pub mean_total_draws: f64,
    pub median_total_draws: f64,
    pub std_total_draws: f64,
    #[serde(rename = "percentile_rank_of_obs_%")]
    pub percentile_rank_of_obs: f64,
    pub normal_fit_mu: f64,
    pub normal_fit_sigma_mle: f64,
    pub normal_fit_sigma_sample: f64,
    pub ks_distance: f64,
    pub normal_pdf_at_obs: f64,
    pub hist_density_at_obs: f64,
    pub hist_bin_width: f64,
    pub theoretical_percentile: f64,
}

/// Fit a normal to the sample and measure the fit.
///
/// Fails with `InsufficientSamples` when n < 2 (sample standard deviation is
/// undefined) or when the sample has zero variance (no meaningful normal
/// fit; happens for degenerate tables where every draw succeeds).
pub fn fit_normal(samples: &[u64]) -> Result<FitResult, EngineError> {
    let n = samples.len();
    if n < 2 {
        return Err(EngineError::InsufficientSamples(format!(
            "need at least 2 samples for a standard deviation, got {n}"
        )));
    }

    let mean = samples.iter().map(|s| *s as f64).sum::<f64>() / n as f64;
    let sq_dev_sum: f64 = samples
        .iter()
        .map(|s| {
            let d = *s as f64 - mean;
            d * d
        })
        .sum();
    let sigma_mle = (sq_dev_sum / n as f64).sqrt();
    let sigma_sample = (sq_dev_sum / (n - 1) as f64).sqrt();

    if sigma_mle <= 0.0 {
        return Err(EngineError::InsufficientSamples(
            "samples have zero variance; increase N_SIMS or GOAL".to_string(),
        ));
    }

    let normal = Normal::new(mean, sigma_mle)
        .map_err(|err| EngineError::InsufficientSamples(err.to_string()))?;
    let ks_distance = ks_statistic(samples, &normal);

    Ok(FitResult {
        mu: mean,
        sigma_mle,
        sigma_sample,
        ks_distance,
    })
}

/// Kolmogorov-Smirnov statistic of the sample ECDF against `normal`.
/// Evaluates both sides of every jump of the step function.
fn ks_statistic(samples: &[u64], normal: &Normal) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let n = sorted.len() as f64;

    let mut supremum = 0.0f64;
    for (i, value) in sorted.iter().enumerate() {
        let cdf = normal.cdf(*value as f64);
        let below = i as f64 / n;
        let above = (i + 1) as f64 / n;
        supremum = supremum.max((above - cdf).abs()).max((cdf - below).abs());
    }
    supremum
}

/// Compute the full [SummaryReport] for a sample set.
pub fn summarize(samples: &[u64], obs_total: u64, bins: usize) -> Result<SummaryReport, EngineError> {
    let fit = fit_normal(samples)?;
    Ok(summarize_with_fit(samples, obs_total, bins, &fit))
}

/// [summarize] with a precomputed fit, so the pipeline fits once and shares
/// the result with the renderer.
pub fn summarize_with_fit(
    samples: &[u64],
    obs_total: u64,
    bins: usize,
    fit: &FitResult,
) -> SummaryReport {
    let n = samples.len();
    let obs = obs_total as f64;

    let greater = samples.iter().filter(|s| **s > obs_total).count();
    let percentile_rank = 100.0 * greater as f64 / n as f64;

    // Safe: fit_normal already established sigma_mle > 0.
    let normal = Normal::new(fit.mu, fit.sigma_mle).expect("fitted normal");
    let theoretical_percentile = 100.0 * (1.0 - normal.cdf(obs));

    let hist = Histogram::from_samples(samples, bins);

    SummaryReport {
        samples: n as u64,
        obs_total_draws: obs_total,
        mean_total_draws: fit.mu,
        median_total_draws: median(samples),
        std_total_draws: fit.sigma_sample,
        percentile_rank_of_obs: percentile_rank,
        normal_fit_mu: fit.mu,
        normal_fit_sigma_mle: fit.sigma_mle,
        normal_fit_sigma_sample: fit.sigma_sample,
        ks_distance: fit.ks_distance,
        normal_pdf_at_obs: normal.pdf(obs),
        hist_density_at_obs: hist.density_at(obs, n),
        hist_bin_width: hist.bin_width,
        theoretical_percentile,
    }
}

fn median(samples: &[u64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    }
}

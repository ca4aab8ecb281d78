//! Sample-size planning
//!
//! Per-arm sample sizes for two-arm tests at a given significance level and
//! power, for proportion and continuous metrics.

use serde::{Deserialize, Serialize};

use super::dist::normal_ppf;
use crate::{Error, Result};

/// Planning parameters for a two-arm test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerParams {
    /// Baseline (control) conversion rate or metric mean
    pub baseline: f64,
    /// Minimum detectable effect, absolute
    pub mde: f64,
    /// Significance level (two-sided unless `two_tailed` is false)
    pub alpha: f64,
    /// Target power (1 - beta)
    pub power: f64,
    /// Two-sided test
    pub two_tailed: bool,
}

impl PowerParams {
    /// Conventional defaults: alpha 0.05 (two-sided), power 0.8.
    #[must_use]
    pub const fn new(baseline: f64, mde: f64) -> Self {
        Self {
            baseline,
            mde,
            alpha: 0.05,
            power: 0.8,
            two_tailed: true,
        }
    }

    fn z_alpha(&self) -> f64 {
        if self.two_tailed {
            normal_ppf(1.0 - self.alpha / 2.0)
        } else {
            normal_ppf(1.0 - self.alpha)
        }
    }

    fn z_beta(&self) -> f64 {
        normal_ppf(self.power)
    }
}

/// Per-arm sample size for a two-proportion test.
///
/// Uses the pooled/unpooled hybrid normal-approximation formula
/// (Fleiss): `p1 = baseline`, `p2 = baseline + mde`.
///
/// # Errors
/// `InvalidInput` if `mde` is zero or either rate leaves (0, 1).
pub fn sample_size_proportions(params: &PowerParams) -> Result<u64> {
    let p1 = params.baseline;
    let p2 = params.baseline + params.mde;
    if params.mde == 0.0 {
        return Err(Error::InvalidInput("mde must be non-zero".to_string()));
    }
    if !(0.0..=1.0).contains(&p1) || !(0.0..=1.0).contains(&p2) {
        return Err(Error::InvalidInput(
            "baseline and baseline + mde must lie in [0, 1]".to_string(),
        ));
    }

    let p_bar = (p1 + p2) / 2.0;
    let q_bar = 1.0 - p_bar;
    let num = (params.z_alpha() * (2.0 * p_bar * q_bar).sqrt()
        + params.z_beta() * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt())
    .powi(2);
    let den = (p2 - p1).powi(2);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok((num / den).ceil() as u64)
}

/// Per-arm sample size for a two-means test with common standard
/// deviation `sd`.
///
/// # Errors
/// `InvalidInput` if `sd` is non-positive or `mde` is zero.
pub fn sample_size_means(sd: f64, params: &PowerParams) -> Result<u64> {
    if sd <= 0.0 {
        return Err(Error::InvalidInput("sd must be positive".to_string()));
    }
    if params.mde == 0.0 {
        return Err(Error::InvalidInput("mde must be non-zero".to_string()));
    }

    let num = 2.0 * sd * sd * (params.z_alpha() + params.z_beta()).powi(2);
    let den = params.mde * params.mde;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok((num / den).ceil() as u64)
}

//! A/B test statistics
//!
//! Two readouts over the facts relation: a pooled-SE two-proportion z-test
//! for conversion metrics and a Welch t-test for continuous metrics
//! (revenue, engagement), the latter with optional CUPED adjustment.

use serde::{Deserialize, Serialize};

use super::cuped::{cuped_adjust, sample_variance};
use super::dist::{normal_cdf, normal_ppf, student_t_two_sided};
use crate::{Error, Result};

/// Result of an A/B comparison (arm B vs arm A).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbResult {
    /// Metric family: "proportion" or "mean"
    pub metric: String,
    /// Point estimate of the lift (B minus A)
    pub lift: f64,
    /// Lower bound of the (1 - alpha) confidence interval
    pub ci_low: f64,
    /// Upper bound of the (1 - alpha) confidence interval
    pub ci_high: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Observations in arm A
    pub n_a: u64,
    /// Observations in arm B
    pub n_b: u64,
}

/// Two-proportion z-test with pooled standard error.
///
/// `lift` is `p_b - p_a`; the CI is the Wald interval on the unadjusted
/// difference. With `continuity_correction` the z statistic (not the CI)
/// uses a Yates-style adjustment of `1/n_a + 1/n_b` toward zero.
///
/// # Errors
/// `InvalidInput` if either total is zero or a success count is out of
/// range.
pub fn ab_proportions(
    success_a: u64,
    total_a: u64,
    success_b: u64,
    total_b: u64,
    alpha: f64,
    continuity_correction: bool,
) -> Result<AbResult> {
    if total_a == 0 || total_b == 0 {
        return Err(Error::InvalidInput(
            "total_a and total_b must be positive".to_string(),
        ));
    }
    if success_a > total_a || success_b > total_b {
        return Err(Error::InvalidInput(
            "success counts must be between 0 and total".to_string(),
        ));
    }

    #[allow(clippy::cast_precision_loss)]
    let (sa, ta, sb, tb) = (
        success_a as f64,
        total_a as f64,
        success_b as f64,
        total_b as f64,
    );
    let p_a = sa / ta;
    let p_b = sb / tb;
    let diff = p_b - p_a;

    let p_pool = (sa + sb) / (ta + tb);
    let se = (p_pool * (1.0 - p_pool) * (1.0 / ta + 1.0 / tb)).sqrt();

    let adj_diff = if continuity_correction && diff != 0.0 {
        diff - diff.signum() * (1.0 / ta + 1.0 / tb)
    } else {
        diff
    };

    let z = normal_ppf(1.0 - alpha / 2.0);
    let p_value = if se > 0.0 {
        let z_stat = adj_diff / se;
        2.0 * (1.0 - normal_cdf(z_stat.abs()))
    } else {
        1.0
    };

    Ok(AbResult {
        metric: "proportion".to_string(),
        lift: diff,
        ci_low: diff - z * se,
        ci_high: diff + z * se,
        p_value,
        n_a: total_a,
        n_b: total_b,
    })
}

/// Welch t-test on means, optionally CUPED-adjusted.
///
/// When both covariate slices are supplied, each arm is CUPED-adjusted
/// against its own covariate before testing. The p-value comes from
/// Welch-Satterthwaite degrees of freedom; the CI uses the normal
/// approximation on the unpooled standard error.
///
/// # Errors
/// `InvalidInput` if either arm has fewer than two observations or a
/// covariate slice does not pair with its arm.
pub fn ab_means(
    y_a: &[f64],
    y_b: &[f64],
    alpha: f64,
    cuped_theta_a: Option<&[f64]>,
    cuped_theta_b: Option<&[f64]>,
) -> Result<AbResult> {
    if y_a.len() < 2 || y_b.len() < 2 {
        return Err(Error::InvalidInput(
            "both groups must have at least 2 observations".to_string(),
        ));
    }

    let (ya, yb) = match (cuped_theta_a, cuped_theta_b) {
        (Some(ta), Some(tb)) => {
            if ta.len() != y_a.len() || tb.len() != y_b.len() {
                return Err(Error::InvalidInput(
                    "CUPED covariates must pair 1:1 with their arm".to_string(),
                ));
            }
            (cuped_adjust(y_a, ta).0, cuped_adjust(y_b, tb).0)
        }
        _ => (y_a.to_vec(), y_b.to_vec()),
    };

    #[allow(clippy::cast_precision_loss)]
    let (na, nb) = (ya.len() as f64, yb.len() as f64);
    let mean_a = ya.iter().sum::<f64>() / na;
    let mean_b = yb.iter().sum::<f64>() / nb;
    let diff = mean_b - mean_a;

    let var_a = sample_variance(&ya);
    let var_b = sample_variance(&yb);
    let se = (var_a / na + var_b / nb).sqrt();

    let p_value = if se > 0.0 {
        let t_stat = diff / se;
        let df = (var_a / na + var_b / nb).powi(2)
            / ((var_a / na).powi(2) / (na - 1.0) + (var_b / nb).powi(2) / (nb - 1.0));
        student_t_two_sided(t_stat, df)
    } else {
        1.0
    };

    let z = normal_ppf(1.0 - alpha / 2.0);
    Ok(AbResult {
        metric: "mean".to_string(),
        lift: diff,
        ci_low: diff - z * se,
        ci_high: diff + z * se,
        p_value,
        n_a: ya.len() as u64,
        n_b: yb.len() as u64,
    })
}

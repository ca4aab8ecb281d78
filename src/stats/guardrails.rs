//! Experiment guardrails
//!
//! Checks that must pass before a readout is trusted: sample-ratio
//! mismatch (SRM) on arm counts, and invariance of pre-experiment
//! covariates across arms. Neither check touches the outcome metric.

use serde::{Deserialize, Serialize};

use super::cuped::sample_variance;
use super::dist::{chi_square_sf, student_t_two_sided};
use crate::{Error, Result};

/// SRM flagging threshold. Deliberately stricter than the usual 0.05 to
/// keep false alarms rare on healthy experiments.
pub const SRM_P_THRESHOLD: f64 = 0.01;

/// Result of a sample-ratio-mismatch check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrmCheck {
    /// Chi-square goodness-of-fit statistic (1 degree of freedom)
    pub chi2: f64,
    /// Survival-function p-value
    pub p_value: f64,
    /// True when `p_value < SRM_P_THRESHOLD`
    pub srm_flag: bool,
}

/// Chi-square goodness-of-fit test of the observed arm counts against the
/// expected split.
///
/// # Errors
/// `InvalidInput` if the expected ratios do not sum to 1 or either count
/// is zero.
pub fn srm_check(n_a: u64, n_b: u64, expected_ratios: (f64, f64)) -> Result<SrmCheck> {
    let (ra, rb) = expected_ratios;
    if (ra + rb - 1.0).abs() > 1e-9 || ra <= 0.0 || rb <= 0.0 {
        return Err(Error::InvalidInput(
            "expected ratios must be positive and sum to 1".to_string(),
        ));
    }
    if n_a == 0 || n_b == 0 {
        return Err(Error::InvalidInput(
            "both arms must have observations".to_string(),
        ));
    }

    #[allow(clippy::cast_precision_loss)]
    let total = (n_a + n_b) as f64;
    #[allow(clippy::cast_precision_loss)]
    let observed = [n_a as f64, n_b as f64];
    let expected = [ra * total, rb * total];

    let chi2: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(o, e)| (o - e) * (o - e) / e)
        .sum();
    let p_value = chi_square_sf(chi2, 1);

    Ok(SrmCheck {
        chi2,
        p_value,
        srm_flag: p_value < SRM_P_THRESHOLD,
    })
}

/// Result of an invariant-covariate check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvariantCheck {
    /// Welch t statistic
    pub t: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// True when `p_value < alpha`
    pub violation: bool,
}

/// Welch t-test that a pre-experiment covariate is balanced across arms.
///
/// A violation means randomization is suspect: the covariate predates the
/// experiment, so its distribution must not differ by arm.
///
/// # Errors
/// `InvalidInput` if either arm has fewer than two observations.
pub fn invariant_check(x_a: &[f64], x_b: &[f64], alpha: f64) -> Result<InvariantCheck> {
    if x_a.len() < 2 || x_b.len() < 2 {
        return Err(Error::InvalidInput(
            "both arms must have at least 2 observations".to_string(),
        ));
    }

    #[allow(clippy::cast_precision_loss)]
    let (na, nb) = (x_a.len() as f64, x_b.len() as f64);
    let mean_a = x_a.iter().sum::<f64>() / na;
    let mean_b = x_b.iter().sum::<f64>() / nb;
    let var_a = sample_variance(x_a);
    let var_b = sample_variance(x_b);

    let se = (var_a / na + var_b / nb).sqrt();
    let (t, p_value) = if se > 0.0 {
        let t = (mean_a - mean_b) / se;
        let df = (var_a / na + var_b / nb).powi(2)
            / ((var_a / na).powi(2) / (na - 1.0) + (var_b / nb).powi(2) / (nb - 1.0));
        (t, student_t_two_sided(t, df))
    } else {
        (0.0, 1.0)
    };

    Ok(InvariantCheck {
        t,
        p_value,
        violation: p_value < alpha,
    })
}

//! CUPED variance reduction
//!
//! Controlled-experiment Using Pre-Experiment Data (Deng et al. 2013):
//! subtract `c * theta` from the outcome, where `theta` is a pre-experiment
//! covariate and `c = cov(y, theta) / var(theta)`. The treatment effect
//! estimate is unchanged in expectation while its variance shrinks by the
//! squared correlation between outcome and covariate.

/// Mean of a slice. Empty input yields 0.0.
fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// Sample variance (ddof = 1). Fewer than two observations yield 0.0.
#[must_use]
pub fn sample_variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    #[allow(clippy::cast_precision_loss)]
    {
        xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64
    }
}

/// Sample covariance (ddof = 1) of two equal-length slices.
fn sample_covariance(xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    if xs.len() < 2 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);
    #[allow(clippy::cast_precision_loss)]
    {
        xs.iter()
            .zip(ys)
            .map(|(x, y)| (x - mx) * (y - my))
            .sum::<f64>()
            / (xs.len() - 1) as f64
    }
}

/// CUPED-adjust `y` against the pre-experiment covariate `theta`.
///
/// Returns the adjusted series and the regression constant `c`. A
/// zero-variance covariate carries no information: `y` comes back unchanged
/// with `c = 0`.
///
/// # Panics
/// Panics in debug builds if `y` and `theta` differ in length.
#[must_use]
pub fn cuped_adjust(y: &[f64], theta: &[f64]) -> (Vec<f64>, f64) {
    debug_assert_eq!(y.len(), theta.len(), "y and theta must be paired");
    let var = sample_variance(theta);
    if var == 0.0 {
        return (y.to_vec(), 0.0);
    }
    let c = sample_covariance(y, theta) / var;
    let adjusted = y.iter().zip(theta).map(|(yi, ti)| yi - c * ti).collect();
    (adjusted, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_variance_covariate_is_a_no_op() {
        let y = vec![1.0, 2.0, 3.0];
        let theta = vec![5.0, 5.0, 5.0];
        let (adjusted, c) = cuped_adjust(&y, &theta);
        assert_eq!(adjusted, y);
        assert!((c - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_perfectly_correlated_covariate_flattens_y() {
        // y = 2*theta, so c = 2 and the adjusted series is constant (zero).
        let theta = vec![1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = theta.iter().map(|t| 2.0 * t).collect();
        let (adjusted, c) = cuped_adjust(&y, &theta);
        assert!((c - 2.0).abs() < 1e-12);
        assert!(sample_variance(&adjusted) < 1e-20);
    }

    #[test]
    fn test_adjustment_reduces_variance() {
        let theta = vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0];
        let y: Vec<f64> = theta.iter().map(|t| 0.8 * t + 1.0).collect();
        let noisy: Vec<f64> = y
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let (adjusted, _) = cuped_adjust(&noisy, &theta);
        assert!(sample_variance(&adjusted) < sample_variance(&noisy));
    }
}

//! Sequential monitoring
//!
//! Group-sequential early stopping with a Pocock-style constant boundary:
//! the experiment is "looked at" a fixed number of times, each look tests
//! the cumulative two-proportion z statistic against the same critical
//! value, and the first crossing stops the experiment.

use serde::{Deserialize, Serialize};

use super::dist::normal_ppf;
use crate::{Error, Result};

/// Cumulative `(successes, total)` for one arm at one look.
pub type LookCounts = (u64, u64);

/// Decision taken at one interim look.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookDecision {
    /// 1-based look index
    pub look: u32,
    /// Absolute cumulative z statistic at this look
    pub z: f64,
    /// Critical boundary for this look
    pub boundary: f64,
    /// True when `z` crossed the boundary (experiment stops)
    pub stop: bool,
}

/// Pocock-style constant boundaries for `looks` interim analyses.
///
/// Uses the `ln(1 + looks)` alpha-inflation approximation: every look gets
/// the same critical value `ppf(1 - alpha / (2 ln(1 + looks)))`.
///
/// # Errors
/// `InvalidInput` if `looks` is zero or `alpha` leaves (0, 1).
pub fn pocock_boundaries(alpha: f64, looks: u32) -> Result<Vec<f64>> {
    if looks == 0 {
        return Err(Error::InvalidInput("looks must be positive".to_string()));
    }
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 {
        return Err(Error::InvalidInput("alpha must lie in (0, 1)".to_string()));
    }
    let c = normal_ppf(1.0 - alpha / (2.0 * f64::from(1 + looks).ln()));
    Ok(vec![c; looks as usize])
}

/// Two-proportion z statistic with pooled standard error.
///
/// Returns 0.0 when the pooled SE degenerates (all successes or all
/// failures).
///
/// # Errors
/// `InvalidInput` if either total is zero.
pub fn z_stat_proportions(
    success_a: u64,
    total_a: u64,
    success_b: u64,
    total_b: u64,
) -> Result<f64> {
    if total_a == 0 || total_b == 0 {
        return Err(Error::InvalidInput(
            "totals must be positive at every look".to_string(),
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
    let p_pool = (sa + sb) / (ta + tb);
    let se = (p_pool * (1.0 - p_pool) * (1.0 / ta + 1.0 / tb)).sqrt();
    if se > 0.0 {
        Ok((p_b - p_a) / se)
    } else {
        Ok(0.0)
    }
}

/// Monitor two cumulative count streams across up to `looks` interim
/// analyses, stopping at the first boundary crossing.
///
/// `stream_a` and `stream_b` hold cumulative `(successes, total)` per
/// look; only the first `looks` entries are consumed. The returned vector
/// ends either at the stopping look or after the final look.
///
/// # Errors
/// `InvalidInput` if either stream is shorter than `looks`, or on the
/// first look with a zero total.
pub fn sequential_monitor(
    stream_a: &[LookCounts],
    stream_b: &[LookCounts],
    looks: u32,
    alpha: f64,
) -> Result<Vec<LookDecision>> {
    let boundaries = pocock_boundaries(alpha, looks)?;
    if stream_a.len() < looks as usize || stream_b.len() < looks as usize {
        return Err(Error::InvalidInput(format!(
            "streams must cover all {looks} looks"
        )));
    }

    let mut decisions = Vec::with_capacity(looks as usize);
    for (i, boundary) in boundaries.iter().enumerate() {
        let (sa, ta) = stream_a[i];
        let (sb, tb) = stream_b[i];
        let z = z_stat_proportions(sa, ta, sb, tb)?.abs();
        let stop = z > *boundary;
        #[allow(clippy::cast_possible_truncation)]
        decisions.push(LookDecision {
            look: (i + 1) as u32,
            z,
            boundary: *boundary,
            stop,
        });
        if stop {
            break;
        }
    }
    Ok(decisions)
}

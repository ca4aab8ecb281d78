//! Synthetic seed generation
//!
//! Produces raw (loosely typed) assignment and outcome rows for a set of
//! experiment scenarios, each with a known "true" effect, so the whole
//! pipeline — normalization, facts, readouts — can be exercised against
//! ground truth. Rows come out exactly as a CSV seed would: numeric ids as
//! strings, ISO-8601 Zulu timestamps, 0/1 conversions.
//!
//! Sampling uses `rand` uniforms with in-crate transforms: Marsaglia polar
//! for normals, Marsaglia–Tsang for the gamma engagement covariate.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::cast::RawRow;

/// Which outcome families a scenario moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Conversion only
    Proportion,
    /// Revenue only
    Revenue,
    /// Conversion and revenue
    Both,
}

/// One experiment scenario with its true effects.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Experiment identifier
    pub experiment_id: String,
    /// Enrollment start
    pub start: DateTime<Utc>,
    /// Outcome families the scenario moves
    pub kind: ScenarioKind,
    /// Control-arm conversion rate
    pub baseline_conv: f64,
    /// Absolute conversion lift in treatment
    pub abs_lift_conv: f64,
    /// Mean revenue for control-arm converters
    pub baseline_revenue_mean: f64,
    /// Revenue standard deviation
    pub revenue_sd: f64,
    /// Relative revenue uplift in treatment
    pub rev_uplift_rel: f64,
    /// How predictive the pre-experiment covariate is (higher = stronger
    /// CUPED benefit)
    pub cuped_r2: f64,
    /// Randomization jitter to simulate mild assignment imbalance
    pub srm_jitter: f64,
    /// Human-readable description
    pub description: String,
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// The three built-in scenarios: a paywall test with both effects, an
/// activation test with conversion only, and a deliberately neutral
/// pricing test.
#[must_use]
pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            experiment_id: "exp_paywall_A".to_string(),
            start: ts("2025-03-01T09:00:00Z"),
            kind: ScenarioKind::Both,
            baseline_conv: 0.05,
            abs_lift_conv: 0.008,
            baseline_revenue_mean: 18.0,
            revenue_sd: 6.0,
            rev_uplift_rel: 0.08,
            cuped_r2: 0.25,
            srm_jitter: 0.01,
            description: "Paywall copy and plan messaging test targeting conversion and ARPU."
                .to_string(),
        },
        Scenario {
            experiment_id: "exp_onboarding_B".to_string(),
            start: ts("2025-04-05T10:00:00Z"),
            kind: ScenarioKind::Proportion,
            baseline_conv: 0.12,
            abs_lift_conv: 0.015,
            baseline_revenue_mean: 0.0,
            revenue_sd: 0.0,
            rev_uplift_rel: 0.0,
            cuped_r2: 0.15,
            srm_jitter: 0.0,
            description: "Onboarding coachmarks and guided setup aiming to increase activation."
                .to_string(),
        },
        Scenario {
            experiment_id: "exp_pricing_C".to_string(),
            start: ts("2025-05-01T11:00:00Z"),
            kind: ScenarioKind::Both,
            baseline_conv: 0.07,
            abs_lift_conv: 0.0,
            baseline_revenue_mean: 22.0,
            revenue_sd: 8.0,
            rev_uplift_rel: 0.0,
            cuped_r2: 0.30,
            srm_jitter: 0.02,
            description: "Pricing page layout variants; expected neutral impact for realism."
                .to_string(),
        },
    ]
}

/// Raw seed rows for a set of scenarios.
#[derive(Debug, Clone, Default)]
pub struct SeedBundle {
    /// Raw rows for the `assignments_seed` relation
    pub assignments: Vec<RawRow>,
    /// Raw rows for the `outcomes_seed` relation
    pub outcomes: Vec<RawRow>,
}

/// Standard normal via Marsaglia polar.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    loop {
        let u: f64 = rng.gen_range(-1.0..1.0);
        let v: f64 = rng.gen_range(-1.0..1.0);
        let s = u * u + v * v;
        if s > 0.0 && s < 1.0 {
            return u * (-2.0 * s.ln() / s).sqrt();
        }
    }
}

fn sample_normal(rng: &mut StdRng, mean: f64, sd: f64) -> f64 {
    mean + sd * sample_standard_normal(rng)
}

/// Gamma(shape, scale) for shape >= 1 via Marsaglia–Tsang squeeze.
fn sample_gamma(rng: &mut StdRng, shape: f64, scale: f64) -> f64 {
    debug_assert!(shape >= 1.0);
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = sample_standard_normal(rng);
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u: f64 = rng.gen();
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v * scale;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v * scale;
        }
    }
}

fn iso_ts(base: DateTime<Utc>, offset_secs: i64, jitter: i64) -> String {
    (base + Duration::seconds(offset_secs + jitter))
        .to_rfc3339()
        .replace("+00:00", "Z")
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Generate raw assignment and outcome rows for one scenario.
///
/// `user_id_offset` keeps ids disjoint across scenarios. Every generated
/// user gets exactly one assignment and one outcome row (the join fans out
/// only when upstream data is dirty, never from this generator).
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn generate_scenario(
    scenario: &Scenario,
    n: usize,
    user_id_offset: i64,
    rng: &mut StdRng,
) -> SeedBundle {
    let treat_share = (0.5 + rng.gen_range(-1.0..1.0) * scenario.srm_jitter).clamp(0.45, 0.55);

    let is_treat: Vec<bool> = (0..n).map(|_| rng.gen::<f64>() < treat_share).collect();

    // Pre-experiment covariate: gamma engagement plus noise scaled by how
    // much predictive power the scenario wants CUPED to have.
    let pre_metric: Vec<f64> = (0..n)
        .map(|_| {
            let latent = sample_gamma(rng, 2.0, 5.0);
            let noise = sample_normal(rng, 0.0, (1.0 - scenario.cuped_r2) * 3.0);
            round2((latent + noise).max(0.0))
        })
        .collect();
    let pre_mean = pre_metric.iter().sum::<f64>() / n.max(1) as f64;

    let mut assignments = Vec::with_capacity(n);
    let mut outcomes = Vec::with_capacity(n);

    for i in 0..n {
        let user_id = user_id_offset + i as i64 + 1;
        let variant = if is_treat[i] { "treatment" } else { "control" };

        assignments.push(raw_row(json!({
            "user_id": user_id.to_string(),
            "experiment_id": scenario.experiment_id,
            "variant": variant,
            "assigned_at": iso_ts(scenario.start, i as i64, rng.gen_range(0..300)),
        })));

        // Covariate shifts the conversion logit so CUPED has signal.
        let logit = (scenario.baseline_conv / (1.0 - scenario.baseline_conv)).ln()
            + 0.05 * (pre_metric[i] - pre_mean);
        let p_control = 1.0 / (1.0 + (-logit).exp());
        let p = if is_treat[i] {
            (p_control + scenario.abs_lift_conv).clamp(0.0001, 0.9999)
        } else {
            p_control
        };
        let converted = matches!(scenario.kind, ScenarioKind::Proportion | ScenarioKind::Both)
            && rng.gen::<f64>() < p;

        let revenue = if converted
            && matches!(scenario.kind, ScenarioKind::Revenue | ScenarioKind::Both)
        {
            let mean_control =
                scenario.baseline_revenue_mean * (1.0 + 0.01 * (pre_metric[i] - pre_mean));
            let mean = if is_treat[i] {
                mean_control * (1.0 + scenario.rev_uplift_rel)
            } else {
                mean_control
            };
            round2(sample_normal(rng, mean, scenario.revenue_sd).max(0.0))
        } else {
            0.0
        };

        outcomes.push(raw_row(json!({
            "user_id": user_id.to_string(),
            "experiment_id": scenario.experiment_id,
            "conversion": if converted { "1" } else { "0" },
            "revenue": format!("{revenue:.2}"),
            "pre_metric": format!("{:.2}", pre_metric[i]),
            "event_ts": iso_ts(
                scenario.start + Duration::hours(1),
                i as i64,
                rng.gen_range(0..3600)
            ),
        })));
    }

    SeedBundle {
        assignments,
        outcomes,
    }
}

/// Generate seeds for all `scenarios`, `rows_per_experiment` users each,
/// deterministically from `seed`. Rows are shuffled across experiments the
/// way a real export interleaves them.
#[must_use]
pub fn generate_seeds(scenarios: &[Scenario], rows_per_experiment: usize, seed: u64) -> SeedBundle {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bundle = SeedBundle::default();

    for (idx, scenario) in scenarios.iter().enumerate() {
        #[allow(clippy::cast_possible_wrap)]
        let offset = (idx as i64) * 1_000_000;
        let part = generate_scenario(scenario, rows_per_experiment, offset, &mut rng);
        bundle.assignments.extend(part.assignments);
        bundle.outcomes.extend(part.outcomes);
    }

    bundle.assignments.shuffle(&mut rng);
    bundle.outcomes.shuffle(&mut rng);
    bundle
}

fn raw_row(v: Value) -> RawRow {
    match v {
        Value::Object(map) => map,
        _ => RawRow::new(),
    }
}

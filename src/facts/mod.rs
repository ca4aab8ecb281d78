//! Experiment facts pipeline
//!
//! Three pure, synchronous stages over in-memory rows:
//!
//! ```text
//! assignments_seed ──> Assignment Normalizer ──> assignments ─┐
//!                                                             ├──> Fact Builder ──> experiment_facts
//! outcomes_seed ─────> Outcome Normalizer ────> outcomes ─────┘
//! ```
//!
//! The normalizers cast raw rows to canonical records (one output row per
//! input row, order preserved, no side effects). The fact builder is a left
//! outer equi-join on `(user_id, experiment_id)`: every assignment survives,
//! unmatched outcome fields come out as `None`, and outcome key collisions
//! fan out one fact row per match.
//!
//! ## Usage
//!
//! ```rust
//! use liftlab::facts::{build_facts, normalize_assignments, normalize_outcomes};
//! use serde_json::json;
//!
//! let raw_assignment = json!({
//!     "user_id": "1", "experiment_id": "exp_paywall_A",
//!     "variant": "Control", "assigned_at": "2025-03-01T09:00:00Z"
//! });
//! let assignments = normalize_assignments([raw_assignment.as_object().unwrap()])?;
//! let outcomes = normalize_outcomes([])?;
//!
//! let facts = build_facts(&assignments, &outcomes);
//! assert_eq!(facts.len(), 1);
//! assert_eq!(facts[0].variant.as_deref(), Some("control"));
//! assert!(facts[0].conversion.is_none());
//! # Ok::<(), liftlab::Error>(())
//! ```

mod assignment;
mod builder;
mod fact;
mod outcome;

pub use assignment::{normalize_assignments, Assignment};
pub use builder::build_facts;
pub use fact::{sort_by_key, ExperimentFact};
pub use outcome::{normalize_outcomes, Outcome};

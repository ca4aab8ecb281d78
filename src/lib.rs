//! # liftlab: Embedded A/B Experiment Analytics
//!
//! liftlab turns raw experiment seeds into a queryable set of canonical
//! relations and provides the statistical readouts on top of them.
//!
//! ## Pipeline
//!
//! ```text
//! assignments_seed ──> normalize ──> assignments ─┐
//!                                                 ├──> left join ──> experiment_facts
//! outcomes_seed ─────> normalize ──> outcomes ────┘
//! ```
//!
//! Normalization casts every loosely-typed source field to its declared
//! canonical type (failing hard on mismatches), the fact builder
//! left-joins assignments to outcomes on `(user_id, experiment_id)`, and
//! the [`store::RelationStore`] publishes all three relations as Arrow
//! batches — atomically, so a cast failure never exposes partial facts.
//!
//! ## Example
//!
//! ```rust
//! use liftlab::seedgen::{default_scenarios, generate_seeds};
//! use liftlab::store::{RelationStore, EXPERIMENT_FACTS};
//!
//! let seeds = generate_seeds(&default_scenarios(), 100, 42);
//!
//! let mut store = RelationStore::new();
//! let summary = store.materialize(&seeds.assignments, &seeds.outcomes)?;
//! assert_eq!(summary.facts, 300);
//!
//! let facts = store.relation(EXPERIMENT_FACTS).unwrap();
//! assert_eq!(facts.num_rows(), 300);
//! # Ok::<(), liftlab::Error>(())
//! ```
//!
//! The [`stats`] module holds everything downstream of the facts: A/B
//! tests (with CUPED), power analysis, SRM/invariant guardrails, and
//! sequential monitoring.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cast;
pub mod error;
pub mod facts;
pub mod seed;
pub mod seedgen;
pub mod stats;
pub mod store;

pub use error::{Error, Result};

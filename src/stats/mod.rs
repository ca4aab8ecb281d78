//! Statistical readouts over experiment facts
//!
//! Everything downstream of the `experiment_facts` relation: the A/B tests
//! themselves, CUPED variance reduction, sample-size planning, guardrail
//! checks, and sequential monitoring. All routines are pure functions over
//! slices; slicing facts into per-arm series is the caller's concern.

pub mod ab;
pub mod cuped;
pub mod dist;
pub mod guardrails;
pub mod power;
pub mod sequential;

pub use ab::{ab_means, ab_proportions, AbResult};
pub use cuped::cuped_adjust;
pub use guardrails::{invariant_check, srm_check, InvariantCheck, SrmCheck};
pub use power::{sample_size_means, sample_size_proportions, PowerParams};
pub use sequential::{pocock_boundaries, sequential_monitor, LookDecision};

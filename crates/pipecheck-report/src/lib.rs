//! Report aggregation.
//!
//! [`run_batch`] evaluates a list of experiments one at a time, isolating
//! per-experiment failures, and collects an [`ExperimentOutcome`] for each.
//! The resulting [`BatchReport`] renders the three patch files consumed by
//! the portal's bulk patch tooling.

pub mod batch;
pub mod outcome;
pub mod patch;

pub use batch::{BatchReport, BatchSummary, run_batch};
pub use outcome::{Disposition, Evaluation, ExperimentOutcome};
pub use patch::{PatchError, PatchFileNames, WrittenPatches, write_patches};

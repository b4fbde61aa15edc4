//! # Pipecheck Kernel
//!
//! Pipeline-output compliance checking: for one experiment, pick the single
//! canonical analysis among competing runs, model the outputs it should have
//! produced, and diff that model against what it actually produced.
//!
//! ## Architecture
//!
//! ```text
//! MetadataSource        ← fetch + decode typed records (experiment, analysis, file)
//!     │
//! ExperimentFacts       ← replicate count, pairs, target class, control, redaction
//!     │
//! AssayPolicy           ← pipelines, ranking comparator, expected-output rule-set
//!     │
//! rank_analyses         ← canonical analysis + archival candidates
//!     │
//! evaluate_experiment   ← expected vs. observed → ordered discrepancies
//! ```

pub mod assay;
pub mod discrepancy;
pub mod error;
pub mod evaluate;
pub mod expectation;
pub mod facts;
pub mod rank;
pub mod record;
pub mod source;

pub use assay::{Assay, AssayPolicy, PolicyTable, default_policy, policy_for};
pub use discrepancy::Discrepancy;
pub use error::{CheckError, SourceError};
pub use evaluate::{AuditTally, ExperimentReport, evaluate_experiment};
pub use expectation::{
    Expectation, KeyMode, Observed, OutputCounts, OutputKey, PreferredDefaultRule,
    PreferredDefaults,
};
pub use facts::{ExperimentFacts, Organism, TargetClass, rep_pair_count};
pub use rank::{AnalysisOrder, MultiKeyOrder, Ranking, RecencyOrder, rank_analyses};
pub use record::{
    Analysis, Experiment, FileRecord, Link, RecordStatus, Target, normalize_identifier,
};
pub use source::{MetadataSource, RecordStore};

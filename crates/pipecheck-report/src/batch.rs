//! Sequential batch evaluation.

use crate::outcome::{Disposition, ExperimentOutcome};
use pipecheck_kernel::{Assay, AssayPolicy, MetadataSource, evaluate_experiment, normalize_identifier};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Outcomes for one run, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub assay: Assay,
    pub outcomes: Vec<ExperimentOutcome>,
}

/// Disposition counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub release_ready: usize,
    pub post_pipeline_review: usize,
    pub not_compliant: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.release_ready + self.post_pipeline_review + self.not_compliant + self.failed
    }
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for outcome in &self.outcomes {
            match outcome.disposition {
                Disposition::ReleaseReady => summary.release_ready += 1,
                Disposition::PostPipelineReview => summary.post_pipeline_review += 1,
                Disposition::NotCompliant => summary.not_compliant += 1,
                Disposition::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Accessions whose disposition is release ready.
    pub fn release_ready(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == Disposition::ReleaseReady)
            .map(|o| o.accession.as_str())
            .collect()
    }

    /// `(accession, internal status)` for every experiment that passed.
    pub fn internal_statuses(&self) -> Vec<(&str, &'static str)> {
        self.outcomes
            .iter()
            .filter_map(|o| Some((o.accession.as_str(), o.disposition.internal_status()?)))
            .collect()
    }

    /// Non-canonical released analyses, deduplicated, in discovery order.
    pub fn archival(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.outcomes
            .iter()
            .flat_map(|o| o.archival())
            .map(String::as_str)
            .filter(|accession| seen.insert(*accession))
            .collect()
    }

    /// Whether anything is short of release ready.
    pub fn has_unready(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.disposition != Disposition::ReleaseReady)
    }
}

/// Evaluate each experiment in turn. A failure is recorded against its own
/// accession and the batch moves on. Repeated accessions are evaluated once.
/// `on_outcome` sees every outcome as soon as it is produced.
pub fn run_batch<I, S>(
    source: &dyn MetadataSource,
    policy: &dyn AssayPolicy,
    accessions: I,
    mut on_outcome: impl FnMut(&ExperimentOutcome),
) -> BatchReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut outcomes = Vec::new();

    for raw in accessions {
        let accession = normalize_identifier(raw.as_ref());
        if accession.is_empty() || !seen.insert(accession.clone()) {
            continue;
        }

        let outcome = match evaluate_experiment(source, policy, &accession) {
            Ok(report) => ExperimentOutcome::from_report(report),
            Err(err) => {
                warn!(
                    experiment = %accession,
                    class = err.failure_class(),
                    error = %err,
                    "evaluation failed"
                );
                ExperimentOutcome::from_error(accession, &err)
            }
        };
        on_outcome(&outcome);
        outcomes.push(outcome);
    }

    let report = BatchReport {
        assay: policy.assay(),
        outcomes,
    };
    let summary = report.summary();
    info!(
        assay = %report.assay,
        total = summary.total(),
        release_ready = summary.release_ready,
        review = summary.post_pipeline_review,
        not_compliant = summary.not_compliant,
        failed = summary.failed,
        "batch complete"
    );
    report
}

//! Per-experiment outcome and disposition.

use pipecheck_kernel::{CheckError, ExperimentReport};
use serde::Serialize;
use std::fmt;

/// Where an experiment lands after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Disposition {
    /// Compliant with clean audits.
    #[serde(rename = "release ready")]
    ReleaseReady,
    /// Compliant but carrying ERROR or NOT_COMPLIANT audits.
    #[serde(rename = "post-pipeline review")]
    PostPipelineReview,
    #[serde(rename = "not compliant")]
    NotCompliant,
    /// Evaluation could not complete.
    #[serde(rename = "failed")]
    Failed,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReleaseReady => "release ready",
            Self::PostPipelineReview => "post-pipeline review",
            Self::NotCompliant => "not compliant",
            Self::Failed => "failed",
        }
    }

    /// The internal status to patch onto the experiment, if any.
    pub fn internal_status(self) -> Option<&'static str> {
        match self {
            Self::ReleaseReady | Self::PostPipelineReview => Some(self.as_str()),
            Self::NotCompliant | Self::Failed => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "evaluation", rename_all = "snake_case")]
pub enum Evaluation {
    Completed { report: Box<ExperimentReport> },
    Failed { class: &'static str, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOutcome {
    pub accession: String,
    pub disposition: Disposition,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

impl ExperimentOutcome {
    pub fn from_report(report: ExperimentReport) -> Self {
        let disposition = if !report.is_compliant() {
            Disposition::NotCompliant
        } else if report.audits.is_clean() {
            Disposition::ReleaseReady
        } else {
            Disposition::PostPipelineReview
        };
        Self {
            accession: report.accession.clone(),
            disposition,
            evaluation: Evaluation::Completed {
                report: Box::new(report),
            },
        }
    }

    pub fn from_error(accession: impl Into<String>, err: &CheckError) -> Self {
        Self {
            accession: accession.into(),
            disposition: Disposition::Failed,
            evaluation: Evaluation::Failed {
                class: err.failure_class(),
                message: err.to_string(),
            },
        }
    }

    pub fn report(&self) -> Option<&ExperimentReport> {
        match &self.evaluation {
            Evaluation::Completed { report } => Some(&**report),
            Evaluation::Failed { .. } => None,
        }
    }

    /// Analyses to archive on behalf of this experiment.
    pub fn archival(&self) -> &[String] {
        match self.report() {
            Some(report) if report.ranking.canonical.is_some() => &report.ranking.archival,
            _ => &[],
        }
    }

    /// One tab-separated summary line: accession, disposition, then the
    /// discrepancy reasons or the failure.
    pub fn summary_line(&self) -> String {
        let mut line = format!("{}\t{}", self.accession, self.disposition);
        match &self.evaluation {
            Evaluation::Completed { report } => {
                if let Some(canonical) = report.ranking.canonical_accession() {
                    line.push('\t');
                    line.push_str(canonical);
                }
                let reasons = report.reasons();
                if !reasons.is_empty() {
                    line.push('\t');
                    line.push_str(&reasons.join(", "));
                }
                if !report.audits.is_clean() {
                    line.push_str(&format!(
                        "\taudits ERROR={} NOT_COMPLIANT={}",
                        report.audits.error, report.audits.not_compliant
                    ));
                }
            }
            Evaluation::Failed { class, message } => {
                line.push_str(&format!("\t{class}: {message}"));
            }
        }
        line
    }
}

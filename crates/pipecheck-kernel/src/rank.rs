//! Canonical ("latest") analysis selection.
//!
//! Ranking is a pluggable comparator ([`AnalysisOrder`]). Two policies are
//! provided:
//!
//! - [`MultiKeyOrder`]: processing lab, award generation, assembly,
//!   genome annotation, pipeline version, creation time.
//! - [`RecencyOrder`]: in-progress status, generation match, creation time.
//!
//! [`rank_analyses`] applies an order to the analyses whose pipelines match
//! an assay, picks the single canonical analysis, and lists every other
//! released match for archival.

use crate::record::{Analysis, RecordStatus};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Orders analyses by preference. `Ordering::Greater` means `a` is preferred.
pub trait AnalysisOrder {
    /// Policy name (for reports).
    fn name(&self) -> &'static str;

    fn compare(&self, a: &Analysis, b: &Analysis) -> Ordering;
}

/// Dotted pipeline version, compared component-wise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PipelineVersion(Vec<u64>);

impl PipelineVersion {
    /// Parses `1.2.3`, `v1.10` and similar. Non-numeric suffixes inside a
    /// component are ignored; a component with no leading digits ends the
    /// version.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches(['v', 'V']);
        let mut parts = Vec::new();
        for component in trimmed.split('.') {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            match digits.parse::<u64>() {
                Ok(value) => parts.push(value),
                Err(_) => break,
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }
}

/// Fixed total orders used by [`MultiKeyOrder`], most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RankingPreferences {
    canonical_lab: String,
    award_rfas: Vec<String>,
    assemblies: Vec<String>,
    genome_annotations: Vec<String>,
}

impl Default for RankingPreferences {
    fn default() -> Self {
        Self {
            canonical_lab: "encode-processing-pipeline".to_string(),
            award_rfas: to_strings(&["ENCODE4", "ENCODE3", "ENCODE2", "ENCODE2-Mouse", "ENCODE"]),
            assemblies: to_strings(&["GRCh38", "mm10", "hg19", "mm9"]),
            genome_annotations: to_strings(&[
                "V29", "M21", "V24", "M14", "V22", "V19", "M4", "M2",
            ]),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Rank of `value` in `order`: highest for the first entry, 0 when absent.
fn preference_rank(order: &[String], value: Option<&str>) -> usize {
    value
        .and_then(|v| order.iter().position(|entry| entry == v))
        .map_or(0, |idx| order.len() - idx)
}

/// The six-key tuple compared by [`MultiKeyOrder`], most significant first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MultiKey {
    pub canonical_lab: bool,
    pub award_rank: usize,
    pub assembly_rank: usize,
    pub annotation_rank: usize,
    pub pipeline_version: Option<PipelineVersion>,
    pub date_created: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Default)]
pub struct MultiKeyOrder {
    preferences: RankingPreferences,
}

impl MultiKeyOrder {
    pub fn key(&self, analysis: &Analysis) -> MultiKey {
        let prefs = &self.preferences;
        MultiKey {
            canonical_lab: analysis
                .pipeline_labs
                .iter()
                .any(|lab| *lab == prefs.canonical_lab),
            award_rank: analysis
                .pipeline_award_rfas
                .iter()
                .map(|rfa| preference_rank(&prefs.award_rfas, Some(rfa)))
                .max()
                .unwrap_or(0),
            assembly_rank: preference_rank(&prefs.assemblies, analysis.assembly.as_deref()),
            annotation_rank: preference_rank(
                &prefs.genome_annotations,
                analysis.genome_annotation.as_deref(),
            ),
            pipeline_version: analysis
                .pipeline_version
                .as_deref()
                .and_then(PipelineVersion::parse),
            date_created: analysis.date_created,
        }
    }
}

impl AnalysisOrder for MultiKeyOrder {
    fn name(&self) -> &'static str {
        "multi_key"
    }

    fn compare(&self, a: &Analysis, b: &Analysis) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
}

/// Date-first heuristic: anything in progress wins, then analyses from the
/// target award generation, then the most recent.
#[derive(Debug, Clone)]
pub struct RecencyOrder {
    pub generation: String,
}

impl RecencyOrder {
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
        }
    }

    fn key(&self, analysis: &Analysis) -> (bool, bool, DateTime<FixedOffset>) {
        (
            analysis.status == RecordStatus::InProgress,
            analysis
                .pipeline_award_rfas
                .iter()
                .any(|rfa| *rfa == self.generation),
            analysis.date_created,
        )
    }
}

impl Default for RecencyOrder {
    fn default() -> Self {
        Self::new("ENCODE4")
    }
}

impl AnalysisOrder for RecencyOrder {
    fn name(&self) -> &'static str {
        "recency"
    }

    fn compare(&self, a: &Analysis, b: &Analysis) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
}

/// Outcome of ranking one experiment's analyses.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub policy: &'static str,
    pub canonical: Option<Analysis>,
    /// Released, matching, non-canonical analyses.
    pub archival: Vec<String>,
    /// Analyses whose pipelines do not match the assay.
    pub skipped: Vec<String>,
    /// Matching analyses that are neither released nor in progress.
    pub inactive: Vec<String>,
}

impl Ranking {
    pub fn canonical_accession(&self) -> Option<&str> {
        self.canonical.as_ref().map(|a| a.accession.as_str())
    }
}

/// Whether an analysis ran exclusively on the assay's production pipelines.
pub fn matches_pipelines(analysis: &Analysis, pipelines: &BTreeSet<String>) -> bool {
    !analysis.pipelines.is_empty() && analysis.pipelines.iter().all(|p| pipelines.contains(p))
}

/// Select the canonical analysis. Among analyses with equal keys the one
/// listed first wins.
pub fn rank_analyses(
    analyses: Vec<Analysis>,
    pipelines: &BTreeSet<String>,
    order: &dyn AnalysisOrder,
) -> Ranking {
    let mut skipped = Vec::new();
    let mut inactive = Vec::new();
    let mut competing = Vec::new();

    for analysis in analyses {
        if !matches_pipelines(&analysis, pipelines) {
            debug!(analysis = %analysis.accession, "pipelines do not match; skipped");
            skipped.push(analysis.accession);
        } else if !analysis.status.is_active() {
            inactive.push(analysis.accession);
        } else {
            competing.push(analysis);
        }
    }

    let mut best: Option<usize> = None;
    for (idx, candidate) in competing.iter().enumerate() {
        let better = match best {
            None => true,
            Some(current) => order.compare(candidate, &competing[current]) == Ordering::Greater,
        };
        if better {
            best = Some(idx);
        }
    }

    let archival = competing
        .iter()
        .enumerate()
        .filter(|(idx, analysis)| Some(*idx) != best && analysis.status == RecordStatus::Released)
        .map(|(_, analysis)| analysis.accession.clone())
        .collect();

    let canonical = best.map(|idx| competing.swap_remove(idx));
    if let Some(analysis) = &canonical {
        info!(
            analysis = %analysis.accession,
            policy = order.name(),
            "selected canonical analysis"
        );
    }

    Ranking {
        policy: order.name(),
        canonical,
        archival,
        skipped,
        inactive,
    }
}

//! Assay policies.
//!
//! An [`AssayPolicy`] bundles everything that differs between assay families:
//! the production pipeline set, the ranking comparator, allowed assemblies
//! and annotations, and the expected-output rule-set. The evaluator is
//! generic over this trait; [`Assay`] selects the implementation.

mod atac;
mod chip;
mod dnase;
mod rna;
mod wgbs;

pub use atac::AtacSeqPolicy;
pub use chip::ChipSeqPolicy;
pub use dnase::DnaseSeqPolicy;
pub use rna::BulkRnaSeqPolicy;
pub use wgbs::WgbsPolicy;

use crate::discrepancy::Discrepancy;
use crate::expectation::Expectation;
use crate::facts::ExperimentFacts;
use crate::rank::AnalysisOrder;
use crate::record::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Assay {
    ChipSeq,
    AtacSeq,
    DnaseSeq,
    Wgbs,
    BulkRnaSeq,
}

impl Assay {
    pub const ALL: [Assay; 5] = [
        Self::ChipSeq,
        Self::AtacSeq,
        Self::DnaseSeq,
        Self::Wgbs,
        Self::BulkRnaSeq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChipSeq => "chip-seq",
            Self::AtacSeq => "atac-seq",
            Self::DnaseSeq => "dnase-seq",
            Self::Wgbs => "wgbs",
            Self::BulkRnaSeq => "bulk-rna-seq",
        }
    }
}

impl fmt::Display for Assay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Assay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "chip-seq" | "chip" => Ok(Self::ChipSeq),
            "atac-seq" | "atac" => Ok(Self::AtacSeq),
            "dnase-seq" | "dnase" => Ok(Self::DnaseSeq),
            "wgbs" => Ok(Self::Wgbs),
            "bulk-rna-seq" | "rna-seq" | "rna" => Ok(Self::BulkRnaSeq),
            _ => Err(format!(
                "unknown assay `{s}`; expected one of chip-seq, atac-seq, dnase-seq, wgbs, bulk-rna-seq"
            )),
        }
    }
}

/// Per-assay configuration tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    /// Production pipeline accessions.
    pub pipelines: BTreeSet<String>,
    pub assemblies: Vec<String>,
    /// Allowed genome annotations; empty means an annotation is forbidden.
    pub genome_annotations: Vec<String>,
}

impl PolicyTable {
    pub fn defaults_for(assay: Assay) -> Self {
        let (pipelines, annotations): (&[&str], &[&str]) = match assay {
            Assay::ChipSeq => (&["ENCPL367MAC", "ENCPL481MLO", "ENCPL612HIG"], &[]),
            Assay::AtacSeq => (&["ENCPL787FUN"], &[]),
            Assay::DnaseSeq => (&["ENCPL848KLD"], &[]),
            Assay::Wgbs => (&["ENCPL182VXG"], &[]),
            Assay::BulkRnaSeq => (&["ENCPL862USL"], &["V29", "M21"]),
        };
        Self {
            pipelines: pipelines.iter().map(|p| p.to_string()).collect(),
            assemblies: vec!["GRCh38".to_string(), "mm10".to_string()],
            genome_annotations: annotations.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Assemblies allowed for an experiment, narrowed by organism when known.
    pub fn allowed_assemblies(&self, facts: &ExperimentFacts) -> Vec<String> {
        match facts.organism {
            Some(organism) => self
                .assemblies
                .iter()
                .filter(|assembly| organism.assemblies().contains(&assembly.as_str()))
                .cloned()
                .collect(),
            None => self.assemblies.clone(),
        }
    }

    /// Annotations allowed for an experiment, narrowed by organism when known.
    pub fn allowed_annotations(&self, facts: &ExperimentFacts) -> Vec<String> {
        match facts.organism {
            Some(organism) => self
                .genome_annotations
                .iter()
                .filter(|annotation| annotation.starts_with(organism.annotation_prefix()))
                .cloned()
                .collect(),
            None => self.genome_annotations.clone(),
        }
    }
}

/// Capability interface for one assay family.
pub trait AssayPolicy {
    fn assay(&self) -> Assay;

    fn table(&self) -> &PolicyTable;

    /// Comparator used to pick the canonical analysis.
    fn ranking(&self) -> &dyn AnalysisOrder;

    /// The expected outputs and preferred defaults for an experiment.
    fn expected_outputs(&self, facts: &ExperimentFacts) -> Expectation;

    /// Whether the experiment-level checks need the experiment's original
    /// (raw) files.
    fn inspects_original_files(&self) -> bool {
        false
    }

    /// Experiment-level consistency checks over raw files and libraries.
    fn consistency_checks(
        &self,
        facts: &ExperimentFacts,
        original_files: &[FileRecord],
    ) -> Vec<Discrepancy> {
        let _ = (facts, original_files);
        Vec::new()
    }
}

/// Build the policy for `assay` over `table`.
pub fn policy_for(assay: Assay, table: PolicyTable) -> Box<dyn AssayPolicy> {
    match assay {
        Assay::ChipSeq => Box::new(ChipSeqPolicy::new(table)),
        Assay::AtacSeq => Box::new(AtacSeqPolicy::new(table)),
        Assay::DnaseSeq => Box::new(DnaseSeqPolicy::new(table)),
        Assay::Wgbs => Box::new(WgbsPolicy::new(table)),
        Assay::BulkRnaSeq => Box::new(BulkRnaSeqPolicy::new(table)),
    }
}

/// The policy for `assay` with built-in tables.
pub fn default_policy(assay: Assay) -> Box<dyn AssayPolicy> {
    policy_for(assay, PolicyTable::defaults_for(assay))
}

//! Experiment-level facts that parametrize every expectation rule.

use crate::record::{Experiment, Library, Link};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Internal tag marking an experiment whose alignments are redacted.
pub const REDACTED_TAG: &str = "dbGaP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    TranscriptionFactor,
    Histone,
    NoTarget,
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TranscriptionFactor => "transcription factor",
            Self::Histone => "histone",
            Self::NoTarget => "no target",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Organism {
    Human,
    Mouse,
}

impl Organism {
    pub fn from_scientific_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Homo sapiens" => Some(Self::Human),
            "Mus musculus" => Some(Self::Mouse),
            _ => None,
        }
    }

    /// Assemblies that belong to this organism, most current first.
    pub fn assemblies(self) -> &'static [&'static str] {
        match self {
            Self::Human => &["GRCh38", "hg19"],
            Self::Mouse => &["mm10", "mm9"],
        }
    }

    /// Prefix of GENCODE annotation versions for this organism.
    pub fn annotation_prefix(self) -> &'static str {
        match self {
            Self::Human => "V",
            Self::Mouse => "M",
        }
    }
}

/// Facts derived from one experiment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentFacts {
    /// Distinct biological replicate numbers.
    pub replicate_numbers: BTreeSet<u32>,
    pub rep_count: usize,
    pub rep_pair_count: usize,
    pub target_class: TargetClass,
    pub control: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    pub redacted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organism: Option<Organism>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub strand_specificities: BTreeSet<String>,
}

impl ExperimentFacts {
    pub fn from_experiment(experiment: &Experiment) -> Self {
        let replicate_numbers: BTreeSet<u32> = experiment
            .replicates
            .iter()
            .map(|rep| rep.biological_replicate_number)
            .collect();

        // An unresolved target link classifies as a transcription factor;
        // `evaluate_experiment` resolves links before facts are built.
        let target_class = match &experiment.target {
            None => TargetClass::NoTarget,
            Some(Link::Embedded(target))
                if target.investigated_as.iter().any(|kind| kind == "histone") =>
            {
                TargetClass::Histone
            }
            Some(_) => TargetClass::TranscriptionFactor,
        };

        let libraries = || {
            experiment
                .replicates
                .iter()
                .filter_map(|rep| rep.library.as_ref().and_then(Link::<Library>::embedded))
        };

        // Linked biosamples and organisms leave the organism unknown.
        let organism = libraries()
            .filter_map(|library| {
                library
                    .biosample
                    .as_ref()?
                    .embedded()?
                    .organism
                    .as_ref()?
                    .embedded()
            })
            .find_map(|organism| Organism::from_scientific_name(&organism.scientific_name));

        let strand_specificities = libraries()
            .filter_map(|library| library.strand_specificity.clone())
            .collect();

        let mut facts = Self::with_replicates(replicate_numbers, target_class);
        facts.control = experiment.control_type.is_some();
        facts.control_type = experiment.control_type.clone();
        facts.redacted = experiment.internal_tags.iter().any(|tag| tag == REDACTED_TAG);
        facts.organism = organism;
        facts.strand_specificities = strand_specificities;
        facts
    }

    /// Facts for a hypothetical experiment with replicates numbered `1..=rep_count`.
    pub fn synthetic(rep_count: u16, target_class: TargetClass) -> Self {
        Self::with_replicates((1..=u32::from(rep_count)).collect(), target_class)
    }

    fn with_replicates(replicate_numbers: BTreeSet<u32>, target_class: TargetClass) -> Self {
        let rep_count = replicate_numbers.len();
        Self {
            replicate_numbers,
            rep_count,
            rep_pair_count: rep_pair_count(rep_count),
            target_class,
            control: false,
            control_type: None,
            redacted: false,
            organism: None,
            strand_specificities: BTreeSet::new(),
        }
    }

    /// `int(rep_count > 1)`: the increment for pooled outputs.
    pub fn pooled(&self) -> usize {
        usize::from(self.rep_count > 1)
    }

    pub fn is_unreplicated(&self) -> bool {
        self.rep_count == 1
    }

    /// Stranded when any library declares a strand-specific protocol.
    pub fn stranded(&self) -> bool {
        self.strand_specificities
            .iter()
            .any(|kind| kind != "unstranded")
    }
}

/// Unordered pairs among `rep_count` replicates.
pub fn rep_pair_count(rep_count: usize) -> usize {
    let (even, other) = if rep_count % 2 == 0 {
        (rep_count / 2, rep_count.saturating_sub(1))
    } else {
        ((rep_count - 1) / 2, rep_count)
    };
    even.saturating_mul(other)
}

//! Compliance discrepancies: the closed taxonomy of "bad reasons".

use crate::expectation::OutputCounts;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Discrepancy {
    NoQualifyingAnalysis {
        skipped: usize,
        inactive: usize,
    },
    WrongAssembly {
        found: Option<String>,
        allowed: Vec<String>,
    },
    WrongGenomeAnnotation {
        found: Option<String>,
        allowed: Vec<String>,
    },
    WrongPreferredDefaultFileFormat {
        expected: Vec<Vec<String>>,
        found: Vec<String>,
    },
    WrongPreferredDefaultOutputType {
        allowed: BTreeSet<String>,
        cardinality: usize,
        found: BTreeSet<String>,
    },
    WrongFileOutputTypeMap {
        expected: OutputCounts,
        found: OutputCounts,
    },
    ControlHasPreferredDefault {
        files: Vec<String>,
    },
    MultipleRunTypes {
        found: BTreeSet<String>,
    },
    MultipleStrandSpecificities {
        found: BTreeSet<String>,
    },
}

impl Discrepancy {
    /// Stable snake_case identifier, matching the serialized `class` tag.
    pub fn class(&self) -> &'static str {
        match self {
            Self::NoQualifyingAnalysis { .. } => "no_qualifying_analysis",
            Self::WrongAssembly { .. } => "wrong_assembly",
            Self::WrongGenomeAnnotation { .. } => "wrong_genome_annotation",
            Self::WrongPreferredDefaultFileFormat { .. } => "wrong_preferred_default_file_format",
            Self::WrongPreferredDefaultOutputType { .. } => {
                "wrong_preferred_default_output_type"
            }
            Self::WrongFileOutputTypeMap { .. } => "wrong_file_output_type_map",
            Self::ControlHasPreferredDefault { .. } => "control_has_preferred_default",
            Self::MultipleRunTypes { .. } => "multiple_run_types",
            Self::MultipleStrandSpecificities { .. } => "multiple_strand_specificities",
        }
    }

    /// The short reason used on summary lines.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoQualifyingAnalysis { .. } => "No qualifying analysis found",
            Self::WrongAssembly { .. } => "Wrong assembly",
            Self::WrongGenomeAnnotation { .. } => "Wrong genome annotation",
            Self::WrongPreferredDefaultFileFormat { .. } => "Wrong preferred default file format",
            Self::WrongPreferredDefaultOutputType { .. } => {
                "Wrong preferred default file output type"
            }
            Self::WrongFileOutputTypeMap { .. } => "Wrong file output type map",
            Self::ControlHasPreferredDefault { .. } => {
                "Control experiment has preferred default by mistake"
            }
            Self::MultipleRunTypes { .. } => "Multiple run types",
            Self::MultipleStrandSpecificities { .. } => "Multiple strand specificities",
        }
    }
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_counts(counts: &OutputCounts) -> String {
    let entries: Vec<String> = counts
        .iter()
        .map(|(key, count)| format!("{key}: {count}"))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self.reason();
        match self {
            Self::NoQualifyingAnalysis { skipped, inactive } => {
                write!(f, "{reason} (skipped={skipped}, inactive={inactive})")
            }
            Self::WrongAssembly { found, allowed } | Self::WrongGenomeAnnotation { found, allowed } => {
                let allowed = if allowed.is_empty() {
                    "none".to_string()
                } else {
                    join(allowed)
                };
                write!(
                    f,
                    "{reason}: found {}, allowed {allowed}",
                    found.as_deref().unwrap_or("none")
                )
            }
            Self::WrongPreferredDefaultFileFormat { expected, found } => {
                let options: Vec<String> = expected.iter().map(|o| format!("[{}]", join(o))).collect();
                write!(
                    f,
                    "{reason}: found [{}], expected one of {}",
                    join(found),
                    options.join(" or ")
                )
            }
            Self::WrongPreferredDefaultOutputType {
                allowed,
                cardinality,
                found,
            } => write!(
                f,
                "{reason}: found [{}], expected {cardinality} of [{}]",
                join(found),
                join(allowed)
            ),
            Self::WrongFileOutputTypeMap { expected, found } => write!(
                f,
                "{reason}: expected {} found {}",
                render_counts(expected),
                render_counts(found)
            ),
            Self::ControlHasPreferredDefault { files } => write!(f, "{reason}: {}", join(files)),
            Self::MultipleRunTypes { found } | Self::MultipleStrandSpecificities { found } => {
                write!(f, "{reason}: {}", join(found))
            }
        }
    }
}

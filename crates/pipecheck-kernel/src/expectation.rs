//! Expected-output modeling.
//!
//! An [`Expectation`] is computed fresh for every experiment. Rule-sets build
//! it declaratively through [`ExpectationBuilder`]: each rule adds a count for
//! an output category, and categories whose count works out to zero are
//! dropped so that the expected map is comparable with a tally of real files.

use crate::record::FileRecord;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How output categories are keyed for a given assay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    OutputType,
    OutputTypeAndFormat,
}

/// An output category: an output type, optionally paired with a file format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputKey {
    pub output_type: String,
    pub file_format: Option<String>,
}

impl OutputKey {
    pub fn of_type(output_type: &str) -> Self {
        Self {
            output_type: output_type.to_string(),
            file_format: None,
        }
    }

    pub fn of_pair(output_type: &str, file_format: &str) -> Self {
        Self {
            output_type: output_type.to_string(),
            file_format: Some(file_format.to_string()),
        }
    }

    pub fn for_file(mode: KeyMode, file: &FileRecord) -> Self {
        match mode {
            KeyMode::OutputType => Self::of_type(&file.output_type),
            KeyMode::OutputTypeAndFormat => Self::of_pair(&file.output_type, &file.file_format),
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_format {
            Some(format) => write!(f, "{} [{format}]", self.output_type),
            None => f.write_str(&self.output_type),
        }
    }
}

impl Serialize for OutputKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Output category to file count.
pub type OutputCounts = BTreeMap<OutputKey, usize>;

/// Accumulates counts per category; zero counts vanish on [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct ExpectationBuilder {
    mode: KeyMode,
    counts: OutputCounts,
}

impl ExpectationBuilder {
    pub fn new(mode: KeyMode) -> Self {
        Self {
            mode,
            counts: OutputCounts::new(),
        }
    }

    /// Add `count` files of `output_type`. Only valid in [`KeyMode::OutputType`].
    pub fn output(self, output_type: &str, count: usize) -> Self {
        debug_assert_eq!(self.mode, KeyMode::OutputType);
        self.add(OutputKey::of_type(output_type), count)
    }

    /// Add `count` files of `output_type` in `file_format`.
    pub fn output_as(self, output_type: &str, file_format: &str, count: usize) -> Self {
        debug_assert_eq!(self.mode, KeyMode::OutputTypeAndFormat);
        self.add(OutputKey::of_pair(output_type, file_format), count)
    }

    /// Add `count` files of `output_type` in each of `file_formats`.
    pub fn output_in(mut self, output_type: &str, file_formats: &[&str], count: usize) -> Self {
        for format in file_formats {
            self = self.output_as(output_type, format, count);
        }
        self
    }

    fn add(mut self, key: OutputKey, count: usize) -> Self {
        *self.counts.entry(key).or_default() += count;
        self
    }

    pub fn finish(self, preferred: PreferredDefaultRule) -> Expectation {
        let outputs = self
            .counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        Expectation {
            key_mode: self.mode,
            outputs,
            preferred,
        }
    }
}

/// What the preferred-default flags of an analysis must look like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PreferredDefaultRule {
    /// No file may be flagged preferred default (control experiments).
    Forbidden,
    /// Preferred defaults are not checked.
    Unchecked,
    Required(PreferredDefaults),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferredDefaults {
    /// Acceptable sorted lists of preferred-default file formats.
    pub format_options: Vec<Vec<String>>,
    /// Output types a preferred-default file may carry.
    pub output_types: BTreeSet<String>,
    /// Number of distinct preferred-default output types required.
    pub cardinality: usize,
    /// Unreplicated experiments may carry no preferred default at all.
    pub relax_when_unreplicated: bool,
}

impl PreferredDefaults {
    pub fn new(format_options: &[&[&str]], output_types: &[&str], cardinality: usize) -> Self {
        let format_options = format_options
            .iter()
            .map(|option| {
                let mut formats: Vec<String> = option.iter().map(|f| f.to_string()).collect();
                formats.sort();
                formats
            })
            .collect();
        Self {
            format_options,
            output_types: output_types.iter().map(|t| t.to_string()).collect(),
            cardinality,
            relax_when_unreplicated: false,
        }
    }

    pub fn relaxed_when_unreplicated(mut self) -> Self {
        self.relax_when_unreplicated = true;
        self
    }

    /// `found` must already be sorted.
    pub fn accepts_formats(&self, found: &[String]) -> bool {
        self.format_options.iter().any(|option| option == found)
    }

    pub fn accepts_output_types(&self, found: &BTreeSet<String>) -> bool {
        found.len() == self.cardinality && found.is_subset(&self.output_types)
    }
}

/// The target state for one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expectation {
    pub key_mode: KeyMode,
    pub outputs: OutputCounts,
    pub preferred: PreferredDefaultRule,
}

/// What a canonical analysis actually produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Observed {
    pub outputs: OutputCounts,
    /// Preferred-default file formats, sorted, duplicates kept.
    pub preferred_formats: Vec<String>,
    pub preferred_types: BTreeSet<String>,
    pub preferred_files: Vec<String>,
    pub ignored_files: Vec<String>,
}

impl Observed {
    pub fn tally<'a>(mode: KeyMode, files: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        let mut observed = Self::default();
        for file in files {
            if !file.status.counts_as_output() {
                observed.ignored_files.push(file.accession.clone());
                continue;
            }
            *observed
                .outputs
                .entry(OutputKey::for_file(mode, file))
                .or_default() += 1;
            if file.preferred_default {
                observed.preferred_formats.push(file.file_format.clone());
                observed.preferred_types.insert(file.output_type.clone());
                observed.preferred_files.push(file.accession.clone());
            }
        }
        observed.preferred_formats.sort();
        observed
    }
}

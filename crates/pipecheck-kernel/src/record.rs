//! Typed portal records: experiments, replicates, analyses and files.
//!
//! Records are decoded once at the metadata boundary. Nothing downstream of
//! this module looks at raw JSON; every optional field has an explicit
//! default here.

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

/// Offsets like `+0000` that RFC 3339 parsers reject.
static OFFSET_WITHOUT_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d{2})(\d{2})$").expect("offset regex is valid"));

/// Lifecycle status shared by analyses and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "released")]
    Released,
    #[default]
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "archived")]
    Archived,
    #[serde(rename = "deleted")]
    Deleted,
    #[serde(rename = "revoked")]
    Revoked,
    #[serde(rename = "replaced")]
    Replaced,
    #[serde(other, rename = "other")]
    Other,
}

impl RecordStatus {
    /// Whether an analysis in this status may be selected as canonical.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Released | Self::InProgress)
    }

    /// Whether a file in this status still counts toward an analysis' outputs.
    pub fn counts_as_output(self) -> bool {
        !matches!(self, Self::Deleted | Self::Revoked | Self::Replaced)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Released => "released",
            Self::InProgress => "in progress",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
            Self::Revoked => "revoked",
            Self::Replaced => "replaced",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// An experiment: one wet-lab assay with its replicates and analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub accession: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assay_term_name: Option<String>,

    /// Present only on control experiments (e.g. `control`, `input library`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Link<Target>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_tags: Vec<String>,

    #[serde(default)]
    pub replicates: Vec<Replicate>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub analyses: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub original_files: Vec<String>,

    #[serde(default)]
    pub audit: Audit,
}

/// A nested record: embedded in the embedded frame, a bare `@id` link
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link<T> {
    Embedded(T),
    Id(String),
}

impl<T> Link<T> {
    pub fn embedded(&self) -> Option<&T> {
        match self {
            Self::Embedded(record) => Some(record),
            Self::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub investigated_as: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replicate {
    pub biological_replicate_number: u32,
    #[serde(default)]
    pub technical_replicate_number: Option<u32>,
    #[serde(default)]
    pub library: Option<Link<Library>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub strand_specificity: Option<String>,
    #[serde(default)]
    pub biosample: Option<Link<Biosample>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Biosample {
    #[serde(default)]
    pub organism: Option<Link<OrganismRecord>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganismRecord {
    #[serde(default)]
    pub scientific_name: String,
}

/// Audit flags by severity. Levels other than ERROR and NOT_COMPLIANT are
/// ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audit {
    #[serde(rename = "ERROR", default)]
    pub error: Vec<AuditEntry>,
    #[serde(rename = "NOT_COMPLIANT", default)]
    pub not_compliant: Vec<AuditEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One processing run of an experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub accession: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub pipelines: Vec<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub genome_annotation: Option<String>,
    #[serde(default)]
    pub pipeline_version: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date_created: DateTime<FixedOffset>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub pipeline_labs: Vec<String>,
    #[serde(default)]
    pub pipeline_award_rfas: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub files: Vec<String>,
}

/// File-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub accession: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub output_type: String,
    pub file_format: String,
    #[serde(default)]
    pub preferred_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_type: Option<String>,
}

/// Reduce a portal identifier (`/experiments/ENCSR000AAA/`, a full URL, or a
/// bare accession) to its final path segment.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed);
    without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(without_query)
        .to_string()
}

/// Parse a creation timestamp, normalizing `+HHMM` offsets to `+HH:MM`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let trimmed = raw.trim();
    let normalized = OFFSET_WITHOUT_COLON.replace(trimmed, "$1:$2");
    DateTime::parse_from_rfc3339(&normalized)
        .map_err(|err| format!("unparseable timestamp `{raw}`: {err}"))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(D::Error::custom)
}

/// Links arrive either as path strings or as embedded objects.
fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|value| match value {
            Value::String(link) => Ok(normalize_identifier(&link)),
            Value::Object(map) => map
                .get("accession")
                .or_else(|| map.get("@id"))
                .and_then(Value::as_str)
                .map(normalize_identifier)
                .ok_or_else(|| D::Error::custom("embedded object has neither accession nor @id")),
            other => Err(D::Error::custom(format!(
                "expected identifier string or object, got {other}"
            ))),
        })
        .collect()
}

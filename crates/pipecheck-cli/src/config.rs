//! `pipecheck.toml`.
//!
//! ```toml
//! [portal]
//! base_url = "https://www.encodeproject.org"
//! retries = 3
//! backoff_ms = 1000
//! timeout_secs = 60
//!
//! [run]
//! fail_on_discrepancy = false
//! out_dir = "."
//!
//! [assay.chip-seq]
//! pipelines = ["ENCPL367MAC"]
//! assemblies = ["GRCh38"]
//! ```

use pipecheck_kernel::{Assay, PolicyTable};
use pipecheck_portal::PortalConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "pipecheck.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("{path}: {message}")]
    UnknownAssay { path: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub portal: PortalSection,
    pub run: RunSection,
    pub assay: BTreeMap<String, AssayOverride>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalSection {
    pub base_url: String,
    pub retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PortalSection {
    fn default() -> Self {
        let defaults = PortalConfig::default();
        Self {
            base_url: defaults.base_url,
            retries: defaults.retries,
            backoff_ms: defaults.backoff.as_millis() as u64,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub fail_on_discrepancy: bool,
    pub out_dir: PathBuf,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            fail_on_discrepancy: false,
            out_dir: PathBuf::from("."),
        }
    }
}

/// Per-assay table overrides. Absent fields keep the built-in values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssayOverride {
    pub pipelines: Option<Vec<String>>,
    pub assemblies: Option<Vec<String>>,
    pub genome_annotations: Option<Vec<String>>,
}

impl Settings {
    /// Load `explicit`, or `pipecheck.toml` in the working directory when it
    /// exists, or the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.is_file() {
                    Self::from_path(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        for name in settings.assay.keys() {
            name.parse::<Assay>()
                .map_err(|message| ConfigError::UnknownAssay {
                    path: origin.to_string(),
                    message,
                })?;
        }
        Ok(settings)
    }

    /// Portal settings with an optional URL override (flag or environment).
    pub fn portal_config(&self, url_override: Option<&str>) -> PortalConfig {
        PortalConfig {
            base_url: url_override
                .map(str::to_string)
                .unwrap_or_else(|| self.portal.base_url.clone()),
            retries: self.portal.retries,
            backoff: Duration::from_millis(self.portal.backoff_ms),
            timeout: Duration::from_secs(self.portal.timeout_secs),
        }
    }

    /// The built-in table for `assay` with any configured overrides applied.
    pub fn policy_table(&self, assay: Assay) -> PolicyTable {
        let mut table = PolicyTable::defaults_for(assay);
        let overrides = self
            .assay
            .iter()
            .filter(|(name, _)| name.parse::<Assay>() == Ok(assay))
            .map(|(_, o)| o);
        for o in overrides {
            if let Some(pipelines) = &o.pipelines {
                table.pipelines = pipelines.iter().cloned().collect();
            }
            if let Some(assemblies) = &o.assemblies {
                table.assemblies = assemblies.clone();
            }
            if let Some(annotations) = &o.genome_annotations {
                table.genome_annotations = annotations.clone();
            }
        }
        table
    }
}

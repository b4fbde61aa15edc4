//! Patch files.
//!
//! Three tab-separated UTF-8 files, rewritten from scratch on every run:
//!
//! - `releasedPatch.txt`: one release-ready accession per line, no header.
//! - `internalStatusPatch.txt`: `record_id\tinternal_status`.
//! - `analysisStatusPatch.txt`: `record_id\tstatus`, every row `archived`.
//!
//! With a ticket the names become `{ticket}_releasedPatch.txt` and so on.

use crate::batch::BatchReport;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const RELEASED: &str = "releasedPatch.txt";
const INTERNAL_STATUS: &str = "internalStatusPatch.txt";
const ANALYSIS_STATUS: &str = "analysisStatusPatch.txt";

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFileNames {
    pub released: String,
    pub internal_status: String,
    pub analysis_status: String,
}

impl PatchFileNames {
    pub fn new(ticket: Option<&str>) -> Self {
        let name = |base: &str| match ticket.map(str::trim).filter(|t| !t.is_empty()) {
            Some(ticket) => format!("{ticket}_{base}"),
            None => base.to_string(),
        };
        Self {
            released: name(RELEASED),
            internal_status: name(INTERNAL_STATUS),
            analysis_status: name(ANALYSIS_STATUS),
        }
    }
}

/// Paths of the files written by [`write_patches`].
#[derive(Debug, Clone, Serialize)]
pub struct WrittenPatches {
    pub released: PathBuf,
    pub internal_status: PathBuf,
    pub analysis_status: PathBuf,
}

pub fn render_released(batch: &BatchReport) -> String {
    batch
        .release_ready()
        .into_iter()
        .map(|accession| format!("{accession}\n"))
        .collect()
}

pub fn render_internal_status(batch: &BatchReport) -> String {
    let mut out = String::from("record_id\tinternal_status\n");
    for (accession, status) in batch.internal_statuses() {
        out.push_str(&format!("{accession}\t{status}\n"));
    }
    out
}

pub fn render_analysis_status(batch: &BatchReport) -> String {
    let mut out = String::from("record_id\tstatus\n");
    for accession in batch.archival() {
        out.push_str(&format!("{accession}\tarchived\n"));
    }
    out
}

/// Write all three patch files into `dir`, creating it if needed.
pub fn write_patches(
    dir: impl AsRef<Path>,
    names: &PatchFileNames,
    batch: &BatchReport,
) -> Result<WrittenPatches, PatchError> {
    let dir = dir.as_ref();
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }

    let written = WrittenPatches {
        released: dir.join(&names.released),
        internal_status: dir.join(&names.internal_status),
        analysis_status: dir.join(&names.analysis_status),
    };
    write_file(&written.released, &render_released(batch))?;
    write_file(&written.internal_status, &render_internal_status(batch))?;
    write_file(&written.analysis_status, &render_analysis_status(batch))?;

    info!(dir = %dir.display(), "wrote patch files");
    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<(), PatchError> {
    fs::write(path, contents).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, err: std::io::Error) -> PatchError {
    PatchError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

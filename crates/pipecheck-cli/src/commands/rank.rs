use crate::cli::SourceArgs;
use crate::config::Settings;
use crate::support::{exit_setup_error, join_or_dash, open_source_or_exit, policy_or_exit, print_json};
use pipecheck_kernel::{Analysis, MetadataSource, SourceError, rank_analyses};
use serde_json::json;

pub fn run(assay: String, experiment: String, source: SourceArgs, json_output: bool, settings: &Settings) {
    let policy = policy_or_exit(&assay, settings);
    let source = open_source_or_exit(&source, settings);

    let record = source
        .experiment(&experiment)
        .unwrap_or_else(|e| exit_setup_error(format!("[{}] {e}", e.failure_class())));
    let analyses = record
        .analyses
        .iter()
        .map(|id| source.analysis(id))
        .collect::<Result<Vec<Analysis>, SourceError>>()
        .unwrap_or_else(|e| exit_setup_error(format!("[{}] {e}", e.failure_class())));
    let ranking = rank_analyses(analyses, &policy.table().pipelines, policy.ranking());

    if json_output {
        print_json(&json!({
            "experiment": record.accession,
            "assay": policy.assay(),
            "ranking": ranking,
        }));
        return;
    }

    println!("pipecheck rank {} {}", policy.assay(), record.accession);
    println!("  Policy: {}", ranking.policy);
    match &ranking.canonical {
        Some(canonical) => println!(
            "  Canonical: {} ({}, {}, created {})",
            canonical.accession,
            canonical.status,
            canonical.assembly.as_deref().unwrap_or("no assembly"),
            canonical.date_created.to_rfc3339()
        ),
        None => println!("  Canonical: none (no qualifying analysis)"),
    }
    println!("  Archival: {}", join_or_dash(&ranking.archival));
    println!("  Skipped: {}", join_or_dash(&ranking.skipped));
    println!("  Inactive: {}", join_or_dash(&ranking.inactive));
}

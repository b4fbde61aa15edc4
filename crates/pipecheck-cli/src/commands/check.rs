use crate::cli::SourceArgs;
use crate::config::Settings;
use crate::support::{
    accessions_or_stdin, exit_setup_error, open_source_or_exit, policy_or_exit, print_json,
};
use pipecheck_report::{PatchFileNames, run_batch, write_patches};
use serde_json::json;
use std::path::PathBuf;
use std::process;

pub struct Args {
    pub assay: String,
    pub accessions: Vec<String>,
    pub ticket: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub fail_on_discrepancy: bool,
    pub source: SourceArgs,
    pub json: bool,
}

pub fn run(args: Args, settings: &Settings) {
    let policy = policy_or_exit(&args.assay, settings);
    let accessions = accessions_or_stdin(args.accessions);
    if accessions.is_empty() {
        exit_setup_error("no experiment accessions given (pass them as arguments or on stdin)");
    }
    let source = open_source_or_exit(&args.source, settings);

    let json_output = args.json;
    let batch = run_batch(source.as_ref(), policy.as_ref(), &accessions, |outcome| {
        if json_output {
            return;
        }
        match outcome.report() {
            Some(report) => {
                for line in &report.trace {
                    println!("{line}");
                }
            }
            None => println!("{}: evaluation failed", outcome.accession),
        }
    });

    let out_dir = args
        .out_dir
        .unwrap_or_else(|| settings.run.out_dir.clone());
    let names = PatchFileNames::new(args.ticket.as_deref());
    let written = write_patches(&out_dir, &names, &batch).unwrap_or_else(|e| exit_setup_error(e));
    let summary = batch.summary();

    if json_output {
        print_json(&json!({
            "assay": batch.assay,
            "summary": summary,
            "outcomes": batch.outcomes,
            "patches": written,
        }));
    } else {
        println!();
        println!("pipecheck check {} ({} experiment(s))", batch.assay, summary.total());
        for outcome in &batch.outcomes {
            println!("  {}", outcome.summary_line());
        }
        println!(
            "  Release ready: {}  Review: {}  Not compliant: {}  Failed: {}",
            summary.release_ready,
            summary.post_pipeline_review,
            summary.not_compliant,
            summary.failed
        );
        println!("  Archival candidates: {}", batch.archival().len());
        println!("  Patches: {}", written.released.display());
        println!("           {}", written.internal_status.display());
        println!("           {}", written.analysis_status.display());
    }

    if (args.fail_on_discrepancy || settings.run.fail_on_discrepancy) && batch.has_unready() {
        process::exit(1);
    }
}

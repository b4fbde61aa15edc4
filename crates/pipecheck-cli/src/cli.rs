use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pipecheck",
    about = "Pipecheck: pipeline-output compliance checks against the metadata portal",
    version
)]
pub struct Cli {
    /// Configuration file (defaults to ./pipecheck.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where records come from.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Portal base URL
    #[arg(long, env = "DCC_PORTAL_URL")]
    pub portal_url: Option<String>,

    /// Read records from a directory of JSON/JSONL files instead of the portal
    #[arg(long)]
    pub fixtures: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check experiments and write the released, internal-status and
    /// analysis-archival patch files
    Check {
        /// Assay: chip-seq, atac-seq, dnase-seq, wgbs, or bulk-rna-seq
        assay: String,

        /// Experiment accessions (read from stdin, one per line, when omitted)
        accessions: Vec<String>,

        /// Ticket prefix for patch file names
        #[arg(long)]
        ticket: Option<String>,

        /// Directory for patch files
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Exit 1 when any experiment is not release ready
        #[arg(long)]
        fail_on_discrepancy: bool,

        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the expected outputs and preferred-default rule for a
    /// hypothetical experiment
    Expect {
        /// Assay: chip-seq, atac-seq, dnase-seq, wgbs, or bulk-rna-seq
        assay: String,

        /// Number of distinct biological replicates
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        replicates: u16,

        /// Target classification
        #[arg(long, value_enum, default_value_t = TargetArg::Tf)]
        target: TargetArg,

        /// Experiment is a control
        #[arg(long)]
        control: bool,

        /// Experiment is redacted (dbGaP)
        #[arg(long)]
        redacted: bool,

        /// Organism, narrowing assemblies and annotations
        #[arg(long, value_enum)]
        organism: Option<OrganismArg>,

        /// Libraries are strand-specific
        #[arg(long)]
        stranded: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the canonical analysis selection for one experiment
    Rank {
        /// Assay: chip-seq, atac-seq, dnase-seq, wgbs, or bulk-rna-seq
        assay: String,

        /// Experiment accession
        experiment: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// Transcription factor
    Tf,
    Histone,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrganismArg {
    Human,
    Mouse,
}

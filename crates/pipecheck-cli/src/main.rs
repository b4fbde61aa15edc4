//! Pipecheck CLI: the `pipecheck` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_logging(cli.verbose, cli.quiet);
    let settings = support::load_settings_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::Check {
            assay,
            accessions,
            ticket,
            out_dir,
            fail_on_discrepancy,
            source,
            json,
        } => commands::check::run(
            commands::check::Args {
                assay,
                accessions,
                ticket,
                out_dir,
                fail_on_discrepancy,
                source,
                json,
            },
            &settings,
        ),

        Commands::Expect {
            assay,
            replicates,
            target,
            control,
            redacted,
            organism,
            stranded,
            json,
        } => commands::expect::run(
            commands::expect::Args {
                assay,
                replicates,
                target,
                control,
                redacted,
                organism,
                stranded,
                json,
            },
            &settings,
        ),

        Commands::Rank {
            assay,
            experiment,
            source,
            json,
        } => commands::rank::run(assay, experiment, source, json, &settings),
    }
}

use crate::cli::SourceArgs;
use crate::config::Settings;
use pipecheck_kernel::{Assay, AssayPolicy, MetadataSource, policy_for};
use pipecheck_portal::{Credentials, PortalClient, load_fixture_dir};
use serde::Serialize;
use std::io::{self, BufRead, IsTerminal};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration and I/O errors.
pub const EXIT_SETUP: i32 = 2;

/// `-v` and `-q` win over `RUST_LOG`; without either the default is `info`.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

pub fn exit_setup_error(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_SETUP);
}

pub fn parse_assay_or_exit(raw: &str) -> Assay {
    raw.parse().unwrap_or_else(|e| exit_setup_error(e))
}

pub fn load_settings_or_exit(explicit: Option<&Path>) -> Settings {
    Settings::load(explicit).unwrap_or_else(|e| exit_setup_error(e))
}

pub fn policy_or_exit(assay: &str, settings: &Settings) -> Box<dyn AssayPolicy> {
    let assay = parse_assay_or_exit(assay);
    policy_for(assay, settings.policy_table(assay))
}

/// The fixture directory when given, otherwise the portal.
pub fn open_source_or_exit(args: &SourceArgs, settings: &Settings) -> Box<dyn MetadataSource> {
    if let Some(dir) = &args.fixtures {
        let store = load_fixture_dir(dir).unwrap_or_else(|e| exit_setup_error(e));
        tracing::info!(dir = %dir.display(), records = store.len(), "using fixture records");
        return Box::new(store);
    }

    let config = settings.portal_config(args.portal_url.as_deref());
    let client = PortalClient::new(config, Credentials::from_env())
        .unwrap_or_else(|e| exit_setup_error(e));
    if !client.is_authenticated() {
        tracing::warn!("DCC_API_KEY/DCC_SECRET_KEY not set; only public records are visible");
    }
    tracing::info!(
        portal = %client.config().base_url,
        retries = client.config().retries,
        "using portal"
    );
    Box::new(client)
}

/// Positional accessions, or one per line from stdin when none were given
/// and stdin is not a terminal.
pub fn accessions_or_stdin(positional: Vec<String>) -> Vec<String> {
    if !positional.is_empty() {
        return positional;
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Vec::new();
    }
    read_accessions(stdin.lock()).unwrap_or_else(|e| exit_setup_error(format!("stdin: {e}")))
}

pub fn read_accessions(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut accessions = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        accessions.push(trimmed.to_string());
    }
    Ok(accessions)
}

pub fn print_json(payload: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn join_or_dash<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items
            .iter()
            .map(|item| item.as_ref())
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_accessions_skip_blanks_and_comments() {
        let input = "ENCSR000AAA\n\n  # queued by hand\n  ENCSR000AAB  \n";
        assert_eq!(
            read_accessions(input.as_bytes()).unwrap(),
            vec!["ENCSR000AAA", "ENCSR000AAB"]
        );
    }

    #[test]
    fn empty_lists_render_as_dash() {
        assert_eq!(join_or_dash::<&str>(&[]), "-");
        assert_eq!(join_or_dash(&["a", "b"]), "a, b");
    }
}

use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "pipecheck-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn command(cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pipecheck"));
    command
        .current_dir(cwd)
        .env_remove("DCC_PORTAL_URL")
        .env_remove("RUST_LOG");
    command
}

fn run_pipecheck<I, S>(cwd: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    command(cwd)
        .args(args)
        .output()
        .expect("pipecheck command should execute")
}

fn run_pipecheck_with_stdin<I, S>(cwd: &Path, args: I, stdin: &str) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = command(cwd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("pipecheck command should spawn");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin.as_bytes())
        .expect("stdin should accept input");
    child
        .wait_with_output()
        .expect("pipecheck command should finish")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_exit_code(output: &Output, code: i32) {
    if output.status.code() != Some(code) {
        panic!(
            "expected exit code {code}, got {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Copy the named scenario bundles from the kernel's fixture vectors into a
/// fresh record directory.
fn fixture_dir(tmp: &TempDirGuard, scenarios: &[&str]) -> PathBuf {
    let kernel_fixtures =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../pipecheck-kernel/tests/fixtures");
    let dir = tmp.path().join("records");
    fs::create_dir_all(&dir).expect("records dir should be created");
    for scenario in scenarios {
        fs::copy(
            kernel_fixtures.join(scenario).join("case.json"),
            dir.join(format!("{scenario}.json")),
        )
        .unwrap_or_else(|e| panic!("failed to copy scenario {scenario}: {e}"));
    }
    dir
}

#[test]
fn check_writes_patch_files_for_compliant_experiment() {
    let tmp = TempDirGuard::new("check-compliant");
    let records = fixture_dir(&tmp, &["tf_two_replicates_compliant"]);
    let out = tmp.path().join("out");

    let output = run_pipecheck(
        tmp.path(),
        [
            OsStr::new("check"),
            OsStr::new("chip-seq"),
            OsStr::new("ENCSR001AAA"),
            OsStr::new("--fixtures"),
            records.as_os_str(),
            OsStr::new("--out-dir"),
            out.as_os_str(),
        ],
    );
    assert_success(&output);

    let stdout = stdout_text(&output);
    assert!(stdout.contains("ENCSR001AAA\trelease ready\tENCAN001AAA"), "{stdout}");
    assert_eq!(
        fs::read_to_string(out.join("releasedPatch.txt")).unwrap(),
        "ENCSR001AAA\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("internalStatusPatch.txt")).unwrap(),
        "record_id\tinternal_status\nENCSR001AAA\trelease ready\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("analysisStatusPatch.txt")).unwrap(),
        "record_id\tstatus\n"
    );
}

#[test]
fn check_json_reports_failures_and_honors_fail_flag() {
    let tmp = TempDirGuard::new("check-json");
    let records = fixture_dir(
        &tmp,
        &[
            "tf_missing_idr_thresholded_peaks",
            "ranking_prefers_newer_pipeline_version",
        ],
    );

    let output = run_pipecheck(
        tmp.path(),
        [
            OsStr::new("check"),
            OsStr::new("chip-seq"),
            OsStr::new("ENCSR001BBB"),
            OsStr::new("ENCSR001DDD"),
            OsStr::new("ENCSR404XXX"),
            OsStr::new("--fixtures"),
            records.as_os_str(),
            OsStr::new("--out-dir"),
            tmp.path().as_os_str(),
            OsStr::new("--ticket"),
            OsStr::new("DCC-42"),
            OsStr::new("--fail-on-discrepancy"),
            OsStr::new("--json"),
        ],
    );
    assert_exit_code(&output, 1);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["summary"]["release_ready"], 1);
    assert_eq!(payload["summary"]["not_compliant"], 1);
    assert_eq!(payload["summary"]["failed"], 1);

    let outcomes = payload["outcomes"].as_array().expect("outcomes array");
    assert_eq!(outcomes[0]["disposition"], "not compliant");
    assert_eq!(
        outcomes[0]["report"]["discrepancies"][0]["class"],
        "wrong_file_output_type_map"
    );
    assert_eq!(outcomes[2]["evaluation"], "failed");
    assert_eq!(outcomes[2]["class"], "source.not_found");

    assert_eq!(
        fs::read_to_string(tmp.path().join("DCC-42_analysisStatusPatch.txt")).unwrap(),
        "record_id\tstatus\nENCAN001DDD\tarchived\nENCAN003DDD\tarchived\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("DCC-42_releasedPatch.txt")).unwrap(),
        "ENCSR001DDD\n"
    );
}

#[test]
fn check_reads_accessions_from_stdin() {
    let tmp = TempDirGuard::new("check-stdin");
    let records = fixture_dir(&tmp, &["control_with_preferred_default"]);

    let output = run_pipecheck_with_stdin(
        tmp.path(),
        [
            OsStr::new("check"),
            OsStr::new("chip-seq"),
            OsStr::new("--fixtures"),
            records.as_os_str(),
        ],
        "\nENCSR001CCC\n",
    );
    assert_success(&output);

    let stdout = stdout_text(&output);
    assert!(
        stdout.contains("Control experiment has preferred default by mistake"),
        "{stdout}"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("releasedPatch.txt")).unwrap(),
        ""
    );
}

#[test]
fn config_file_enables_fail_on_discrepancy() {
    let tmp = TempDirGuard::new("check-config");
    let records = fixture_dir(&tmp, &["no_qualifying_analysis"]);
    fs::write(
        tmp.path().join("pipecheck.toml"),
        "[run]\nfail_on_discrepancy = true\nout_dir = \"patches\"\n",
    )
    .unwrap();

    let output = run_pipecheck(
        tmp.path(),
        [
            OsStr::new("check"),
            OsStr::new("chip-seq"),
            OsStr::new("ENCSR001EEE"),
            OsStr::new("--fixtures"),
            records.as_os_str(),
        ],
    );
    assert_exit_code(&output, 1);
    assert!(stdout_text(&output).contains("No qualifying analysis found"));
    assert!(tmp.path().join("patches/releasedPatch.txt").is_file());
}

#[test]
fn setup_errors_exit_with_code_two() {
    let tmp = TempDirGuard::new("setup-errors");

    let unknown_assay = run_pipecheck(tmp.path(), ["check", "hi-c", "ENCSR000AAA"]);
    assert_exit_code(&unknown_assay, 2);
    assert!(String::from_utf8_lossy(&unknown_assay.stderr).contains("error: unknown assay"));

    let missing_fixtures = run_pipecheck(
        tmp.path(),
        ["check", "chip-seq", "ENCSR000AAA", "--fixtures", "does-not-exist"],
    );
    assert_exit_code(&missing_fixtures, 2);

    fs::write(tmp.path().join("bad.toml"), "[portal]\nretries = \"many\"\n").unwrap();
    let bad_config = run_pipecheck(tmp.path(), ["--config", "bad.toml", "expect", "wgbs", "--replicates", "1"]);
    assert_exit_code(&bad_config, 2);
}

#[test]
fn expect_rejects_out_of_range_replicate_counts() {
    let tmp = TempDirGuard::new("expect-range");

    for count in ["0", "65536", "18446744073709551615"] {
        let output = run_pipecheck(tmp.path(), ["expect", "chip-seq", "--replicates", count]);
        assert_exit_code(&output, 2);
    }

    let widest = run_pipecheck(
        tmp.path(),
        ["expect", "chip-seq", "--replicates", "65535", "--json"],
    );
    assert_success(&widest);
    let payload = parse_json_stdout(&widest);
    assert_eq!(payload["facts"]["rep_pair_count"], 2_147_385_345_u64);
}

#[test]
fn expect_prints_tf_chip_expectation() {
    let tmp = TempDirGuard::new("expect");

    let output = run_pipecheck(
        tmp.path(),
        ["expect", "chip-seq", "--replicates", "2", "--json"],
    );
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let outputs = &payload["expectation"]["outputs"];
    assert_eq!(outputs["IDR ranked peaks"], 4);
    assert_eq!(outputs["IDR thresholded peaks"], 6);
    assert_eq!(outputs["conservative IDR thresholded peaks"], 2);
    assert_eq!(payload["facts"]["rep_pair_count"], 1);
    assert_eq!(payload["expectation"]["preferred"]["rule"], "required");

    let control = run_pipecheck(
        tmp.path(),
        ["expect", "chip-seq", "--replicates", "2", "--control"],
    );
    assert_success(&control);
    let stdout = stdout_text(&control);
    assert!(stdout.contains("    alignments: 2"), "{stdout}");
    assert!(stdout.contains("Preferred defaults: forbidden"), "{stdout}");
    assert!(!stdout.contains("IDR"), "{stdout}");
}

#[test]
fn rank_shows_canonical_archival_and_skipped() {
    let tmp = TempDirGuard::new("rank");
    let records = fixture_dir(&tmp, &["ranking_prefers_newer_pipeline_version"]);

    let output = run_pipecheck(
        tmp.path(),
        [
            OsStr::new("rank"),
            OsStr::new("chip-seq"),
            OsStr::new("ENCSR001DDD"),
            OsStr::new("--fixtures"),
            records.as_os_str(),
            OsStr::new("--json"),
        ],
    );
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["ranking"]["policy"], "multi_key");
    assert_eq!(payload["ranking"]["canonical"]["accession"], "ENCAN002DDD");
    assert_eq!(
        payload["ranking"]["archival"],
        serde_json::json!(["ENCAN001DDD", "ENCAN003DDD"])
    );
    assert_eq!(payload["ranking"]["skipped"], serde_json::json!(["ENCAN004DDD"]));
    assert_eq!(payload["ranking"]["inactive"], serde_json::json!(["ENCAN005DDD"]));
}

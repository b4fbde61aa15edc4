//! Compliance evaluation for one experiment.
//!
//! The evaluator fetches the experiment and its analyses, ranks the analyses,
//! builds the expectation, tallies the canonical analysis' files and diffs
//! the two. Independent checks all run; none short-circuits another. Only
//! fetch and decode failures are errors.

use crate::assay::{Assay, AssayPolicy};
use crate::discrepancy::Discrepancy;
use crate::error::CheckError;
use crate::expectation::{Expectation, Observed, PreferredDefaultRule};
use crate::facts::ExperimentFacts;
use crate::rank::{Ranking, rank_analyses};
use crate::record::{Analysis, Audit, FileRecord};
use crate::source::MetadataSource;
use serde::Serialize;
use tracing::debug;

/// Serious audit counts on the experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditTally {
    pub error: usize,
    pub not_compliant: usize,
}

impl AuditTally {
    pub fn from_audit(audit: &Audit) -> Self {
        Self {
            error: audit.error.len(),
            not_compliant: audit.not_compliant.len(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error == 0 && self.not_compliant == 0
    }
}

/// The Discrepancy Report for one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub accession: String,
    pub assay: Assay,
    pub facts: ExperimentFacts,
    pub audits: AuditTally,
    pub ranking: Ranking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Expectation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<Observed>,
    /// The unreplicated "no preferred default" allowance was applied.
    pub preferred_default_relaxed: bool,
    pub discrepancies: Vec<Discrepancy>,
    /// Human-readable evaluation trace.
    pub trace: Vec<String>,
}

impl ExperimentReport {
    pub fn is_compliant(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn reasons(&self) -> Vec<&'static str> {
        self.discrepancies.iter().map(Discrepancy::reason).collect()
    }
}

/// Evaluate the experiment `id` against `policy`.
pub fn evaluate_experiment(
    source: &dyn MetadataSource,
    policy: &dyn AssayPolicy,
    id: &str,
) -> Result<ExperimentReport, CheckError> {
    let experiment = source.experiment_with_target(id)?;
    if experiment.replicates.is_empty() {
        return Err(CheckError::InvalidRecord {
            id: experiment.accession,
            message: "experiment has no replicates".to_string(),
        });
    }

    let facts = ExperimentFacts::from_experiment(&experiment);
    let audits = AuditTally::from_audit(&experiment.audit);
    let mut trace = vec![format!(
        "{}: {} replicate(s), {} analyses, audits ERROR={} NOT_COMPLIANT={}",
        experiment.accession,
        facts.rep_count,
        experiment.analyses.len(),
        audits.error,
        audits.not_compliant
    )];

    let analyses = experiment
        .analyses
        .iter()
        .map(|analysis_id| source.analysis(analysis_id))
        .collect::<Result<Vec<Analysis>, _>>()?;
    let ranking = rank_analyses(analyses, &policy.table().pipelines, policy.ranking());

    let mut report = ExperimentReport {
        accession: experiment.accession.clone(),
        assay: policy.assay(),
        facts,
        audits,
        ranking,
        expected: None,
        observed: None,
        preferred_default_relaxed: false,
        discrepancies: Vec::new(),
        trace: Vec::new(),
    };

    let Some(canonical) = report.ranking.canonical.clone() else {
        trace.push(format!(
            "  no qualifying analysis ({} skipped, {} inactive)",
            report.ranking.skipped.len(),
            report.ranking.inactive.len()
        ));
        report.discrepancies.push(Discrepancy::NoQualifyingAnalysis {
            skipped: report.ranking.skipped.len(),
            inactive: report.ranking.inactive.len(),
        });
        report.trace = trace;
        return Ok(report);
    };
    trace.push(format!(
        "  canonical analysis {} ({} policy, {} archival candidate(s))",
        canonical.accession,
        report.ranking.policy,
        report.ranking.archival.len()
    ));

    let mut discrepancies = check_reference(policy, &report.facts, &canonical);

    let files = canonical
        .files
        .iter()
        .map(|file_id| {
            debug!(file = %file_id, "fetching file");
            source.file(file_id)
        })
        .collect::<Result<Vec<FileRecord>, _>>()?;
    let expectation = policy.expected_outputs(&report.facts);
    let observed = Observed::tally(expectation.key_mode, &files);
    trace.push(format!(
        "  {} file(s), {} preferred default(s)",
        files.len(),
        observed.preferred_files.len()
    ));

    let (preferred, relaxed) =
        check_preferred_defaults(&expectation.preferred, &observed, &report.facts);
    discrepancies.extend(preferred);
    if relaxed {
        trace.push("  unreplicated: preferred defaults not required".to_string());
    }

    if observed.outputs != expectation.outputs {
        discrepancies.push(Discrepancy::WrongFileOutputTypeMap {
            expected: expectation.outputs.clone(),
            found: observed.outputs.clone(),
        });
    }

    if policy.inspects_original_files() {
        let originals = experiment
            .original_files
            .iter()
            .map(|file_id| source.file(file_id))
            .collect::<Result<Vec<FileRecord>, _>>()?;
        discrepancies.extend(policy.consistency_checks(&report.facts, &originals));
    }

    for discrepancy in &discrepancies {
        trace.push(format!("  - {discrepancy}"));
    }

    report.expected = Some(expectation);
    report.observed = Some(observed);
    report.preferred_default_relaxed = relaxed;
    report.discrepancies = discrepancies;
    report.trace = trace;
    Ok(report)
}

/// Assembly and genome-annotation checks on the canonical analysis.
fn check_reference(
    policy: &dyn AssayPolicy,
    facts: &ExperimentFacts,
    canonical: &Analysis,
) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();
    let table = policy.table();

    let assemblies = table.allowed_assemblies(facts);
    let assembly_ok = canonical
        .assembly
        .as_ref()
        .is_some_and(|assembly| assemblies.contains(assembly));
    if !assembly_ok {
        discrepancies.push(Discrepancy::WrongAssembly {
            found: canonical.assembly.clone(),
            allowed: assemblies,
        });
    }

    let annotations = table.allowed_annotations(facts);
    let annotation_ok = match (&canonical.genome_annotation, annotations.is_empty()) {
        (None, true) => true,
        (Some(_), true) => false,
        (None, false) => false,
        (Some(annotation), false) => annotations.contains(annotation),
    };
    if !annotation_ok {
        discrepancies.push(Discrepancy::WrongGenomeAnnotation {
            found: canonical.genome_annotation.clone(),
            allowed: annotations,
        });
    }

    discrepancies
}

/// Returns the discrepancies and whether the unreplicated allowance applied.
fn check_preferred_defaults(
    rule: &PreferredDefaultRule,
    observed: &Observed,
    facts: &ExperimentFacts,
) -> (Vec<Discrepancy>, bool) {
    match rule {
        PreferredDefaultRule::Unchecked => (Vec::new(), false),
        PreferredDefaultRule::Forbidden => {
            if observed.preferred_files.is_empty() {
                (Vec::new(), false)
            } else {
                (
                    vec![Discrepancy::ControlHasPreferredDefault {
                        files: observed.preferred_files.clone(),
                    }],
                    false,
                )
            }
        }
        PreferredDefaultRule::Required(expected) => {
            if expected.relax_when_unreplicated
                && facts.is_unreplicated()
                && observed.preferred_files.is_empty()
            {
                return (Vec::new(), true);
            }

            let mut discrepancies = Vec::new();
            if !expected.accepts_formats(&observed.preferred_formats) {
                discrepancies.push(Discrepancy::WrongPreferredDefaultFileFormat {
                    expected: expected.format_options.clone(),
                    found: observed.preferred_formats.clone(),
                });
            }
            if !expected.accepts_output_types(&observed.preferred_types) {
                discrepancies.push(Discrepancy::WrongPreferredDefaultOutputType {
                    allowed: expected.output_types.clone(),
                    cardinality: expected.cardinality,
                    found: observed.preferred_types.clone(),
                });
            }
            (discrepancies, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assay::default_policy;
    use crate::expectation::OutputKey;
    use crate::source::RecordStore;
    use serde_json::{Value, json};

    /// A two-replicate TF ChIP-seq experiment whose canonical analysis
    /// produces exactly the expected outputs.
    fn compliant_tf_store() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .insert(json!({
                "accession": "ENCSR000TF2",
                "target": {"label": "CTCF", "investigated_as": ["transcription factor"]},
                "replicates": [
                    {"biological_replicate_number": 1},
                    {"biological_replicate_number": 2}
                ],
                "analyses": ["/analyses/ENCAN000TF2/"]
            }))
            .unwrap();

        let outputs = [
            ("unfiltered alignments", "bam", 2),
            ("alignments", "bam", 2),
            ("signal p-value", "bigWig", 3),
            ("fold change over control", "bigWig", 3),
            ("IDR ranked peaks", "bed", 4),
            ("IDR thresholded peaks", "bed", 6),
            ("conservative IDR thresholded peaks", "bigBed", 2),
        ];
        let mut file_ids = Vec::new();
        let mut serial = 0;
        for (output_type, format, count) in outputs {
            for idx in 0..count {
                serial += 1;
                let accession = format!("ENCFF{serial:03}TFX");
                let preferred = (output_type == "signal p-value" && idx == 2)
                    || (output_type == "IDR thresholded peaks" && idx == 5);
                store
                    .insert(json!({
                        "accession": accession,
                        "status": "released",
                        "output_type": output_type,
                        "file_format": format,
                        "preferred_default": preferred
                    }))
                    .unwrap();
                file_ids.push(Value::String(format!("/files/{accession}/")));
            }
        }

        store
            .insert(json!({
                "accession": "ENCAN000TF2",
                "status": "released",
                "pipelines": ["/pipelines/ENCPL367MAC/"],
                "assembly": "GRCh38",
                "date_created": "2021-06-01T12:00:00.000000+0000",
                "pipeline_labs": ["/labs/encode-processing-pipeline/"],
                "pipeline_award_rfas": ["ENCODE4"],
                "files": file_ids
            }))
            .unwrap();
        store
    }

    fn chip() -> Box<dyn AssayPolicy> {
        default_policy(Assay::ChipSeq)
    }

    #[test]
    fn compliant_experiment_has_no_discrepancies() {
        let store = compliant_tf_store();
        let report = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap();

        assert!(report.is_compliant(), "{:?}", report.discrepancies);
        assert_eq!(report.ranking.canonical_accession(), Some("ENCAN000TF2"));
        assert!(!report.preferred_default_relaxed);
        assert_eq!(report.facts.rep_pair_count, 1);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let store = compliant_tf_store();
        let first = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap();
        let second = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn wrong_assembly_and_annotation_both_reported() {
        let mut store = compliant_tf_store();
        let mut analysis = store.fetch_object("ENCAN000TF2").unwrap();
        analysis["assembly"] = json!("hg19");
        analysis["genome_annotation"] = json!("V19");
        store.insert(analysis).unwrap();

        let report = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap();
        assert_eq!(
            report.reasons(),
            vec!["Wrong assembly", "Wrong genome annotation"]
        );
    }

    #[test]
    fn trace_lists_selection_tally_and_discrepancies() {
        let mut store = compliant_tf_store();
        let mut analysis = store.fetch_object("ENCAN000TF2").unwrap();
        analysis["assembly"] = json!("hg19");
        store.insert(analysis).unwrap();

        let report = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap();
        insta::assert_snapshot!(report.trace.join("\n"), @r"
        ENCSR000TF2: 2 replicate(s), 1 analyses, audits ERROR=0 NOT_COMPLIANT=0
          canonical analysis ENCAN000TF2 (multi_key policy, 0 archival candidate(s))
          22 file(s), 2 preferred default(s)
          - Wrong assembly: found hg19, allowed GRCh38, mm10
        ");
    }

    #[test]
    fn missing_file_fails_the_experiment_not_the_process() {
        let mut store = compliant_tf_store();
        let mut analysis = store.fetch_object("ENCAN000TF2").unwrap();
        analysis["files"]
            .as_array_mut()
            .unwrap()
            .push(json!("/files/ENCFF999ZZZ/"));
        store.insert(analysis).unwrap();

        let err = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap_err();
        assert_eq!(err.failure_class(), "source.not_found");
    }

    #[test]
    fn linked_histone_target_uses_histone_rules() {
        let mut store = compliant_tf_store();
        let mut experiment = store.fetch_object("ENCSR000TF2").unwrap();
        experiment["target"] = json!("/targets/H3K27ac-human/");
        store.insert(experiment).unwrap();
        store
            .insert(json!({
                "@id": "/targets/H3K27ac-human/",
                "label": "H3K27ac",
                "investigated_as": ["histone", "broad histone mark"]
            }))
            .unwrap();

        let report = evaluate_experiment(&store, chip().as_ref(), "ENCSR000TF2").unwrap();
        assert_eq!(report.facts.target_class, crate::facts::TargetClass::Histone);
        let expected = report.expected.as_ref().unwrap();
        assert!(expected.outputs.contains_key(&OutputKey::of_type("replicated peaks")));
        assert!(!expected.outputs.contains_key(&OutputKey::of_type("IDR thresholded peaks")));
    }

    #[test]
    fn experiment_without_replicates_is_invalid() {
        let mut store = RecordStore::new();
        store.insert(json!({"accession": "ENCSR000NOR"})).unwrap();
        let err = evaluate_experiment(&store, chip().as_ref(), "ENCSR000NOR").unwrap_err();
        assert_eq!(err.failure_class(), "record.invalid");
    }

    #[test]
    fn preferred_default_checks_run_independently() {
        let observed = Observed {
            preferred_formats: vec!["bigWig".to_string(), "bigWig".to_string()],
            preferred_types: ["signal p-value".to_string()].into(),
            preferred_files: vec!["ENCFF000AAA".to_string(), "ENCFF000AAB".to_string()],
            ..Observed::default()
        };
        let facts = ExperimentFacts::synthetic(2, crate::facts::TargetClass::TranscriptionFactor);
        let expectation = chip().expected_outputs(&facts);

        let (found, relaxed) = check_preferred_defaults(&expectation.preferred, &observed, &facts);
        let classes: Vec<_> = found.iter().map(Discrepancy::class).collect();
        assert_eq!(
            classes,
            vec![
                "wrong_preferred_default_file_format",
                "wrong_preferred_default_output_type"
            ]
        );
        assert!(!relaxed);
    }

    #[test]
    fn unreplicated_relaxation_only_without_preferred_files() {
        let facts = ExperimentFacts::synthetic(1, crate::facts::TargetClass::TranscriptionFactor);
        let expectation = chip().expected_outputs(&facts);

        let (found, relaxed) =
            check_preferred_defaults(&expectation.preferred, &Observed::default(), &facts);
        assert!(found.is_empty());
        assert!(relaxed);

        let partial = Observed {
            preferred_formats: vec!["bigWig".to_string()],
            preferred_types: ["signal p-value".to_string()].into(),
            preferred_files: vec!["ENCFF000AAA".to_string()],
            outputs: [(OutputKey::of_type("signal p-value"), 1)].into(),
            ..Observed::default()
        };
        let (found, relaxed) = check_preferred_defaults(&expectation.preferred, &partial, &facts);
        assert_eq!(found.len(), 2);
        assert!(!relaxed);
    }
}

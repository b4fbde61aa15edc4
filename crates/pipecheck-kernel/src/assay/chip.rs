//! ChIP-seq (TF, histone, control, redacted) rule-sets.

use super::{Assay, AssayPolicy, PolicyTable};
use crate::expectation::{
    Expectation, ExpectationBuilder, KeyMode, PreferredDefaultRule, PreferredDefaults,
};
use crate::facts::{ExperimentFacts, TargetClass};
use crate::rank::{AnalysisOrder, MultiKeyOrder};

pub struct ChipSeqPolicy {
    table: PolicyTable,
    order: MultiKeyOrder,
}

impl ChipSeqPolicy {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            order: MultiKeyOrder::default(),
        }
    }
}

impl AssayPolicy for ChipSeqPolicy {
    fn assay(&self) -> Assay {
        Assay::ChipSeq
    }

    fn table(&self) -> &PolicyTable {
        &self.table
    }

    fn ranking(&self) -> &dyn AnalysisOrder {
        &self.order
    }

    fn expected_outputs(&self, facts: &ExperimentFacts) -> Expectation {
        if facts.redacted {
            redacted(facts)
        } else if facts.control {
            control(facts)
        } else if facts.target_class == TargetClass::Histone {
            histone(facts)
        } else {
            transcription_factor(facts)
        }
    }
}

fn redacted(facts: &ExperimentFacts) -> Expectation {
    ExpectationBuilder::new(KeyMode::OutputType)
        .output("redacted alignments", facts.rep_count)
        .finish(PreferredDefaultRule::Unchecked)
}

fn control(facts: &ExperimentFacts) -> Expectation {
    let n = facts.rep_count;
    ExpectationBuilder::new(KeyMode::OutputType)
        .output("unfiltered alignments", n)
        .output("alignments", n)
        .finish(PreferredDefaultRule::Forbidden)
}

fn transcription_factor(facts: &ExperimentFacts) -> Expectation {
    let n = facts.rep_count;
    let p = facts.rep_pair_count;
    let pooled = facts.pooled();
    ExpectationBuilder::new(KeyMode::OutputType)
        .output("unfiltered alignments", n)
        .output("alignments", n)
        .output("signal p-value", n + pooled)
        .output("fold change over control", n + pooled)
        .output("IDR ranked peaks", n + pooled + p)
        .output("IDR thresholded peaks", 2 * (n + p))
        .output("conservative IDR thresholded peaks", 2 * pooled)
        .finish(PreferredDefaultRule::Required(
            PreferredDefaults::new(
                &[&["bigWig", "bed"], &["bigWig", "bigBed"]],
                &[
                    "signal p-value",
                    "IDR thresholded peaks",
                    "conservative IDR thresholded peaks",
                ],
                2,
            )
            .relaxed_when_unreplicated(),
        ))
}

fn histone(facts: &ExperimentFacts) -> Expectation {
    let n = facts.rep_count;
    let pooled = facts.pooled();
    ExpectationBuilder::new(KeyMode::OutputType)
        .output("unfiltered alignments", n)
        .output("alignments", n)
        .output("signal p-value", n + pooled)
        .output("fold change over control", n + pooled)
        .output("pseudoreplicated peaks", 2 * (n + pooled))
        .output("replicated peaks", 2 * facts.rep_pair_count)
        .finish(PreferredDefaultRule::Required(
            PreferredDefaults::new(
                &[&["bigWig", "bigBed"]],
                &[
                    "fold change over control",
                    "replicated peaks",
                    "pseudoreplicated peaks",
                ],
                2,
            )
            .relaxed_when_unreplicated(),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::OutputKey;

    fn policy() -> ChipSeqPolicy {
        ChipSeqPolicy::new(PolicyTable::defaults_for(Assay::ChipSeq))
    }

    fn count(expectation: &Expectation, output_type: &str) -> Option<usize> {
        expectation
            .outputs
            .get(&OutputKey::of_type(output_type))
            .copied()
    }

    #[test]
    fn replicated_tf_expectations() {
        let facts = ExperimentFacts::synthetic(2, TargetClass::TranscriptionFactor);
        let expectation = policy().expected_outputs(&facts);

        assert_eq!(facts.rep_pair_count, 1);
        assert_eq!(count(&expectation, "unfiltered alignments"), Some(2));
        assert_eq!(count(&expectation, "alignments"), Some(2));
        assert_eq!(count(&expectation, "IDR ranked peaks"), Some(4));
        assert_eq!(count(&expectation, "IDR thresholded peaks"), Some(6));
        assert_eq!(count(&expectation, "conservative IDR thresholded peaks"), Some(2));
        assert_eq!(count(&expectation, "signal p-value"), Some(3));
    }

    #[test]
    fn unreplicated_tf_has_no_pooled_or_pairwise_outputs() {
        let facts = ExperimentFacts::synthetic(1, TargetClass::TranscriptionFactor);
        let expectation = policy().expected_outputs(&facts);

        assert_eq!(count(&expectation, "signal p-value"), Some(1));
        assert_eq!(count(&expectation, "IDR ranked peaks"), Some(1));
        assert_eq!(count(&expectation, "IDR thresholded peaks"), Some(2));
        assert_eq!(count(&expectation, "conservative IDR thresholded peaks"), None);
        match expectation.preferred {
            PreferredDefaultRule::Required(rule) => assert!(rule.relax_when_unreplicated),
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn control_collapses_to_alignments() {
        let mut facts = ExperimentFacts::synthetic(2, TargetClass::NoTarget);
        facts.control = true;
        let expectation = policy().expected_outputs(&facts);

        assert_eq!(expectation.outputs.len(), 2);
        assert_eq!(count(&expectation, "unfiltered alignments"), Some(2));
        assert_eq!(count(&expectation, "alignments"), Some(2));
        assert_eq!(expectation.preferred, PreferredDefaultRule::Forbidden);
    }

    #[test]
    fn redaction_replaces_the_rule_set() {
        let mut facts = ExperimentFacts::synthetic(3, TargetClass::TranscriptionFactor);
        facts.redacted = true;
        let expectation = policy().expected_outputs(&facts);

        assert_eq!(expectation.outputs.len(), 1);
        assert_eq!(count(&expectation, "redacted alignments"), Some(3));
        assert_eq!(expectation.preferred, PreferredDefaultRule::Unchecked);
    }

    #[test]
    fn histone_expectations_scale_with_pairs() {
        let facts = ExperimentFacts::synthetic(3, TargetClass::Histone);
        let expectation = policy().expected_outputs(&facts);

        assert_eq!(count(&expectation, "pseudoreplicated peaks"), Some(8));
        assert_eq!(count(&expectation, "replicated peaks"), Some(6));
        assert!(count(&expectation, "IDR thresholded peaks").is_none());
    }
}

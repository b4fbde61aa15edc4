//! ATAC-seq rule-set (outputs keyed by type and format).

use super::{Assay, AssayPolicy, PolicyTable};
use crate::expectation::{
    Expectation, ExpectationBuilder, KeyMode, PreferredDefaultRule, PreferredDefaults,
};
use crate::facts::ExperimentFacts;
use crate::rank::{AnalysisOrder, RecencyOrder};

const PEAK_FORMATS: &[&str] = &["bed", "bigBed"];

pub struct AtacSeqPolicy {
    table: PolicyTable,
    order: RecencyOrder,
}

impl AtacSeqPolicy {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            order: RecencyOrder::default(),
        }
    }
}

impl AssayPolicy for AtacSeqPolicy {
    fn assay(&self) -> Assay {
        Assay::AtacSeq
    }

    fn table(&self) -> &PolicyTable {
        &self.table
    }

    fn ranking(&self) -> &dyn AnalysisOrder {
        &self.order
    }

    fn expected_outputs(&self, facts: &ExperimentFacts) -> Expectation {
        let n = facts.rep_count;
        let p = facts.rep_pair_count;
        let pooled = facts.pooled();

        let alignments = ExpectationBuilder::new(KeyMode::OutputTypeAndFormat)
            .output_as("unfiltered alignments", "bam", n)
            .output_as("alignments", "bam", n);
        if facts.control {
            return alignments.finish(PreferredDefaultRule::Forbidden);
        }

        alignments
            .output_as("signal p-value", "bigWig", n + pooled)
            .output_as("fold change over control", "bigWig", n + pooled)
            .output_in("pseudoreplicated peaks", PEAK_FORMATS, n + pooled)
            .output_in("IDR thresholded peaks", PEAK_FORMATS, n + p)
            .output_in("conservative IDR thresholded peaks", PEAK_FORMATS, pooled)
            .output_as("IDR ranked peaks", "bed", n + pooled + p)
            .finish(PreferredDefaultRule::Required(
                PreferredDefaults::new(
                    &[&["bigBed", "bigWig"]],
                    &[
                        "fold change over control",
                        "pseudoreplicated peaks",
                        "conservative IDR thresholded peaks",
                    ],
                    2,
                )
                .relaxed_when_unreplicated(),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::OutputKey;
    use crate::facts::TargetClass;

    fn expectation(rep_count: u16, control: bool) -> Expectation {
        let mut facts = ExperimentFacts::synthetic(rep_count, TargetClass::NoTarget);
        facts.control = control;
        AtacSeqPolicy::new(PolicyTable::defaults_for(Assay::AtacSeq)).expected_outputs(&facts)
    }

    #[test]
    fn replicated_outputs_keyed_by_format() {
        let expectation = expectation(2, false);
        let get = |t: &str, f: &str| expectation.outputs.get(&OutputKey::of_pair(t, f)).copied();

        assert_eq!(expectation.key_mode, KeyMode::OutputTypeAndFormat);
        assert_eq!(get("alignments", "bam"), Some(2));
        assert_eq!(get("pseudoreplicated peaks", "bigBed"), Some(3));
        assert_eq!(get("IDR thresholded peaks", "bed"), Some(3));
        assert_eq!(get("conservative IDR thresholded peaks", "bigBed"), Some(1));
        assert_eq!(get("IDR ranked peaks", "bed"), Some(4));
    }

    #[test]
    fn unreplicated_drops_conservative_set() {
        let expectation = expectation(1, false);
        assert!(!expectation
            .outputs
            .keys()
            .any(|key| key.output_type == "conservative IDR thresholded peaks"));
    }

    #[test]
    fn control_expects_only_alignments() {
        let expectation = expectation(2, true);
        assert_eq!(expectation.outputs.len(), 2);
        assert_eq!(expectation.preferred, PreferredDefaultRule::Forbidden);
    }
}

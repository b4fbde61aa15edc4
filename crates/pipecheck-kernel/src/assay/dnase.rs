//! DNase-seq rule-set. Every output is per replicate; nothing is pooled.

use super::{Assay, AssayPolicy, PolicyTable};
use crate::expectation::{
    Expectation, ExpectationBuilder, KeyMode, PreferredDefaultRule, PreferredDefaults,
};
use crate::facts::ExperimentFacts;
use crate::rank::{AnalysisOrder, RecencyOrder};

const BED_PAIR: &[&str] = &["bed", "bigBed"];

pub struct DnaseSeqPolicy {
    table: PolicyTable,
    order: RecencyOrder,
}

impl DnaseSeqPolicy {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            order: RecencyOrder::default(),
        }
    }
}

impl AssayPolicy for DnaseSeqPolicy {
    fn assay(&self) -> Assay {
        Assay::DnaseSeq
    }

    fn table(&self) -> &PolicyTable {
        &self.table
    }

    fn ranking(&self) -> &dyn AnalysisOrder {
        &self.order
    }

    fn expected_outputs(&self, facts: &ExperimentFacts) -> Expectation {
        let n = facts.rep_count;
        ExpectationBuilder::new(KeyMode::OutputTypeAndFormat)
            .output_as("unfiltered alignments", "bam", n)
            .output_as("alignments", "bam", n)
            .output_as("read-depth normalized signal", "bigWig", n)
            .output_as("nuclease cleavage frequency", "bigWig", n)
            .output_in("FDR cut rate", BED_PAIR, n)
            .output_in("peaks", BED_PAIR, n)
            .output_in("footprints", BED_PAIR, n)
            .finish(PreferredDefaultRule::Required(PreferredDefaults::new(
                &[&["bigBed", "bigWig"]],
                &["read-depth normalized signal", "peaks"],
                2,
            )))
    }
}

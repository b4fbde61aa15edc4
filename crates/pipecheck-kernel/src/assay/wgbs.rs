//! Whole-genome bisulfite sequencing rule-set.

use super::{Assay, AssayPolicy, PolicyTable};
use crate::expectation::{
    Expectation, ExpectationBuilder, KeyMode, PreferredDefaultRule, PreferredDefaults,
};
use crate::facts::ExperimentFacts;
use crate::rank::{AnalysisOrder, MultiKeyOrder};

const CONTEXTS: &[&str] = &[
    "methylation state at CpG",
    "methylation state at CHG",
    "methylation state at CHH",
];

pub struct WgbsPolicy {
    table: PolicyTable,
    order: MultiKeyOrder,
}

impl WgbsPolicy {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            order: MultiKeyOrder::default(),
        }
    }
}

impl AssayPolicy for WgbsPolicy {
    fn assay(&self) -> Assay {
        Assay::Wgbs
    }

    fn table(&self) -> &PolicyTable {
        &self.table
    }

    fn ranking(&self) -> &dyn AnalysisOrder {
        &self.order
    }

    fn expected_outputs(&self, facts: &ExperimentFacts) -> Expectation {
        let n = facts.rep_count;
        let mut builder =
            ExpectationBuilder::new(KeyMode::OutputTypeAndFormat).output_as("alignments", "bam", n);
        for context in CONTEXTS {
            builder = builder.output_in(context, &["bed", "bigBed"], n);
        }
        builder
            .output_as("plus strand methylation state at CpG", "bigWig", n)
            .output_as("minus strand methylation state at CpG", "bigWig", n)
            .finish(PreferredDefaultRule::Required(PreferredDefaults::new(
                &[&["bigBed", "bigWig"]],
                &[
                    "methylation state at CpG",
                    "plus strand methylation state at CpG",
                ],
                2,
            )))
    }
}

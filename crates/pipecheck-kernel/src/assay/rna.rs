//! Bulk RNA-seq rule-set, plus run-type and strandedness consistency checks.

use super::{Assay, AssayPolicy, PolicyTable};
use crate::discrepancy::Discrepancy;
use crate::expectation::{
    Expectation, ExpectationBuilder, KeyMode, PreferredDefaultRule, PreferredDefaults,
};
use crate::facts::ExperimentFacts;
use crate::rank::{AnalysisOrder, RecencyOrder};
use crate::record::FileRecord;
use std::collections::BTreeSet;

pub struct BulkRnaSeqPolicy {
    table: PolicyTable,
    order: RecencyOrder,
}

impl BulkRnaSeqPolicy {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            order: RecencyOrder::default(),
        }
    }
}

impl AssayPolicy for BulkRnaSeqPolicy {
    fn assay(&self) -> Assay {
        Assay::BulkRnaSeq
    }

    fn table(&self) -> &PolicyTable {
        &self.table
    }

    fn ranking(&self) -> &dyn AnalysisOrder {
        &self.order
    }

    fn expected_outputs(&self, facts: &ExperimentFacts) -> Expectation {
        let n = facts.rep_count;
        // Stranded libraries yield one signal track per strand.
        let signal_tracks = if facts.stranded() { 2 * n } else { n };
        ExpectationBuilder::new(KeyMode::OutputTypeAndFormat)
            .output_as("alignments", "bam", n)
            .output_as("transcriptome alignments", "bam", n)
            .output_as("gene quantifications", "tsv", n)
            .output_as("transcript quantifications", "tsv", n)
            .output_as("signal of unique reads", "bigWig", signal_tracks)
            .output_as("signal of all reads", "bigWig", signal_tracks)
            .finish(PreferredDefaultRule::Required(PreferredDefaults::new(
                &[&["tsv"]],
                &["gene quantifications"],
                1,
            )))
    }

    fn inspects_original_files(&self) -> bool {
        true
    }

    fn consistency_checks(
        &self,
        facts: &ExperimentFacts,
        original_files: &[FileRecord],
    ) -> Vec<Discrepancy> {
        let mut discrepancies = Vec::new();

        let run_types: BTreeSet<String> = original_files
            .iter()
            .filter(|file| file.file_format == "fastq" && file.status.counts_as_output())
            .filter_map(|file| file.run_type.clone())
            .collect();
        if run_types.len() > 1 {
            discrepancies.push(Discrepancy::MultipleRunTypes { found: run_types });
        }

        if facts.strand_specificities.len() > 1 {
            discrepancies.push(Discrepancy::MultipleStrandSpecificities {
                found: facts.strand_specificities.clone(),
            });
        }

        discrepancies
    }
}

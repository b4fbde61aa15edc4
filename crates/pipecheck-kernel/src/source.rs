//! The metadata boundary.
//!
//! A [`MetadataSource`] resolves identifiers to raw JSON objects; the typed
//! accessors decode and validate them so that nothing past this point sees
//! untyped data.

use crate::error::SourceError;
use crate::record::{Analysis, Experiment, FileRecord, Link, Target, normalize_identifier};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashMap;

pub trait MetadataSource {
    /// Fetch the raw record for `id`.
    fn fetch_object(&self, id: &str) -> Result<Value, SourceError>;

    fn experiment(&self, id: &str) -> Result<Experiment, SourceError> {
        decode(id, self.fetch_object(id)?)
    }

    fn analysis(&self, id: &str) -> Result<Analysis, SourceError> {
        decode(id, self.fetch_object(id)?)
    }

    fn file(&self, id: &str) -> Result<FileRecord, SourceError> {
        decode(id, self.fetch_object(id)?)
    }

    fn target(&self, id: &str) -> Result<Target, SourceError> {
        decode(id, self.fetch_object(id)?)
    }

    /// The experiment with a linked target replaced by the fetched record.
    fn experiment_with_target(&self, id: &str) -> Result<Experiment, SourceError> {
        let mut experiment = self.experiment(id)?;
        if let Some(Link::Id(link)) = &experiment.target {
            let target = self.target(link)?;
            experiment.target = Some(Link::Embedded(target));
        }
        Ok(experiment)
    }
}

/// Decode a fetched record into its typed form.
pub fn decode<T: DeserializeOwned>(id: &str, value: Value) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|err| SourceError::Malformed {
        id: id.to_string(),
        message: err.to_string(),
    })
}

/// In-memory records keyed by accession.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Value>,
    fetches: Cell<usize>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its `accession` (or `@id` when the accession is
    /// absent).
    pub fn insert(&mut self, record: Value) -> Result<String, SourceError> {
        let key = record
            .get("accession")
            .or_else(|| record.get("@id"))
            .and_then(Value::as_str)
            .map(normalize_identifier)
            .ok_or_else(|| SourceError::Malformed {
                id: "<unnamed>".to_string(),
                message: "record has neither accession nor @id".to_string(),
            })?;
        self.records.insert(key.clone(), record);
        Ok(key)
    }

    pub fn extend(
        &mut self,
        records: impl IntoIterator<Item = Value>,
    ) -> Result<usize, SourceError> {
        let mut inserted = 0;
        for record in records {
            self.insert(record)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl MetadataSource for RecordStore {
    fn fetch_object(&self, id: &str) -> Result<Value, SourceError> {
        self.fetches.set(self.fetches.get() + 1);
        let key = normalize_identifier(id);
        self.records
            .get(&key)
            .cloned()
            .ok_or(SourceError::NotFound(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_resolves_any_identifier_form() {
        let mut store = RecordStore::new();
        store
            .insert(json!({
                "accession": "ENCFF000AAA",
                "output_type": "alignments",
                "file_format": "bam"
            }))
            .unwrap();

        let file = store.file("/files/ENCFF000AAA/").unwrap();
        assert_eq!(file.output_type, "alignments");
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn missing_and_malformed_records_are_errors() {
        let mut store = RecordStore::new();
        store.insert(json!({"accession": "ENCFF000BAD"})).unwrap();

        assert_eq!(
            store.file("ENCFF000XXX").unwrap_err(),
            SourceError::NotFound("ENCFF000XXX".to_string())
        );
        assert!(matches!(
            store.file("ENCFF000BAD"),
            Err(SourceError::Malformed { .. })
        ));
        assert!(store.insert(json!({"title": "no id"})).is_err());
    }

    #[test]
    fn linked_targets_are_fetched_by_their_path() {
        let mut store = RecordStore::new();
        store
            .insert(json!({
                "accession": "ENCSR000HIS",
                "target": "/targets/H3K4me3-human/",
                "replicates": [{"biological_replicate_number": 1}]
            }))
            .unwrap();
        store
            .insert(json!({
                "@id": "/targets/H3K4me3-human/",
                "label": "H3K4me3",
                "investigated_as": ["histone", "narrow histone mark"]
            }))
            .unwrap();

        let experiment = store.experiment_with_target("ENCSR000HIS").unwrap();
        let target = experiment.target.as_ref().and_then(Link::embedded).unwrap();
        assert_eq!(target.label, "H3K4me3");
        assert_eq!(store.fetch_count(), 2);

        store
            .insert(json!({
                "accession": "ENCSR000DAN",
                "target": "/targets/missing-human/",
                "replicates": [{"biological_replicate_number": 1}]
            }))
            .unwrap();
        assert_eq!(
            store.experiment_with_target("ENCSR000DAN").unwrap_err(),
            SourceError::NotFound("missing-human".to_string())
        );
    }
}

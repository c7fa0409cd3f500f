use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::dto::vacancy_dto::RawVacancy;
use crate::error::{Error, Result};
use crate::models::vacancy::VacancyRecord;
use crate::services::classifier_service::Classifier;
use crate::services::dedup_service::{Deduplicator, MergeStats};
use crate::services::normalization_service::Normalizer;

/// File names containing any of these are derived artefacts, not snapshots.
const SKIPPED_NAME_PARTS: [&str; 5] = ["stats", "report", "merged", "final", "duplicates"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_read: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub non_industrial: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub records: Vec<VacancyRecord>,
    pub read: usize,
    pub malformed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub kept: Vec<VacancyRecord>,
    pub rejected: Vec<VacancyRecord>,
    pub stats: IngestStats,
    pub merge: MergeStats,
}

/// Snapshot files in `dir`, sorted by name.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();
        if SKIPPED_NAME_PARTS.iter().any(|part| name.contains(part)) {
            debug!(file = %path.display(), "Skipping derived file");
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Decodes every element independently. Returns the records and the number
/// of elements that could not be decoded.
pub fn decode_items(items: Vec<JsonValue>) -> (Vec<VacancyRecord>, usize) {
    let mut malformed = 0;
    let records = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if !item.is_object() {
                debug!(index, "Skipping non-object vacancy");
                malformed += 1;
                return None;
            }
            match serde_json::from_value::<RawVacancy>(item) {
                Ok(raw) => Some(VacancyRecord::from(raw)),
                Err(e) => {
                    debug!(index, error = %e, "Skipping malformed vacancy");
                    malformed += 1;
                    None
                }
            }
        })
        .collect();
    (records, malformed)
}

pub fn load_file(path: &Path) -> Result<LoadedFile> {
    let raw = std::fs::read_to_string(path)?;
    let value: JsonValue = serde_json::from_str(&raw)?;
    let JsonValue::Array(items) = value else {
        return Err(Error::Internal(format!(
            "{} does not contain a JSON array",
            path.display()
        )));
    };
    let read = items.len();
    let (records, malformed) = decode_items(items);
    Ok(LoadedFile {
        path: path.to_path_buf(),
        records,
        read,
        malformed,
    })
}

#[derive(Debug, Clone, Default)]
pub struct IngestPipeline {
    classifier: Classifier,
    normalizer: Normalizer,
}

impl IngestPipeline {
    pub fn new(classifier: Classifier, normalizer: Normalizer) -> Self {
        Self {
            classifier,
            normalizer,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Runs normalisation, classification, dedup and the industrial filter
    /// over batches in order. Records are keyed in their final form, the same
    /// form they are stored in. Earlier batches win on duplicate keys.
    pub fn process_batches<I>(&self, batches: I, dedup: &mut Deduplicator) -> IngestOutcome
    where
        I: IntoIterator<Item = Vec<VacancyRecord>>,
    {
        let mut outcome = IngestOutcome::default();

        for batch in batches {
            outcome.stats.records_read += batch.len();
            let prepared: Vec<VacancyRecord> = batch
                .into_iter()
                .map(|mut record| {
                    self.normalizer.normalize(&mut record);
                    self.classifier.classify(&mut record);
                    record
                })
                .collect();
            let before = prepared.len();
            let unique = dedup.dedup_batch(prepared);
            outcome.stats.duplicates += before - unique.len();

            for record in unique {
                if self.classifier.is_industrial_record(&record) {
                    outcome.kept.push(record);
                } else {
                    outcome.rejected.push(record);
                }
            }
        }

        outcome.stats.non_industrial = outcome.rejected.len();
        outcome.stats.kept = outcome.kept.len();
        outcome.merge = dedup.stats().clone();
        outcome
    }

    /// Loads every snapshot in `dir` and processes it. Keys in `seen` are
    /// treated as already stored.
    #[instrument(skip(self, seen))]
    pub fn run<I>(&self, dir: &Path, seen: I) -> Result<IngestOutcome>
    where
        I: IntoIterator<Item = String>,
    {
        let files = discover_files(dir)?;
        info!(files = files.len(), "Discovered snapshot files");

        let mut processed = 0;
        let mut failed = 0;
        let mut malformed = 0;
        let mut batches = Vec::with_capacity(files.len());

        for path in &files {
            match load_file(path) {
                Ok(loaded) => {
                    info!(
                        file = %loaded.path.display(),
                        read = loaded.read,
                        malformed = loaded.malformed,
                        "Loaded snapshot"
                    );
                    processed += 1;
                    malformed += loaded.malformed;
                    batches.push(loaded.records);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to load snapshot, skipping");
                    failed += 1;
                }
            }
        }

        let mut dedup = Deduplicator::with_seen(seen);
        let mut outcome = self.process_batches(batches, &mut dedup);
        outcome.stats.files_processed = processed;
        outcome.stats.files_failed = failed;
        outcome.stats.malformed = malformed;
        outcome.stats.records_read += malformed;

        info!(
            read = outcome.stats.records_read,
            duplicates = outcome.stats.duplicates,
            non_industrial = outcome.stats.non_industrial,
            kept = outcome.stats.kept,
            "Ingest finished"
        );
        Ok(outcome)
    }
}

use serde::Serialize;
use std::collections::HashSet;

use crate::models::vacancy::VacancyRecord;
use crate::utils::fingerprint::vacancy_fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    Keep,
    Duplicate,
}

/// Merge statistics over every batch seen by one deduplicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub files: usize,
    pub before: usize,
    pub after: usize,
    pub duplicates_removed: usize,
}

/// `id:<external id>` when the record has one, else `fp:<sha256>` of the
/// normalised title, employer and region.
pub fn dedup_key(record: &VacancyRecord) -> String {
    match record.external_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => format!("id:{}", id),
        _ => format!(
            "fp:{}",
            vacancy_fingerprint(
                &record.title,
                record.employer_name.as_deref().unwrap_or_default(),
                record.region_name().unwrap_or_default(),
            )
        ),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    stats: MergeStats,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from keys that are already stored so they count as duplicates.
    pub fn with_seen<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            seen: keys.into_iter().collect(),
            stats: MergeStats::default(),
        }
    }

    pub fn check_key(&mut self, key: String) -> DedupDecision {
        self.stats.before += 1;
        if self.seen.insert(key) {
            self.stats.after += 1;
            DedupDecision::Keep
        } else {
            self.stats.duplicates_removed += 1;
            DedupDecision::Duplicate
        }
    }

    pub fn check(&mut self, record: &VacancyRecord) -> DedupDecision {
        self.check_key(dedup_key(record))
    }

    /// Keeps first occurrences in input order.
    pub fn dedup_batch(&mut self, batch: Vec<VacancyRecord>) -> Vec<VacancyRecord> {
        self.stats.files += 1;
        batch
            .into_iter()
            .filter(|r| self.check(r) == DedupDecision::Keep)
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }
}

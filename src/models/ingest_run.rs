use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IngestRun {
    pub id: String,
    pub data_dir: String,
    pub files_processed: i64,
    pub records_read: i64,
    pub malformed: i64,
    pub duplicates: i64,
    pub non_industrial: i64,
    pub inserted: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

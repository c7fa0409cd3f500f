pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use rand::Rng;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::models::ingest_run::IngestRun;
use crate::models::vacancy::{Vacancy, VacancyRecord};
use crate::services::{
    analytics_service::{AnalyticsService, AnalyticsSettings},
    classifier_service::{Classifier, KeywordTables},
    normalization_service::{CurrencyRates, Normalizer},
    pipeline_service::{IngestOutcome, IngestPipeline},
    quality_service::assess_quality,
    report_service::{ReportInput, ReportPaths, ReportService},
    vacancy_service::VacancyService,
};
use crate::utils::time::now;

/// Result of one ingest run over a data directory.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run: IngestRun,
    pub outcome: IngestOutcome,
    pub inserted: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub vacancy_service: VacancyService,
    pub pipeline: IngestPipeline,
    pub analytics_service: AnalyticsService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Result<Self> {
        Self::with_config(pool, crate::config::get_config())
    }

    pub fn with_config(pool: SqlitePool, config: &Config) -> Result<Self> {
        let tables = KeywordTables::load(config.keywords_path.as_deref())?;
        let pipeline = IngestPipeline::new(
            Classifier::new(tables)?,
            Normalizer::new(CurrencyRates::default()),
        );

        Ok(Self {
            vacancy_service: VacancyService::new(pool.clone()),
            analytics_service: AnalyticsService::new(AnalyticsSettings::from(config)),
            report_service: ReportService::new(config.report_dir.clone()),
            pipeline,
            pool,
        })
    }

    /// Loads every snapshot in `data_dir`, skipping postings already stored,
    /// and persists the industrial ones under a new ingest run.
    #[instrument(skip(self))]
    pub async fn ingest(&self, data_dir: &Path) -> Result<RunResult> {
        let mut run = IngestRun {
            id: Uuid::new_v4().to_string(),
            data_dir: data_dir.display().to_string(),
            files_processed: 0,
            records_read: 0,
            malformed: 0,
            duplicates: 0,
            non_industrial: 0,
            inserted: 0,
            started_at: now(),
            finished_at: None,
        };
        // Stored first so vacancy rows can reference it.
        self.vacancy_service.record_run(&run).await?;

        let seen = self.vacancy_service.existing_keys().await?;
        info!(stored = seen.len(), "Seeded deduplicator from database");
        let outcome = self.pipeline.run(data_dir, seen)?;

        let inserted = self
            .vacancy_service
            .insert_batch(&outcome.kept, Some(&run.id), self.pipeline.classifier())
            .await?;

        run.files_processed = outcome.stats.files_processed as i64;
        run.records_read = outcome.stats.records_read as i64;
        run.malformed = outcome.stats.malformed as i64;
        run.duplicates = outcome.stats.duplicates as i64;
        run.non_industrial = outcome.stats.non_industrial as i64;
        run.inserted = inserted as i64;
        run.finished_at = Some(now());
        self.vacancy_service.record_run(&run).await?;

        info!(run_id = %run.id, inserted, "Ingest run recorded");
        Ok(RunResult {
            run,
            outcome,
            inserted,
        })
    }

    pub async fn stored_records(&self) -> Result<Vec<VacancyRecord>> {
        let stored = self.vacancy_service.list().await?;
        Ok(stored.iter().map(Vacancy::to_record).collect())
    }

    /// Computes analytics over everything stored and writes the reports.
    #[instrument(skip(self, result, rng), fields(run_id = %result.run.id))]
    pub async fn report<R: Rng>(&self, result: &RunResult, rng: &mut R) -> Result<ReportPaths> {
        let records = self.stored_records().await?;
        let database = self.vacancy_service.database_stats().await?;
        let generated_at = now();

        let analytics = self
            .analytics_service
            .analyze(&records, self.pipeline.classifier(), rng);
        let quality = assess_quality(&records, generated_at);

        let input = ReportInput {
            run_id: &result.run.id,
            generated_at,
            ingest: &result.outcome.stats,
            merge: &result.outcome.merge,
            inserted: result.inserted,
            database: &database,
            analytics: &analytics,
            quality: &quality,
        };
        self.report_service
            .write_all(&input, &records, &result.outcome.rejected)
    }
}

use serde::Serialize;
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::ingest_run::IngestRun;
use crate::models::skill::Skill;
use crate::models::vacancy::{join_list, Vacancy, VacancyRecord};
use crate::services::classifier_service::Classifier;
use crate::services::dedup_service::dedup_key;
use crate::utils::time::now;

#[derive(Clone)]
pub struct VacancyService {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    pub total_vacancies: i64,
    pub with_salary: i64,
    pub unique_employers: i64,
    pub unique_regions: i64,
    pub total_skills: i64,
    pub unique_skills: i64,
    pub by_segment: Vec<(String, i64)>,
    pub by_level: Vec<(String, i64)>,
}

impl VacancyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts records in one transaction. Rows whose dedup key is already
    /// stored are ignored. Returns the number of new rows.
    #[instrument(skip(self, records, classifier), fields(records = records.len()))]
    pub async fn insert_batch(
        &self,
        records: &[VacancyRecord],
        run_id: Option<&str>,
        classifier: &Classifier,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO vacancies (
                    dedup_key, external_id, title, employer_name, employer_id,
                    employer_trusted, area, region, salary_from, salary_to,
                    salary_currency, salary_avg_rub, has_salary, experience, schedule,
                    employment, industry_segment, position_level, professional_roles,
                    industrial_keywords, key_skills, snippet_requirement,
                    snippet_responsibility, published_at, collected_at,
                    collection_method, ingest_run_id, created_at
                ) VALUES (
                    ?, ?, ?, ?, ?,
                    ?, ?, ?, ?, ?,
                    ?, ?, ?, ?, ?,
                    ?, ?, ?, ?,
                    ?, ?, ?,
                    ?, ?, ?,
                    ?, ?, ?
                )
                "#,
            )
            .bind(dedup_key(record))
            .bind(&record.external_id)
            .bind(&record.title)
            .bind(&record.employer_name)
            .bind(&record.employer_id)
            .bind(record.employer_trusted)
            .bind(&record.area)
            .bind(&record.region)
            .bind(record.salary_from)
            .bind(record.salary_to)
            .bind(&record.salary_currency)
            .bind(record.salary_avg_rub)
            .bind(record.has_salary)
            .bind(&record.experience)
            .bind(&record.schedule)
            .bind(&record.employment)
            .bind(record.industry_segment.unwrap_or_default())
            .bind(record.position_level.unwrap_or_default())
            .bind(join_list(&record.professional_roles))
            .bind(join_list(&record.industrial_keywords))
            .bind(Json(&record.skills))
            .bind(&record.requirement)
            .bind(&record.responsibility)
            .bind(record.published_at)
            .bind(record.collected_at)
            .bind(&record.collection_method)
            .bind(run_id)
            .bind(now())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                continue;
            }
            inserted += 1;
            let vacancy_id = result.last_insert_rowid();

            for (rank, skill) in record.skills.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO skills (vacancy_id, skill_name, skill_category, frequency_rank)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(vacancy_id)
                .bind(skill)
                .bind(classifier.categorize_skill(skill))
                .bind(rank as i64 + 1)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(inserted, skipped = records.len() as u64 - inserted, "Stored vacancies");
        Ok(inserted)
    }

    pub async fn existing_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT dedup_key FROM vacancies")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("dedup_key").map_err(Into::into))
            .collect()
    }

    pub async fn list(&self) -> Result<Vec<Vacancy>> {
        let items = sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancies ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Vacancy> {
        let vacancy = sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancies WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(vacancy)
    }

    pub async fn skills_for(&self, vacancy_id: i64) -> Result<Vec<Skill>> {
        let skills = sqlx::query_as::<_, Skill>(
            "SELECT * FROM skills WHERE vacancy_id = ? ORDER BY frequency_rank ASC",
        )
        .bind(vacancy_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(skills)
    }

    pub async fn count(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vacancies")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn database_stats(&self) -> Result<DatabaseStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_vacancies,
                COALESCE(SUM(CASE WHEN has_salary THEN 1 ELSE 0 END), 0) AS with_salary,
                COUNT(DISTINCT employer_name) AS unique_employers,
                COUNT(DISTINCT COALESCE(NULLIF(region, ''), area)) AS unique_regions
            FROM vacancies
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let skills = sqlx::query(
            "SELECT COUNT(*) AS total_skills, COUNT(DISTINCT skill_name) AS unique_skills FROM skills",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            total_vacancies: row.try_get("total_vacancies")?,
            with_salary: row.try_get("with_salary")?,
            unique_employers: row.try_get("unique_employers")?,
            unique_regions: row.try_get("unique_regions")?,
            total_skills: skills.try_get("total_skills")?,
            unique_skills: skills.try_get("unique_skills")?,
            by_segment: self.count_by("industry_segment").await?,
            by_level: self.count_by("position_level").await?,
        })
    }

    async fn count_by(&self, column: &'static str) -> Result<Vec<(String, i64)>> {
        let sql = format!(
            "SELECT {column} AS label, COUNT(*) AS total FROM vacancies GROUP BY {column} ORDER BY total DESC, label ASC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Ok((row.try_get("label")?, row.try_get("total")?)))
            .collect()
    }

    pub async fn record_run(&self, run: &IngestRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingest_runs (
                id, data_dir, files_processed, records_read, malformed,
                duplicates, non_industrial, inserted, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                files_processed = excluded.files_processed,
                records_read = excluded.records_read,
                malformed = excluded.malformed,
                duplicates = excluded.duplicates,
                non_industrial = excluded.non_industrial,
                inserted = excluded.inserted,
                finished_at = excluded.finished_at
            "#,
        )
        .bind(&run.id)
        .bind(&run.data_dir)
        .bind(run.files_processed)
        .bind(run.records_read)
        .bind(run.malformed)
        .bind(run.duplicates)
        .bind(run.non_industrial)
        .bind(run.inserted)
        .bind(run.started_at)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_runs(&self) -> Result<Vec<IngestRun>> {
        let runs = sqlx::query_as::<_, IngestRun>("SELECT * FROM ingest_runs ORDER BY started_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::pool::{connect, run_migrations};
    use crate::models::classification::{IndustrySegment, PositionLevel, SkillCategory};

    async fn setup_test_db() -> SqlitePool {
        let pool = connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    fn record(id: Option<&str>, title: &str) -> VacancyRecord {
        VacancyRecord {
            external_id: id.map(String::from),
            title: title.to_string(),
            employer_name: Some("АО Станкозавод".into()),
            region: Some("Свердловская область".into()),
            salary_avg_rub: Some(90_000.0),
            has_salary: true,
            industry_segment: Some(IndustrySegment::Machinery),
            position_level: Some(PositionLevel::Engineer),
            skills: vec!["AutoCAD".into(), "Охрана труда".into()],
            professional_roles: vec!["Инженер".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_dedup_key() {
        let service = VacancyService::new(setup_test_db().await);
        let classifier = Classifier::default();
        let batch = vec![record(Some("1"), "Инженер"), record(None, "Технолог")];

        assert_eq!(service.insert_batch(&batch, None, &classifier).await.unwrap(), 2);
        assert_eq!(service.insert_batch(&batch, None, &classifier).await.unwrap(), 0);
        assert_eq!(service.count().await.unwrap(), 2);

        let mut keys = service.existing_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys[1], "id:1");
        assert!(keys[0].starts_with("fp:"));
    }

    #[tokio::test]
    async fn stored_rows_round_trip_with_skills() {
        let service = VacancyService::new(setup_test_db().await);
        let classifier = Classifier::default();
        service
            .insert_batch(&[record(Some("5"), "Инженер-конструктор")], None, &classifier)
            .await
            .unwrap();

        let stored = service.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        let back = stored[0].to_record();
        assert_eq!(back.title, "Инженер-конструктор");
        assert_eq!(back.industry_segment, Some(IndustrySegment::Machinery));
        assert_eq!(back.skills, vec!["AutoCAD", "Охрана труда"]);
        assert_eq!(back.professional_roles, vec!["Инженер"]);

        let skills = service.skills_for(stored[0].id).await.unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].skill_category, SkillCategory::Technical);
        assert_eq!(skills[1].skill_category, SkillCategory::Safety);
        assert_eq!(skills[1].frequency_rank, 2);
    }

    #[tokio::test]
    async fn stats_and_runs() {
        let service = VacancyService::new(setup_test_db().await);
        let classifier = Classifier::default();
        let run = IngestRun {
            id: uuid::Uuid::new_v4().to_string(),
            data_dir: "data".into(),
            files_processed: 1,
            records_read: 2,
            malformed: 0,
            duplicates: 0,
            non_industrial: 0,
            inserted: 2,
            started_at: now(),
            finished_at: None,
        };
        service.record_run(&run).await.unwrap();
        service
            .insert_batch(
                &[record(Some("1"), "Инженер"), record(Some("2"), "Инженер")],
                Some(&run.id),
                &classifier,
            )
            .await
            .unwrap();
        service
            .record_run(&IngestRun {
                finished_at: Some(now()),
                ..run.clone()
            })
            .await
            .unwrap();

        let stats = service.database_stats().await.unwrap();
        assert_eq!(stats.total_vacancies, 2);
        assert_eq!(stats.with_salary, 2);
        assert_eq!(stats.unique_employers, 1);
        assert_eq!(stats.unique_regions, 1);
        assert_eq!(stats.total_skills, 4);
        assert_eq!(stats.unique_skills, 2);
        assert_eq!(stats.by_segment, vec![("machinery".to_string(), 2)]);

        let runs = service.list_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].finished_at.is_some());

        assert!(matches!(
            service.get_by_id(999).await,
            Err(crate::error::Error::NotFound(_))
        ));
    }
}

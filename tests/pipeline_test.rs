use std::path::Path;

use industrial_vacancies::{
    config::Config,
    database::pool::{connect, run_migrations},
    models::classification::{IndustrySegment, PositionLevel},
    services::statistics_service::rng_from_seed,
    AppState,
};
use serde_json::json;

fn test_config(data_dir: &Path, report_dir: &Path) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        data_dir: data_dir.to_path_buf(),
        report_dir: report_dir.to_path_buf(),
        confidence_level: 0.95,
        bootstrap_resamples: 200,
        bootstrap_seed: Some(42),
        salary_min: 20_000.0,
        salary_max: 1_000_000.0,
        region_min_vacancies: 1,
        keywords_path: None,
        log_json: false,
    }
}

fn write_snapshot(dir: &Path, name: &str, items: serde_json::Value) {
    std::fs::write(dir.join(name), serde_json::to_vec(&items).unwrap()).unwrap();
}

fn seed_snapshots(dir: &Path) {
    write_snapshot(
        dir,
        "2024-03-01_moscow.json",
        json!([
            {
                "id": "101",
                "name": "Инженер-технолог",
                "area": {"id": "1", "name": "Москва"},
                "salary": {"from": 90000, "to": 110000, "currency": "RUR"},
                "employer": {"id": 7, "name": "Нефтехимический завод", "trusted": 1},
                "key_skills": [{"name": "Контроль качества"}],
                "published_at": "2024-03-01T10:00:00+0300"
            },
            {
                "id": 102,
                "name": "Токарь <highlighttext>5 разряда</highlighttext>",
                "area": {"id": "1", "name": "Москва"},
                "salary": {"from": "70000", "currency": "RUR"},
                "employer": {"name": "Машзавод"},
                "published_at": "2024-03-05T09:00:00+0300"
            },
            {
                "id": "103",
                "name": "Бухгалтер",
                "employer": {"name": "Офис"}
            },
            {
                "id": "104",
                "name": "Оператор колл-центра",
                "employer": {"name": "Связь"}
            },
            {
                "id": "105",
                "name": "Электросварщик",
                "area": "Москва",
                "salary": "по договоренности",
                "employer": {"name": "Стройзавод", "trusted": "yes"}
            },
            "not an object"
        ]),
    );
    write_snapshot(
        dir,
        "2024-04-01_perm.json",
        json!([
            {
                "id": "101",
                "name": "Инженер-технолог",
                "area": {"id": "1", "name": "Москва"}
            },
            {
                "name": "Оператор линии розлива",
                "region": "Пермь",
                "salary": {"from": 500, "to": 700, "currency": "USD"},
                "employer": {"name": "Пивзавод"},
                "published_at": "2024-04-02 08:00:00"
            }
        ]),
    );
    write_snapshot(dir, "merged_stats.json", json!([{"id": "999", "name": "Слесарь"}]));
    std::fs::write(dir.join("broken.json"), b"{ not json").unwrap();
}

async fn setup(data_dir: &Path, report_dir: &Path) -> AppState {
    let pool = connect("sqlite::memory:").await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    AppState::with_config(pool, &test_config(data_dir, report_dir)).expect("state")
}

#[tokio::test]
async fn ingest_filters_dedups_and_persists() {
    let data = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    seed_snapshots(data.path());
    let state = setup(data.path(), reports.path()).await;

    let result = state.ingest(data.path()).await.expect("ingest");
    let stats = &result.outcome.stats;

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.non_industrial, 2);
    assert_eq!(stats.kept, 4);
    assert_eq!(result.inserted, 4);

    let stored = state.stored_records().await.expect("records");
    assert_eq!(stored.len(), 4);

    let welder = stored.iter().find(|r| r.external_id.as_deref() == Some("105")).unwrap();
    assert_eq!(welder.employer_name.as_deref(), Some("Стройзавод"));
    assert!(welder.employer_trusted);
    assert_eq!(welder.area, None);
    assert!(!welder.has_salary);

    let turner = stored.iter().find(|r| r.external_id.as_deref() == Some("102")).unwrap();
    assert_eq!(turner.title, "Токарь 5 разряда");
    assert_eq!(turner.position_level, Some(PositionLevel::Worker));
    assert_eq!(turner.salary_avg_rub, Some(84_000.0));

    let engineer = stored.iter().find(|r| r.external_id.as_deref() == Some("101")).unwrap();
    assert_eq!(engineer.industry_segment, Some(IndustrySegment::Chemical));
    assert_eq!(engineer.salary_avg_rub, Some(100_000.0));

    let operator = stored.iter().find(|r| r.external_id.is_none()).unwrap();
    assert_eq!(operator.region_name(), Some("Пермь"));
    assert_eq!(operator.salary_avg_rub, Some(57_000.0));

    let runs = state.vacancy_service.list_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].inserted, 4);
    assert!(runs[0].finished_at.is_some());
}

#[tokio::test]
async fn reingesting_the_same_files_inserts_nothing() {
    let data = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    seed_snapshots(data.path());
    let state = setup(data.path(), reports.path()).await;

    let first = state.ingest(data.path()).await.expect("first ingest");
    assert_eq!(first.inserted, 4);

    let second = state.ingest(data.path()).await.expect("second ingest");
    assert_eq!(second.inserted, 0);
    assert_eq!(second.outcome.stats.kept, 0);
    assert_eq!(state.vacancy_service.count().await.unwrap(), 4);
    assert_eq!(state.vacancy_service.list_runs().await.unwrap().len(), 2);
}

#[tokio::test]
async fn entity_encoded_titles_dedup_against_stored_rows() {
    let data = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    write_snapshot(
        data.path(),
        "2024-05-01_tula.json",
        json!([
            {
                "name": "Токарь &lt;b&gt;",
                "region": "Тула",
                "employer": {"name": "Оружейный завод"}
            }
        ]),
    );
    let state = setup(data.path(), reports.path()).await;

    let first = state.ingest(data.path()).await.expect("first ingest");
    assert_eq!(first.inserted, 1);
    let stored = state.stored_records().await.expect("records");
    assert_eq!(stored[0].title, "Токарь <b>");

    let second = state.ingest(data.path()).await.expect("second ingest");
    assert_eq!(second.outcome.stats.duplicates, 1);
    assert_eq!(second.outcome.stats.kept, 0);
    assert_eq!(second.inserted, 0);
    assert_eq!(state.vacancy_service.count().await.unwrap(), 1);
}

#[tokio::test]
async fn reports_are_written_after_ingest() {
    let data = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    seed_snapshots(data.path());
    let state = setup(data.path(), reports.path()).await;

    let result = state.ingest(data.path()).await.expect("ingest");
    let mut rng = rng_from_seed(Some(42));
    let paths = state.report(&result, &mut rng).await.expect("report");

    let markdown = std::fs::read_to_string(&paths.markdown).unwrap();
    assert!(markdown.contains("Промышленных вакансий | 4"));
    assert!(markdown.contains("Москва"));

    let rejected: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&paths.rejected).unwrap()).unwrap();
    let titles: Vec<&str> = rejected
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Бухгалтер", "Оператор колл-центра"]);

    let summary: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&paths.summary).unwrap()).unwrap();
    assert_eq!(summary["database"]["total_vacancies"], 4);
    assert!(std::fs::read(&paths.xlsx).unwrap().starts_with(b"PK"));
}

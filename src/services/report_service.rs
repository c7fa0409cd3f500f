use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::vacancy::VacancyRecord;
use crate::services::analytics_service::AnalyticsReport;
use crate::services::dedup_service::MergeStats;
use crate::services::export_service::ExportService;
use crate::services::pipeline_service::IngestStats;
use crate::services::quality_service::QualityReport;
use crate::services::statistics_service::{
    format_confidence_interval, format_proportion_confidence_interval, StatisticalSummary,
};
use crate::services::vacancy_service::DatabaseStats;

pub const MARKDOWN_FILE: &str = "report.md";
pub const TEXT_FILE: &str = "report.txt";
pub const SUMMARY_FILE: &str = "summary.json";
pub const XLSX_FILE: &str = "vacancies.xlsx";
pub const REJECTED_FILE: &str = "removed_non_industrial.json";

/// Everything a report renders, borrowed from the run that produced it.
#[derive(Debug, Serialize)]
pub struct ReportInput<'a> {
    pub run_id: &'a str,
    pub generated_at: DateTime<Utc>,
    pub ingest: &'a IngestStats,
    pub merge: &'a MergeStats,
    pub inserted: u64,
    pub database: &'a DatabaseStats,
    pub analytics: &'a AnalyticsReport,
    pub quality: &'a QualityReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub text: PathBuf,
    pub summary: PathBuf,
    pub xlsx: PathBuf,
    pub rejected: PathBuf,
}

fn rub(value: f64) -> String {
    format!("{:.0}", value)
}

fn fmt_err(e: std::fmt::Error) -> Error {
    Error::Internal(format!("Failed to render report: {}", e))
}

fn salary_group_md(out: &mut String, name: &str, s: &StatisticalSummary) -> std::fmt::Result {
    if s.n == 0 {
        return writeln!(out, "| {} | 0 | — | — | — |", name);
    }
    writeln!(
        out,
        "| {} | {} | {} | {} | [{}, {}] |",
        name,
        s.n,
        format_confidence_interval(&s.confidence_interval, "руб", 0),
        rub(s.median),
        rub(s.bootstrap_confidence_interval.ci_lower),
        rub(s.bootstrap_confidence_interval.ci_upper),
    )
}

pub fn render_markdown(input: &ReportInput<'_>) -> std::result::Result<String, std::fmt::Error> {
    let a = input.analytics;
    let s = &a.summary;
    let mut out = String::new();

    writeln!(out, "# Отчёт по промышленным вакансиям\n")?;
    writeln!(out, "- Запуск: `{}`", input.run_id)?;
    writeln!(out, "- Сформирован: {}\n", input.generated_at.format("%d.%m.%Y %H:%M UTC"))?;

    writeln!(out, "## Сбор и очистка данных\n")?;
    writeln!(out, "| Показатель | Значение |")?;
    writeln!(out, "|---|---|")?;
    let i = input.ingest;
    for (label, value) in [
        ("Обработано файлов", i.files_processed),
        ("Файлов с ошибками", i.files_failed),
        ("Прочитано записей", i.records_read),
        ("Некорректных записей", i.malformed),
        ("Дубликатов", i.duplicates),
        ("Непромышленных вакансий", i.non_industrial),
        ("Промышленных вакансий", i.kept),
        ("Добавлено в базу", input.inserted as usize),
    ] {
        writeln!(out, "| {} | {} |", label, value)?;
    }
    writeln!(out)?;

    writeln!(out, "## Сводные показатели\n")?;
    writeln!(out, "- Вакансий в базе: {}", s.total_vacancies)?;
    writeln!(
        out,
        "- С указанной зарплатой: {} ({})",
        s.with_salary,
        format_proportion_confidence_interval(&s.salary_coverage, 2)
    )?;
    if s.mean_salary.n > 0 {
        writeln!(
            out,
            "- Средняя зарплата: {}",
            format_confidence_interval(&s.mean_salary, "руб", 0)
        )?;
    }
    writeln!(out, "- Уникальных работодателей: {}", s.unique_employers)?;
    writeln!(out, "- Уникальных регионов: {}", s.unique_regions)?;
    writeln!(out, "- Уникальных навыков: {}\n", s.unique_skills)?;

    writeln!(out, "## Отраслевые сегменты\n")?;
    writeln!(out, "| Сегмент | Вакансий | Доля |")?;
    writeln!(out, "|---|---|---|")?;
    for share in &a.segments {
        writeln!(
            out,
            "| {} | {} | {} |",
            share.label,
            share.count,
            format_proportion_confidence_interval(&share.interval, 2)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Уровни позиций\n")?;
    writeln!(out, "| Уровень | Вакансий | С зарплатой | Средняя зарплата |")?;
    writeln!(out, "|---|---|---|---|")?;
    for level in &a.levels {
        let salary = if level.salary_count > 0 {
            format_confidence_interval(&level.interval, "руб", 0)
        } else {
            "—".to_string()
        };
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            level.label, level.count, level.salary_count, salary
        )?;
    }
    writeln!(out)?;

    let cmp = &a.salary_comparison;
    writeln!(out, "## Сравнение зарплат по квалификации\n")?;
    writeln!(out, "| Группа | n | Среднее | Медиана | Bootstrap ДИ |")?;
    writeln!(out, "|---|---|---|---|---|")?;
    salary_group_md(&mut out, "Высококвалифицированные", &cmp.high_qualified)?;
    salary_group_md(&mut out, "Среднеквалифицированные", &cmp.medium_qualified)?;
    if let Some(pct) = cmp.difference_pct {
        writeln!(out, "\nРазница средних: {} руб ({:+.1}%)", rub(cmp.difference), pct)?;
    }
    writeln!(out)?;

    writeln!(out, "## Регионы\n")?;
    if a.regions.is_empty() {
        writeln!(out, "Нет регионов с достаточным числом вакансий.")?;
    } else {
        writeln!(out, "| Регион | Вакансий | С зарплатой | Средняя зарплата |")?;
        writeln!(out, "|---|---|---|---|")?;
        for region in &a.regions {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                region.region,
                region.count,
                region.salary_count,
                region.mean_salary.map(rub).unwrap_or_else(|| "—".to_string())
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## Востребованные навыки\n")?;
    writeln!(out, "| # | Навык | Категория | Вакансий | Доля, % |")?;
    writeln!(out, "|---|---|---|---|---|")?;
    for (rank, skill) in a.top_skills.iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.1} |",
            rank + 1,
            skill.skill,
            skill.category,
            skill.vacancies,
            skill.share_pct
        )?;
    }
    writeln!(out)?;

    let d = &a.dynamics;
    writeln!(out, "## Динамика публикаций\n")?;
    writeln!(out, "| Месяц | Вакансий |")?;
    writeln!(out, "|---|---|")?;
    for (month, count) in &d.months {
        writeln!(out, "| {} | {} |", month, count)?;
    }
    if let Some(growth) = d.growth_rate {
        writeln!(out, "\nТемп роста за период: {:+.1}%", growth)?;
    }
    writeln!(
        out,
        "Линейный тренд: {:+.2} вакансий/мес (R² = {:.3})\n",
        d.trend.slope, d.trend.r_squared
    )?;

    let q = input.quality;
    writeln!(out, "## Качество данных\n")?;
    writeln!(out, "- Записей с ошибками валидации: {}", q.invalid_records)?;
    for (field, count) in &q.validation_failures {
        writeln!(out, "  - `{}`: {}", field, count)?;
    }
    writeln!(out, "- Без зарплаты: {}", q.missing_salary)?;
    writeln!(out, "- Без региона: {}", q.missing_region)?;
    writeln!(out, "- Без даты публикации: {}", q.missing_published_at)?;
    writeln!(out, "- Даты из будущего: {}", q.future_dated)?;
    writeln!(
        out,
        "- Выбросы зарплат (1.5×IQR): {} ({:.2}%)",
        q.salary_outliers, q.salary_outlier_pct
    )?;
    for recommendation in &q.recommendations {
        writeln!(out, "> {}", recommendation)?;
    }

    Ok(out)
}

pub fn render_text(input: &ReportInput<'_>) -> std::result::Result<String, std::fmt::Error> {
    let a = input.analytics;
    let rule = "=".repeat(72);
    let mut out = String::new();

    writeln!(out, "{}", rule)?;
    writeln!(out, "КОМПЛЕКСНЫЙ ОТЧЁТ ПО ПРОМЫШЛЕННЫМ ВАКАНСИЯМ")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "Дата: {}", input.generated_at.format("%d.%m.%Y %H:%M UTC"))?;
    writeln!(out, "Запуск: {}\n", input.run_id)?;

    writeln!(out, "ОБЩАЯ СТАТИСТИКА")?;
    writeln!(out, "• Всего вакансий: {}", input.database.total_vacancies)?;
    writeln!(out, "• С зарплатой: {}", input.database.with_salary)?;
    writeln!(out, "• Работодателей: {}", input.database.unique_employers)?;
    writeln!(out, "• Регионов: {}", input.database.unique_regions)?;
    writeln!(out, "• Навыков (уникальных): {}", input.database.unique_skills)?;
    writeln!(out, "• Добавлено за запуск: {}\n", input.inserted)?;

    writeln!(out, "ОТРАСЛЕВЫЕ СЕГМЕНТЫ")?;
    for share in &a.segments {
        writeln!(
            out,
            "• {}: {} ({})",
            share.label,
            share.count,
            format_proportion_confidence_interval(&share.interval, 1)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "УРОВНИ ПОЗИЦИЙ")?;
    for level in &a.levels {
        match level.mean_salary {
            Some(_) => writeln!(
                out,
                "• {}: {} вакансий, средняя зарплата {}",
                level.label,
                level.count,
                format_confidence_interval(&level.interval, "руб", 0)
            )?,
            None => writeln!(out, "• {}: {} вакансий", level.label, level.count)?,
        }
    }
    writeln!(out)?;

    let cmp = &a.salary_comparison;
    writeln!(out, "СРАВНЕНИЕ ЗАРПЛАТ")?;
    for (name, group) in [
        ("Высококвалифицированные", &cmp.high_qualified),
        ("Среднеквалифицированные", &cmp.medium_qualified),
    ] {
        if group.n > 0 {
            writeln!(
                out,
                "• {}: {} (n = {})",
                name,
                format_confidence_interval(&group.confidence_interval, "руб", 0),
                group.n
            )?;
        } else {
            writeln!(out, "• {}: нет данных", name)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "РЕГИОНЫ")?;
    for region in &a.regions {
        writeln!(out, "• {}: {}", region.region, region.count)?;
    }
    writeln!(out)?;

    writeln!(out, "ТОП НАВЫКОВ")?;
    for (rank, skill) in a.top_skills.iter().enumerate() {
        writeln!(out, "{:>2}. {}: {}", rank + 1, skill.skill, skill.vacancies)?;
    }
    writeln!(out)?;

    writeln!(out, "ДИНАМИКА")?;
    if let Some(growth) = a.dynamics.growth_rate {
        writeln!(out, "Темп роста за период: {:+.1}%", growth)?;
    }
    writeln!(out, "Тренд: {:+.2} вакансий/мес", a.dynamics.trend.slope)?;
    writeln!(out, "{}", rule)?;
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct ReportService {
    report_dir: PathBuf,
}

impl ReportService {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.report_dir.join(name);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Report written");
        Ok(path)
    }

    pub fn write_rejected(&self, rejected: &[VacancyRecord]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.report_dir)?;
        self.write(REJECTED_FILE, &serde_json::to_vec_pretty(rejected)?)
    }

    /// Writes every report for one run into the report directory.
    pub fn write_all(
        &self,
        input: &ReportInput<'_>,
        records: &[VacancyRecord],
        rejected: &[VacancyRecord],
    ) -> Result<ReportPaths> {
        std::fs::create_dir_all(&self.report_dir)?;

        let markdown = render_markdown(input).map_err(fmt_err)?;
        let text = render_text(input).map_err(fmt_err)?;
        let xlsx = ExportService::generate_vacancies_xlsx(records, &input.analytics.segments)?;

        Ok(ReportPaths {
            markdown: self.write(MARKDOWN_FILE, markdown.as_bytes())?,
            text: self.write(TEXT_FILE, text.as_bytes())?,
            summary: self.write(SUMMARY_FILE, &serde_json::to_vec_pretty(input)?)?,
            xlsx: self.write(XLSX_FILE, &xlsx)?,
            rejected: self.write_rejected(rejected)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classification::{IndustrySegment, PositionLevel};
    use crate::services::analytics_service::AnalyticsService;
    use crate::services::classifier_service::Classifier;
    use crate::services::quality_service::assess_quality;
    use crate::services::statistics_service::rng_from_seed;

    fn records() -> Vec<VacancyRecord> {
        (0..4)
            .map(|i| VacancyRecord {
                external_id: Some(i.to_string()),
                title: "Инженер-технолог".into(),
                employer_name: Some("Химзавод".into()),
                region: Some("Дзержинск".into()),
                salary_avg_rub: Some(80_000.0 + i as f64 * 10_000.0),
                has_salary: true,
                industry_segment: Some(IndustrySegment::Chemical),
                position_level: Some(PositionLevel::Engineer),
                skills: vec!["Контроль качества".into()],
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn writes_every_report() {
        let dir = tempfile::tempdir().unwrap();
        let records = records();
        let rejected = vec![VacancyRecord {
            title: "Бухгалтер".into(),
            ..Default::default()
        }];
        let analytics = AnalyticsService::default().analyze(
            &records,
            &Classifier::default(),
            &mut rng_from_seed(Some(5)),
        );
        let quality = assess_quality(&records, Utc::now());
        let ingest = IngestStats {
            kept: 4,
            ..Default::default()
        };
        let merge = MergeStats::default();
        let database = DatabaseStats::default();
        let input = ReportInput {
            run_id: "run-1",
            generated_at: Utc::now(),
            ingest: &ingest,
            merge: &merge,
            inserted: 4,
            database: &database,
            analytics: &analytics,
            quality: &quality,
        };

        let service = ReportService::new(dir.path().join("out"));
        let paths = service.write_all(&input, &records, &rejected).unwrap();

        let markdown = std::fs::read_to_string(&paths.markdown).unwrap();
        assert!(markdown.contains("## Отраслевые сегменты"));
        assert!(markdown.contains("Химическая"));
        assert!(markdown.contains("руб (95% ДИ)"));

        let summary: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths.summary).unwrap()).unwrap();
        assert_eq!(summary["inserted"], 4);
        assert_eq!(summary["analytics"]["summary"]["total_vacancies"], 4);

        let dumped: Vec<VacancyRecord> =
            serde_json::from_slice(&std::fs::read(&paths.rejected).unwrap()).unwrap();
        assert_eq!(dumped[0].title, "Бухгалтер");
        assert!(paths.xlsx.exists());
        assert!(std::fs::read_to_string(&paths.text).unwrap().contains("ТОП НАВЫКОВ"));
    }
}

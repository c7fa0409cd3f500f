use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::vacancy::VacancyRecord;
use crate::services::statistics_service::iqr_bounds;
use crate::utils::validation::failed_fields;

/// Share of outliers (percent) above which a recommendation is emitted.
const OUTLIER_WARNING_PCT: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub total: usize,
    pub invalid_records: usize,
    pub validation_failures: BTreeMap<String, usize>,
    pub missing_salary: usize,
    pub missing_region: usize,
    pub missing_published_at: usize,
    pub inverted_salary_ranges: usize,
    pub salary_outliers: usize,
    pub salary_outlier_pct: f64,
    pub outlier_bounds: Option<(f64, f64)>,
    pub future_dated: usize,
    pub recommendations: Vec<String>,
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Field validation, completeness and plausibility checks over a batch.
pub fn assess_quality(records: &[VacancyRecord], now: DateTime<Utc>) -> QualityReport {
    let mut report = QualityReport {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let failed = failed_fields(record);
        if !failed.is_empty() {
            report.invalid_records += 1;
        }
        for field in failed {
            *report.validation_failures.entry(field).or_default() += 1;
        }

        if !record.has_salary {
            report.missing_salary += 1;
        }
        if record.region_name().is_none() {
            report.missing_region += 1;
        }
        match record.published_at {
            None => report.missing_published_at += 1,
            Some(published) if published > now => report.future_dated += 1,
            Some(_) => {}
        }
        if let (Some(from), Some(to)) = (record.salary_from, record.salary_to) {
            if from > to {
                report.inverted_salary_ranges += 1;
            }
        }
    }

    let salaries: Vec<f64> = records.iter().filter_map(|r| r.salary_avg_rub).collect();
    if let Some((lo, hi)) = iqr_bounds(&salaries) {
        report.salary_outliers = salaries.iter().filter(|s| **s < lo || **s > hi).count();
        report.salary_outlier_pct = pct(report.salary_outliers, salaries.len());
        report.outlier_bounds = Some((lo, hi));
    }

    report.recommendations = recommendations(&report);
    report
}

fn recommendations(report: &QualityReport) -> Vec<String> {
    let mut out = Vec::new();
    if report.invalid_records > 0 {
        out.push(format!(
            "Записи с ошибками валидации: {} шт. Проверьте обязательные поля.",
            report.invalid_records
        ));
    }
    if report.salary_outlier_pct > OUTLIER_WARNING_PCT {
        out.push(format!(
            "Обнаружено {:.2}% выбросов в зарплатах. Рекомендуется анализ аномалий.",
            report.salary_outlier_pct
        ));
    }
    if report.future_dated > 0 {
        out.push(format!(
            "Обнаружены вакансии с датами из будущего: {} шт.",
            report.future_dated
        ));
    }
    if report.inverted_salary_ranges > 0 {
        out.push(format!(
            "Обнаружены нелогичные диапазоны зарплат: {} шт.",
            report.inverted_salary_ranges
        ));
    }
    if pct(report.missing_salary, report.total) > 50.0 {
        out.push(format!(
            "Зарплата не указана в {:.1}% вакансий.",
            pct(report.missing_salary, report.total)
        ));
    }
    out
}

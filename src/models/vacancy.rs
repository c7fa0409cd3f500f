use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use crate::models::classification::{IndustrySegment, PositionLevel};

/// A vacancy as it moves through the pipeline. The trailing fields are derived
/// by normalisation and classification and stay empty until then.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct VacancyRecord {
    pub external_id: Option<String>,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub employer_name: Option<String>,
    pub employer_id: Option<String>,
    pub employer_trusted: bool,
    pub area: Option<String>,
    pub region: Option<String>,
    #[validate(range(min = 0.0))]
    pub salary_from: Option<f64>,
    #[validate(range(min = 0.0))]
    pub salary_to: Option<f64>,
    pub salary_currency: Option<String>,
    pub experience: Option<String>,
    pub schedule: Option<String>,
    pub employment: Option<String>,
    pub requirement: Option<String>,
    pub responsibility: Option<String>,
    pub skills: Vec<String>,
    pub professional_roles: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub collection_method: Option<String>,

    pub industry_segment: Option<IndustrySegment>,
    pub position_level: Option<PositionLevel>,
    pub salary_avg_rub: Option<f64>,
    pub has_salary: bool,
    pub industrial_keywords: Vec<String>,
}

impl VacancyRecord {
    /// Region used for grouping: explicit region first, then the posting area.
    pub fn region_name(&self) -> Option<&str> {
        self.region
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.area.as_deref().filter(|a| !a.trim().is_empty()))
    }

    pub fn snippet(&self) -> String {
        [self.requirement.as_deref(), self.responsibility.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vacancy {
    pub id: i64,
    pub dedup_key: String,
    pub external_id: Option<String>,
    pub title: String,
    pub employer_name: Option<String>,
    pub employer_id: Option<String>,
    pub employer_trusted: bool,
    pub area: Option<String>,
    pub region: Option<String>,
    pub salary_from: Option<f64>,
    pub salary_to: Option<f64>,
    pub salary_currency: Option<String>,
    pub salary_avg_rub: Option<f64>,
    pub has_salary: bool,
    pub experience: Option<String>,
    pub schedule: Option<String>,
    pub employment: Option<String>,
    pub industry_segment: IndustrySegment,
    pub position_level: PositionLevel,
    pub professional_roles: Option<String>,
    pub industrial_keywords: Option<String>,
    pub key_skills: Json<Vec<String>>,
    pub snippet_requirement: Option<String>,
    pub snippet_responsibility: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub collection_method: Option<String>,
    pub ingest_run_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Separator for list columns stored as a single text value.
pub const LIST_SEPARATOR: &str = "; ";

pub fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(LIST_SEPARATOR))
    }
}

pub fn split_list(joined: Option<&str>) -> Vec<String> {
    joined
        .map(|s| {
            s.split(LIST_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

impl Vacancy {
    /// Pipeline view of a stored row, used by analytics and reports.
    pub fn to_record(&self) -> VacancyRecord {
        VacancyRecord {
            external_id: self.external_id.clone(),
            title: self.title.clone(),
            employer_name: self.employer_name.clone(),
            employer_id: self.employer_id.clone(),
            employer_trusted: self.employer_trusted,
            area: self.area.clone(),
            region: self.region.clone(),
            salary_from: self.salary_from,
            salary_to: self.salary_to,
            salary_currency: self.salary_currency.clone(),
            experience: self.experience.clone(),
            schedule: self.schedule.clone(),
            employment: self.employment.clone(),
            requirement: self.snippet_requirement.clone(),
            responsibility: self.snippet_responsibility.clone(),
            skills: self.key_skills.0.clone(),
            professional_roles: split_list(self.professional_roles.as_deref()),
            published_at: self.published_at,
            collected_at: self.collected_at,
            collection_method: self.collection_method.clone(),
            industry_segment: Some(self.industry_segment),
            position_level: Some(self.position_level),
            salary_avg_rub: self.salary_avg_rub,
            has_salary: self.has_salary,
            industrial_keywords: split_list(self.industrial_keywords.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_falls_back_to_area() {
        let mut record = VacancyRecord {
            area: Some("Казань".into()),
            region: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(record.region_name(), Some("Казань"));
        record.region = Some("Татарстан".into());
        assert_eq!(record.region_name(), Some("Татарстан"));
    }

    #[test]
    fn list_columns_round_trip() {
        let roles = vec!["Сварщик".to_string(), "Слесарь".to_string()];
        assert_eq!(split_list(join_list(&roles).as_deref()), roles);
        assert_eq!(join_list(&[]), None);
        assert!(split_list(None).is_empty());
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::models::vacancy::VacancyRecord;
use crate::utils::text::{clean_opt, normalize, squash_whitespace};

/// Conversion rates to roubles. Unknown currencies convert at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRates {
    rates: HashMap<String, f64>,
}

impl Default for CurrencyRates {
    fn default() -> Self {
        let rates = [
            ("RUR", 1.0),
            ("RUB", 1.0),
            ("USD", 95.0),
            ("EUR", 100.0),
            ("KZT", 0.2),
            ("BYR", 30.0),
            ("UAH", 2.5),
            ("AZN", 55.0),
        ]
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate))
        .collect();
        Self { rates }
    }
}

impl CurrencyRates {
    pub fn rate(&self, currency: Option<&str>) -> f64 {
        currency
            .map(|c| c.trim().to_uppercase())
            .and_then(|c| self.rates.get(&c).copied())
            .unwrap_or(1.0)
    }

    pub fn with_rate(mut self, currency: &str, rate: f64) -> Self {
        self.rates.insert(currency.trim().to_uppercase(), rate);
        self
    }
}

/// Average monthly salary in roubles. A lone lower bound is scaled up by 1.2
/// and a lone upper bound down by 0.8. Non-positive bounds count as absent.
pub fn average_salary_rub(
    salary_from: Option<f64>,
    salary_to: Option<f64>,
    currency: Option<&str>,
    rates: &CurrencyRates,
) -> Option<f64> {
    let rate = rates.rate(currency);
    let bound = |v: Option<f64>| v.filter(|v| v.is_finite() && *v > 0.0).map(|v| v * rate);

    match (bound(salary_from), bound(salary_to)) {
        (Some(from), Some(to)) => Some((from + to) / 2.0),
        (Some(from), None) => Some(from * 1.2),
        (None, Some(to)) => Some(to * 0.8),
        (None, None) => None,
    }
}

pub fn experience_code(name: Option<&str>) -> &'static str {
    match name.map(normalize).as_deref() {
        Some("нет опыта") => "no_experience",
        Some("от 1 года до 3 лет") => "1-3_years",
        Some("от 3 до 6 лет") => "3-6_years",
        Some("более 6 лет") => "6+_years",
        Some("не имеет значения") => "any_experience",
        _ => "other_experience",
    }
}

pub fn employment_code(name: Option<&str>) -> &'static str {
    match name.map(normalize).as_deref() {
        Some("полная занятость") => "full_time",
        Some("частичная занятость") => "part_time",
        Some("проектная работа") => "project_work",
        Some("волонтерство") => "volunteer",
        Some("стажировка") => "internship",
        _ => "other_employment",
    }
}

pub fn schedule_code(name: Option<&str>) -> &'static str {
    match name.map(normalize).as_deref() {
        Some("полный день") => "full_day",
        Some("сменный график") => "shift_schedule",
        Some("гибкий график") => "flexible_schedule",
        Some("удаленная работа") => "remote_work",
        Some("вахтовый метод") => "shift_method",
        _ => "other_schedule",
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    rates: CurrencyRates,
}

impl Normalizer {
    pub fn new(rates: CurrencyRates) -> Self {
        Self { rates }
    }

    /// Cleans text fields and derives the rouble salary average in place.
    pub fn normalize(&self, record: &mut VacancyRecord) {
        record.title = squash_whitespace(&record.title);
        record.employer_name = clean_opt(record.employer_name.take());
        record.area = clean_opt(record.area.take());
        record.region = clean_opt(record.region.take());
        record.requirement = clean_opt(record.requirement.take().map(|s| squash_whitespace(&s)));
        record.responsibility = clean_opt(record.responsibility.take().map(|s| squash_whitespace(&s)));
        record.salary_currency = clean_opt(record.salary_currency.take()).map(|c| c.to_uppercase());

        let mut seen = HashSet::new();
        let mut skills: Vec<String> = Vec::with_capacity(record.skills.len());
        for skill in record.skills.drain(..) {
            let skill = skill.trim().to_string();
            if !skill.is_empty() && seen.insert(normalize(&skill)) {
                skills.push(skill);
            }
        }
        record.skills = skills;

        record.salary_avg_rub = average_salary_rub(
            record.salary_from,
            record.salary_to,
            record.salary_currency.as_deref(),
            &self.rates,
        );
        record.has_salary = record.salary_avg_rub.is_some_and(|v| v > 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_average_rules() {
        let rates = CurrencyRates::default();
        assert_eq!(average_salary_rub(Some(100.0), Some(200.0), Some("RUR"), &rates), Some(150.0));
        assert_eq!(average_salary_rub(Some(100.0), None, None, &rates), Some(120.0));
        assert_eq!(average_salary_rub(None, Some(100.0), None, &rates), Some(80.0));
        assert_eq!(average_salary_rub(None, None, Some("USD"), &rates), None);
        assert_eq!(average_salary_rub(Some(1000.0), Some(1000.0), Some("usd"), &rates), Some(95_000.0));
        assert_eq!(average_salary_rub(Some(-1.0), Some(100.0), None, &rates), Some(80.0));
    }

    #[test]
    fn unknown_currency_converts_at_par() {
        let rates = CurrencyRates::default();
        assert_eq!(rates.rate(Some("GEL")), 1.0);
        assert_eq!(rates.rate(None), 1.0);
        assert_eq!(rates.clone().with_rate("gel", 35.0).rate(Some("GEL")), 35.0);
    }

    #[test]
    fn categorical_codes() {
        assert_eq!(experience_code(Some("Нет опыта")), "no_experience");
        assert_eq!(experience_code(Some("От 1 года до 3 лет")), "1-3_years");
        assert_eq!(experience_code(None), "other_experience");
        assert_eq!(employment_code(Some("Стажировка")), "internship");
        assert_eq!(schedule_code(Some("Вахтовый метод")), "shift_method");
        assert_eq!(schedule_code(Some("Удалённая работа")), "remote_work");
        assert_eq!(schedule_code(Some("Свободный")), "other_schedule");
    }

    #[test]
    fn normalizer_fills_salary_and_cleans_text() {
        let mut record = VacancyRecord {
            title: "  Токарь   5 разряда ".into(),
            employer_name: Some("  ".into()),
            salary_from: Some(60_000.0),
            salary_currency: Some("rur".into()),
            skills: vec!["Сварка".into(), " ".into(), "Сварка".into(), "AutoCAD".into(), "autocad".into()],
            ..Default::default()
        };
        Normalizer::default().normalize(&mut record);
        assert_eq!(record.title, "Токарь 5 разряда");
        assert_eq!(record.employer_name, None);
        assert_eq!(record.salary_currency.as_deref(), Some("RUR"));
        assert_eq!(record.salary_avg_rub, Some(72_000.0));
        assert!(record.has_salary);
        assert_eq!(record.skills, vec!["Сварка", "AutoCAD"]);
    }

    #[test]
    fn no_salary_means_no_flag() {
        let mut record = VacancyRecord {
            title: "Слесарь".into(),
            ..Default::default()
        };
        Normalizer::default().normalize(&mut record);
        assert!(!record.has_salary);
        assert_eq!(record.salary_avg_rub, None);
    }

    #[test]
    fn normalizing_twice_keeps_decoded_markup() {
        let mut record = VacancyRecord {
            title: "Токарь <b>".into(),
            requirement: Some("Опыт &lt; 1 года".into()),
            ..Default::default()
        };
        let normalizer = Normalizer::default();
        normalizer.normalize(&mut record);
        normalizer.normalize(&mut record);
        assert_eq!(record.title, "Токарь <b>");
        assert_eq!(record.requirement.as_deref(), Some("Опыт &lt; 1 года"));
    }
}

use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::models::classification::{IndustrySegment, PositionLevel, SkillCategory};
use crate::models::vacancy::VacancyRecord;
use crate::services::classifier_service::Classifier;
use crate::services::normalization_service::{employment_code, experience_code, schedule_code};
use crate::services::statistics_service::{
    calculate_confidence_interval, calculate_proportion_confidence_interval,
    calculate_statistical_summary, linear_trend, mean, ConfidenceInterval, LinearTrend,
    ProportionInterval, StatisticalSummary, DEFAULT_BOOTSTRAP_RESAMPLES, DEFAULT_CONFIDENCE_LEVEL,
};
use crate::utils::text::normalize;
use crate::utils::time::month_key;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSettings {
    pub confidence_level: f64,
    pub bootstrap_resamples: usize,
    pub salary_min: f64,
    pub salary_max: f64,
    pub region_min_vacancies: usize,
    pub top_regions: usize,
    pub top_skills: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            bootstrap_resamples: DEFAULT_BOOTSTRAP_RESAMPLES,
            salary_min: 20_000.0,
            salary_max: 1_000_000.0,
            region_min_vacancies: 50,
            top_regions: 15,
            top_skills: 20,
        }
    }
}

impl From<&Config> for AnalyticsSettings {
    fn from(config: &Config) -> Self {
        Self {
            confidence_level: config.confidence_level,
            bootstrap_resamples: config.bootstrap_resamples,
            salary_min: config.salary_min,
            salary_max: config.salary_max,
            region_min_vacancies: config.region_min_vacancies,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentShare {
    pub segment: IndustrySegment,
    pub label: String,
    pub count: usize,
    pub interval: ProportionInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSalary {
    pub level: PositionLevel,
    pub label: String,
    pub count: usize,
    pub salary_count: usize,
    pub mean_salary: Option<f64>,
    pub interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryComparison {
    pub high_qualified: StatisticalSummary,
    pub medium_qualified: StatisticalSummary,
    /// Mean difference, high minus medium.
    pub difference: f64,
    pub difference_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStat {
    pub region: String,
    pub count: usize,
    pub salary_count: usize,
    pub mean_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub category: SkillCategory,
    pub vacancies: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyDynamics {
    pub months: Vec<(String, usize)>,
    pub growth_rate: Option<f64>,
    pub trend: LinearTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_vacancies: usize,
    pub with_salary: usize,
    pub salary_coverage: ProportionInterval,
    pub mean_salary: ConfidenceInterval,
    pub unique_employers: usize,
    pub unique_regions: usize,
    pub unique_skills: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoricalBreakdown {
    pub experience: Vec<(String, usize)>,
    pub employment: Vec<(String, usize)>,
    pub schedule: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub summary: SummaryMetrics,
    pub segments: Vec<SegmentShare>,
    pub levels: Vec<LevelSalary>,
    pub salary_comparison: SalaryComparison,
    pub regions: Vec<RegionStat>,
    pub top_skills: Vec<SkillCount>,
    pub dynamics: MonthlyDynamics,
    pub categorical: CategoricalBreakdown,
}

fn sorted_counts<'a, I>(keys: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsService {
    settings: AnalyticsSettings,
}

impl AnalyticsService {
    pub fn new(settings: AnalyticsSettings) -> Self {
        Self { settings }
    }

    fn bounded_salary(&self, record: &VacancyRecord) -> Option<f64> {
        record
            .salary_avg_rub
            .filter(|s| *s >= self.settings.salary_min && *s <= self.settings.salary_max)
    }

    fn bounded_salaries<'a, I>(&self, records: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a VacancyRecord>,
    {
        records
            .into_iter()
            .filter_map(|r| self.bounded_salary(r))
            .collect()
    }

    #[instrument(skip_all, fields(records = records.len()))]
    pub fn analyze<R: Rng>(
        &self,
        records: &[VacancyRecord],
        classifier: &Classifier,
        rng: &mut R,
    ) -> AnalyticsReport {
        let report = AnalyticsReport {
            summary: self.summary_metrics(records),
            segments: self.segment_distribution(records),
            levels: self.position_levels(records),
            salary_comparison: self.salary_comparison(records, rng),
            regions: self.regional_distribution(records),
            top_skills: self.top_skills(records, classifier),
            dynamics: self.monthly_dynamics(records),
            categorical: self.categorical_breakdown(records),
        };
        debug!(
            segments = report.segments.len(),
            regions = report.regions.len(),
            "Analytics computed"
        );
        report
    }

    pub fn segment_distribution(&self, records: &[VacancyRecord]) -> Vec<SegmentShare> {
        let total = records.len();
        let mut counts: HashMap<IndustrySegment, usize> = HashMap::new();
        for record in records {
            *counts
                .entry(record.industry_segment.unwrap_or_default())
                .or_default() += 1;
        }

        let mut shares: Vec<SegmentShare> = IndustrySegment::ALL
            .iter()
            .filter_map(|segment| {
                let count = counts.get(segment).copied().unwrap_or(0);
                (count > 0).then(|| SegmentShare {
                    segment: *segment,
                    label: segment.label().to_string(),
                    count,
                    interval: calculate_proportion_confidence_interval(
                        count,
                        total,
                        self.settings.confidence_level,
                    ),
                })
            })
            .collect();
        shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.segment.cmp(&b.segment)));
        shares
    }

    pub fn position_levels(&self, records: &[VacancyRecord]) -> Vec<LevelSalary> {
        PositionLevel::ALL
            .iter()
            .filter_map(|level| {
                let group: Vec<&VacancyRecord> = records
                    .iter()
                    .filter(|r| r.position_level.unwrap_or_default() == *level)
                    .collect();
                if group.is_empty() {
                    return None;
                }
                let salaries = self.bounded_salaries(group.iter().copied());
                let interval =
                    calculate_confidence_interval(&salaries, self.settings.confidence_level);
                Some(LevelSalary {
                    level: *level,
                    label: level.label().to_string(),
                    count: group.len(),
                    salary_count: salaries.len(),
                    mean_salary: (!salaries.is_empty()).then_some(interval.mean),
                    interval,
                })
            })
            .collect()
    }

    /// Engineers and management against workers and specialists.
    pub fn salary_comparison<R: Rng>(&self, records: &[VacancyRecord], rng: &mut R) -> SalaryComparison {
        let level = |r: &&VacancyRecord| r.position_level.unwrap_or_default();
        let high = self.bounded_salaries(records.iter().filter(|r| level(r).is_high_qualified()));
        let medium =
            self.bounded_salaries(records.iter().filter(|r| level(r).is_medium_qualified()));

        let level_ci = self.settings.confidence_level;
        let resamples = self.settings.bootstrap_resamples;
        let high_qualified = calculate_statistical_summary(&high, level_ci, resamples, rng);
        let medium_qualified = calculate_statistical_summary(&medium, level_ci, resamples, rng);

        let difference = high_qualified.mean - medium_qualified.mean;
        let difference_pct = (medium_qualified.mean > 0.0 && high_qualified.n > 0)
            .then(|| difference / medium_qualified.mean * 100.0);

        SalaryComparison {
            high_qualified,
            medium_qualified,
            difference,
            difference_pct,
        }
    }

    /// Regions with at least the configured number of vacancies, largest first.
    pub fn regional_distribution(&self, records: &[VacancyRecord]) -> Vec<RegionStat> {
        let mut groups: BTreeMap<&str, Vec<&VacancyRecord>> = BTreeMap::new();
        for record in records {
            if let Some(region) = record.region_name() {
                groups.entry(region.trim()).or_default().push(record);
            }
        }

        let mut regions: Vec<RegionStat> = groups
            .into_iter()
            .filter(|(_, group)| group.len() >= self.settings.region_min_vacancies)
            .map(|(region, group)| {
                let salaries = self.bounded_salaries(group.iter().copied());
                RegionStat {
                    region: region.to_string(),
                    count: group.len(),
                    salary_count: salaries.len(),
                    mean_salary: (!salaries.is_empty()).then(|| mean(&salaries)),
                }
            })
            .collect();
        regions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.region.cmp(&b.region)));
        regions.truncate(self.settings.top_regions);
        regions
    }

    /// Most requested skills, counting each vacancy once per skill.
    pub fn top_skills(&self, records: &[VacancyRecord], classifier: &Classifier) -> Vec<SkillCount> {
        let mut counts: HashMap<String, (String, usize)> = HashMap::new();
        for record in records {
            let mut seen = HashSet::new();
            for skill in &record.skills {
                let key = normalize(skill);
                if key.is_empty() || !seen.insert(key.clone()) {
                    continue;
                }
                counts.entry(key).or_insert_with(|| (skill.trim().to_string(), 0)).1 += 1;
            }
        }

        let mut skills: Vec<SkillCount> = counts
            .into_values()
            .map(|(skill, vacancies)| SkillCount {
                category: classifier.categorize_skill(&skill),
                share_pct: vacancies as f64 / records.len().max(1) as f64 * 100.0,
                skill,
                vacancies,
            })
            .collect();
        skills.sort_by(|a, b| b.vacancies.cmp(&a.vacancies).then_with(|| a.skill.cmp(&b.skill)));
        skills.truncate(self.settings.top_skills);
        skills
    }

    pub fn monthly_dynamics(&self, records: &[VacancyRecord]) -> MonthlyDynamics {
        let mut months: BTreeMap<String, usize> = BTreeMap::new();
        for published in records.iter().filter_map(|r| r.published_at.as_ref()) {
            *months.entry(month_key(published)).or_default() += 1;
        }
        let months: Vec<(String, usize)> = months.into_iter().collect();

        let growth_rate = match (months.first(), months.last()) {
            (Some((_, first)), Some((_, last))) if months.len() > 1 && *first > 0 => {
                Some((*last as f64 - *first as f64) / *first as f64 * 100.0)
            }
            _ => None,
        };
        let counts: Vec<f64> = months.iter().map(|(_, c)| *c as f64).collect();

        MonthlyDynamics {
            trend: linear_trend(&counts),
            growth_rate,
            months,
        }
    }

    pub fn summary_metrics(&self, records: &[VacancyRecord]) -> SummaryMetrics {
        let total = records.len();
        let with_salary = records.iter().filter(|r| r.has_salary).count();
        let salaries = self.bounded_salaries(records);

        let unique = |f: fn(&VacancyRecord) -> Option<String>| {
            records
                .iter()
                .filter_map(f)
                .filter(|v| !v.is_empty())
                .collect::<HashSet<_>>()
                .len()
        };

        SummaryMetrics {
            total_vacancies: total,
            with_salary,
            salary_coverage: calculate_proportion_confidence_interval(
                with_salary,
                total,
                self.settings.confidence_level,
            ),
            mean_salary: calculate_confidence_interval(&salaries, self.settings.confidence_level),
            unique_employers: unique(|r| r.employer_name.as_deref().map(normalize)),
            unique_regions: unique(|r| r.region_name().map(normalize)),
            unique_skills: records
                .iter()
                .flat_map(|r| r.skills.iter().map(|s| normalize(s)))
                .filter(|s| !s.is_empty())
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    pub fn categorical_breakdown(&self, records: &[VacancyRecord]) -> CategoricalBreakdown {
        CategoricalBreakdown {
            experience: sorted_counts(records.iter().map(|r| experience_code(r.experience.as_deref()))),
            employment: sorted_counts(records.iter().map(|r| employment_code(r.employment.as_deref()))),
            schedule: sorted_counts(records.iter().map(|r| schedule_code(r.schedule.as_deref()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::statistics_service::rng_from_seed;
    use chrono::{TimeZone, Utc};

    fn rec(
        segment: IndustrySegment,
        level: PositionLevel,
        salary: Option<f64>,
        region: &str,
        month: u32,
    ) -> VacancyRecord {
        VacancyRecord {
            title: "Вакансия".into(),
            employer_name: Some(format!("Работодатель {}", month)),
            region: Some(region.into()),
            industry_segment: Some(segment),
            position_level: Some(level),
            salary_avg_rub: salary,
            has_salary: salary.is_some(),
            published_at: Some(Utc.with_ymd_and_hms(2024, month, 10, 12, 0, 0).unwrap()),
            skills: vec!["Сварка".into(), "сварка".into(), "AutoCAD".into()],
            experience: Some("Нет опыта".into()),
            ..Default::default()
        }
    }

    fn service() -> AnalyticsService {
        AnalyticsService::new(AnalyticsSettings {
            region_min_vacancies: 2,
            bootstrap_resamples: 200,
            ..Default::default()
        })
    }

    fn sample() -> Vec<VacancyRecord> {
        use IndustrySegment::*;
        use PositionLevel::*;
        vec![
            rec(Machinery, Engineer, Some(120_000.0), "Москва", 1),
            rec(Machinery, Engineer, Some(140_000.0), "Москва", 1),
            rec(Machinery, Worker, Some(60_000.0), "Москва", 2),
            rec(Energy, Worker, Some(70_000.0), "Пермь", 2),
            rec(Energy, Specialist, Some(5_000.0), "Пермь", 3),
            rec(IndustrySegment::Other, Executive, None, "Тула", 3),
        ]
    }

    #[test]
    fn segments_sum_to_total() {
        let shares = service().segment_distribution(&sample());
        assert_eq!(shares[0].segment, IndustrySegment::Machinery);
        assert_eq!(shares.iter().map(|s| s.count).sum::<usize>(), 6);
        assert!((shares[0].interval.percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn level_salaries_respect_bounds() {
        let levels = service().position_levels(&sample());
        let specialist = levels.iter().find(|l| l.level == PositionLevel::Specialist).unwrap();
        assert_eq!(specialist.count, 1);
        assert_eq!(specialist.salary_count, 0);
        assert_eq!(specialist.mean_salary, None);

        let engineer = levels.iter().find(|l| l.level == PositionLevel::Engineer).unwrap();
        assert_eq!(engineer.mean_salary, Some(130_000.0));
    }

    #[test]
    fn comparison_splits_qualification_groups() {
        let mut rng = rng_from_seed(Some(11));
        let cmp = service().salary_comparison(&sample(), &mut rng);
        assert_eq!(cmp.high_qualified.n, 2);
        assert_eq!(cmp.medium_qualified.n, 2);
        assert_eq!(cmp.difference, 130_000.0 - 65_000.0);
        assert_eq!(cmp.difference_pct, Some(100.0));
    }

    #[test]
    fn regions_below_threshold_are_dropped() {
        let regions = service().regional_distribution(&sample());
        let names: Vec<_> = regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, vec!["Москва", "Пермь"]);
        assert_eq!(regions[1].mean_salary, Some(70_000.0));
    }

    #[test]
    fn skills_count_each_vacancy_once() {
        let skills = service().top_skills(&sample(), &Classifier::default());
        assert_eq!(skills.len(), 2);
        assert!(skills.iter().all(|s| s.vacancies == 6));
        let welding = skills.iter().find(|s| s.skill == "Сварка").unwrap();
        assert_eq!(welding.category, SkillCategory::Production);
    }

    #[test]
    fn dynamics_growth_and_trend() {
        let dynamics = service().monthly_dynamics(&sample());
        assert_eq!(
            dynamics.months,
            vec![("2024-01".to_string(), 2), ("2024-02".to_string(), 2), ("2024-03".to_string(), 2)]
        );
        assert_eq!(dynamics.growth_rate, Some(0.0));
        assert_eq!(dynamics.trend.slope, 0.0);
    }

    #[test]
    fn summary_and_empty_input() {
        let summary = service().summary_metrics(&sample());
        assert_eq!(summary.total_vacancies, 6);
        assert_eq!(summary.with_salary, 5);
        assert_eq!(summary.mean_salary.n, 4);
        assert_eq!(summary.unique_regions, 3);
        assert_eq!(summary.unique_skills, 2);

        let mut rng = rng_from_seed(Some(1));
        let empty = service().analyze(&[], &Classifier::default(), &mut rng);
        assert_eq!(empty.summary.total_vacancies, 0);
        assert_eq!(empty.summary.salary_coverage.ci_upper, 0.0);
        assert!(empty.segments.is_empty());
        assert!(empty.dynamics.growth_rate.is_none());
    }

    #[test]
    fn categorical_codes_are_counted() {
        let breakdown = service().categorical_breakdown(&sample());
        assert_eq!(breakdown.experience, vec![("no_experience".to_string(), 6)]);
        assert_eq!(breakdown.schedule, vec![("other_schedule".to_string(), 6)]);
    }
}

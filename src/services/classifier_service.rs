use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::classification::{IndustrySegment, PositionLevel, SkillCategory};
use crate::models::vacancy::VacancyRecord;
use crate::utils::text::normalize;

/// Keywords at or below this length only match whole words.
const SHORT_KEYWORD_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup<T> {
    pub category: T,
    pub keywords: Vec<String>,
}

fn group<T>(category: T, keywords: &[&str]) -> KeywordGroup<T> {
    KeywordGroup {
        category,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn list(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|k| k.to_string()).collect()
}

/// Keyword tables driving every classification decision. Group order is
/// significant: the first matching group wins. Position levels are listed
/// from most to least senior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    pub segments: Vec<KeywordGroup<IndustrySegment>>,
    pub levels: Vec<KeywordGroup<PositionLevel>>,
    pub skill_categories: Vec<KeywordGroup<SkillCategory>>,
    pub industrial: Vec<String>,
    pub production_operators: Vec<String>,
    pub office_operators: Vec<String>,
    pub exclusions: Vec<String>,
    pub marker_words: Vec<String>,
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            segments: vec![
                group(
                    IndustrySegment::Machinery,
                    &[
                        "машиностроение",
                        "станкостроение",
                        "автомобилестроение",
                        "авиастроение",
                        "судостроение",
                        "оборонпром",
                        "вагоностроение",
                    ],
                ),
                group(
                    IndustrySegment::Metallurgy,
                    &[
                        "металлург",
                        "сталевар",
                        "прокат",
                        "литейщ",
                        "металлообработк",
                        "ковк",
                        "штампов",
                        "прессов",
                    ],
                ),
                group(
                    IndustrySegment::Chemical,
                    &[
                        "химик",
                        "лаборант",
                        "технолог хими",
                        "нефтехим",
                        "полимер",
                        "пластмасс",
                        "резинотехническ",
                        "лакокрасочн",
                    ],
                ),
                group(
                    IndustrySegment::Energy,
                    &[
                        "энергетик",
                        "электрик",
                        "электромонтер",
                        "электромеханик",
                        "релейщик",
                        "электроэнергетик",
                        "теплоэнергетик",
                    ],
                ),
                group(
                    IndustrySegment::OilGas,
                    &[
                        "нефть",
                        "газ",
                        "газов",
                        "газопровод",
                        "нефтегаз",
                        "буровик",
                        "нефтяник",
                        "нефтедобыча",
                        "нефтепереработк",
                        "трубопровод",
                    ],
                ),
                group(
                    IndustrySegment::Mining,
                    &[
                        "горняк",
                        "взрывник",
                        "проходчик",
                        "маркшейдер",
                        "обогатитель",
                        "шахт",
                        "рудник",
                        "карьер",
                    ],
                ),
                group(
                    IndustrySegment::Construction,
                    &[
                        "строитель",
                        "монтажник",
                        "каменщик",
                        "штукатур",
                        "маляр",
                        "кровельщик",
                        "арматурщик",
                        "бетонщик",
                    ],
                ),
                group(
                    IndustrySegment::Instrumentation,
                    &[
                        "кип",
                        "кипиа",
                        "приборист",
                        "асутп",
                        "автоматика",
                        "телемеханик",
                        "радиоэлектрон",
                        "электронщик",
                    ],
                ),
                group(
                    IndustrySegment::Woodworking,
                    &[
                        "деревообработк",
                        "столяр",
                        "плотник",
                        "лесник",
                        "лесозаготовк",
                        "мебельщ",
                        "паркетч",
                    ],
                ),
                group(
                    IndustrySegment::Food,
                    &[
                        "пищев",
                        "технолог пищев",
                        "аппаратчик пищев",
                        "оператор линии",
                        "мукомол",
                        "кондитер",
                        "маслодел",
                        "сыродел",
                    ],
                ),
            ],
            levels: vec![
                group(
                    PositionLevel::Executive,
                    &[
                        "генеральный",
                        "директор по развитию",
                        "технический директор",
                        "главный инженер",
                        "главный технолог",
                    ],
                ),
                group(
                    PositionLevel::Leadership,
                    &[
                        "начальник",
                        "руководитель",
                        "директор",
                        "заместитель",
                        "управляющ",
                        "прораб",
                        "мастер участка",
                    ],
                ),
                group(
                    PositionLevel::Engineer,
                    &["инженер", "конструктор", "проектировщик", "техник"],
                ),
                group(
                    PositionLevel::Specialist,
                    &[
                        "специалист",
                        "технолог",
                        "мастер",
                        "бригадир",
                        "механик",
                        "электрик",
                    ],
                ),
                group(
                    PositionLevel::Worker,
                    &[
                        "рабочий",
                        "оператор",
                        "грузчик",
                        "слесарь",
                        "токарь",
                        "фрезеровщик",
                        "сварщик",
                        "монтажник",
                        "электромонтер",
                        "наладчик",
                    ],
                ),
            ],
            skill_categories: vec![
                group(
                    SkillCategory::Technical,
                    &[
                        "autocad",
                        "solidworks",
                        "компас",
                        "черчение",
                        "чтение чертежей",
                        "техническое обслуживание",
                        "ремонт оборудования",
                        "наладка",
                    ],
                ),
                group(
                    SkillCategory::Production,
                    &[
                        "сварка",
                        "токарные работы",
                        "фрезерные работы",
                        "обработка металлов",
                        "литейное производство",
                        "прокатное производство",
                    ],
                ),
                group(
                    SkillCategory::Automation,
                    &[
                        "кип",
                        "кипиа",
                        "асутп",
                        "телемеханика",
                        "автоматизация",
                        "контрольно-измерительные приборы",
                        "средства автоматизации",
                    ],
                ),
                group(
                    SkillCategory::Electrical,
                    &[
                        "электромонтаж",
                        "электрооборудование",
                        "релейная защита",
                        "электроснабжение",
                        "силовая электроника",
                    ],
                ),
                group(
                    SkillCategory::Chemical,
                    &[
                        "химический анализ",
                        "лабораторные исследования",
                        "технологические процессы",
                        "контроль качества",
                        "метрология",
                    ],
                ),
                group(
                    SkillCategory::Management,
                    &[
                        "управление персоналом",
                        "планирование производства",
                        "отчетность",
                        "ведение документации",
                    ],
                ),
                group(
                    SkillCategory::Information,
                    &[
                        "1с",
                        "ms office",
                        "excel",
                        "word",
                        "электронная почта",
                        "делопроизводство",
                        "работа с базами данных",
                    ],
                ),
                group(
                    SkillCategory::Safety,
                    &[
                        "охрана труда",
                        "техника безопасности",
                        "промышленная безопасность",
                        "пожарная безопасность",
                        "электробезопасность",
                    ],
                ),
            ],
            industrial: list(&[
                "инженер",
                "техник",
                "механик",
                "электрик",
                "сварщик",
                "токарь",
                "фрезеровщик",
                "слесарь",
                "монтажник",
                "наладчик",
                "машинист",
                "технолог",
                "конструктор",
                "проектировщик",
                "оборудован",
                "производств",
                "цех",
                "цеха",
                "завод",
                "фабрика",
                "строитель",
                "монтаж",
                "ремонт",
                "обслуживан",
                "эксплуатац",
                "энергетик",
                "нефть",
                "газ",
                "хими",
                "металл",
                "горн",
                "бурильщик",
                "геолог",
                "обогатитель",
                "обогащен",
            ]),
            production_operators: list(&[
                "оператор линии",
                "оператор производств",
                "оператор станк",
                "оператор чпу",
                "оператор оборудован",
                "оператор установк",
                "оператор аппарат",
                "оператор машины",
                "оператор агрегат",
                "оператор технологич",
                "оператор цех",
                "оператор завод",
                "оператор фабрик",
                "машинист",
                "аппаратчик",
            ]),
            office_operators: list(&[
                "оператор кол-центра",
                "оператор колл-центра",
                "оператор call-центра",
                "оператор контакт-центра",
                "оператор пк",
                "оператор 1с",
                "оператор базы данных",
                "оператор горячей линии",
                "телефонный оператор",
            ]),
            exclusions: list(&[
                "devops",
                "разработчик",
                "программист",
                "it",
                "айти",
                "бухгалтер",
                "экономист",
                "финанс",
                "юрист",
                "адвокат",
                "менеджер по продажам",
                "маркетолог",
                "рекрутер",
                "hr",
                "врач",
                "медицинск",
                "фельдшер",
                "медсестра",
                "стоматолог",
                "преподаватель",
                "учитель",
                "тренер",
                "педагог",
                "продавец",
                "кассир",
                "консультант",
                "мерчандайзер",
                "водитель",
                "курьер",
                "логист",
                "экспедитор",
                "повар",
                "официант",
                "бариста",
                "бармен",
            ]),
            marker_words: list(&[
                "инженер",
                "технолог",
                "конструктор",
                "механик",
                "электрик",
                "сварщик",
                "токарь",
                "фрезеровщик",
                "наладчик",
                "оператор",
                "аппаратчик",
                "машинист",
                "монтажник",
                "ремонтник",
                "станочник",
            ]),
        }
    }
}

impl KeywordTables {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Built-in tables, or the override file when one is configured.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let tables = Self::from_json_file(path)?;
                info!(path = %path.display(), "Loaded keyword tables override");
                Ok(tables)
            }
            None => Ok(Self::default()),
        }
    }

    fn normalized(mut self) -> Self {
        let norm = |words: &mut Vec<String>| {
            *words = words
                .iter()
                .map(|w| normalize(w))
                .filter(|w| !w.is_empty())
                .collect();
        };
        self.segments.iter_mut().for_each(|g| norm(&mut g.keywords));
        self.levels.iter_mut().for_each(|g| norm(&mut g.keywords));
        self.skill_categories
            .iter_mut()
            .for_each(|g| norm(&mut g.keywords));
        norm(&mut self.industrial);
        norm(&mut self.production_operators);
        norm(&mut self.office_operators);
        norm(&mut self.exclusions);
        norm(&mut self.marker_words);
        self
    }
}

/// One compiled keyword. Short keywords match whole words only, longer ones
/// are stems matched anywhere in the text.
#[derive(Debug, Clone)]
enum Keyword {
    Stem(String),
    Word { text: String, re: Regex },
}

impl Keyword {
    fn compile(keyword: &str) -> Result<Self> {
        if keyword.chars().count() <= SHORT_KEYWORD_CHARS {
            let re = Regex::new(&format!(r"(?iu)\b{}\b", regex::escape(keyword)))?;
            Ok(Keyword::Word {
                text: keyword.to_string(),
                re,
            })
        } else {
            Ok(Keyword::Stem(keyword.to_string()))
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Keyword::Stem(text) | Keyword::Word { text, .. } => text,
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Keyword::Stem(stem) => text.contains(stem.as_str()),
            Keyword::Word { re, .. } => re.is_match(text),
        }
    }
}

fn compile_list(keywords: &[String]) -> Result<Vec<Keyword>> {
    keywords.iter().map(|k| Keyword::compile(k)).collect()
}

#[derive(Debug, Clone)]
struct CompiledGroup<T> {
    category: T,
    keywords: Vec<Keyword>,
}

fn compile_groups<T: Copy>(groups: &[KeywordGroup<T>]) -> Result<Vec<CompiledGroup<T>>> {
    groups
        .iter()
        .map(|g| {
            Ok(CompiledGroup {
                category: g.category,
                keywords: compile_list(&g.keywords)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
struct CompiledTables {
    segments: Vec<CompiledGroup<IndustrySegment>>,
    levels: Vec<CompiledGroup<PositionLevel>>,
    skill_categories: Vec<CompiledGroup<SkillCategory>>,
    industrial: Vec<Keyword>,
    production_operators: Vec<Keyword>,
    office_operators: Vec<Keyword>,
    exclusions: Vec<Keyword>,
    marker_words: Vec<Keyword>,
}

impl CompiledTables {
    fn compile(tables: &KeywordTables) -> Result<Self> {
        Ok(Self {
            segments: compile_groups(&tables.segments)?,
            levels: compile_groups(&tables.levels)?,
            skill_categories: compile_groups(&tables.skill_categories)?,
            industrial: compile_list(&tables.industrial)?,
            production_operators: compile_list(&tables.production_operators)?,
            office_operators: compile_list(&tables.office_operators)?,
            exclusions: compile_list(&tables.exclusions)?,
            marker_words: compile_list(&tables.marker_words)?,
        })
    }
}

fn any_match(text: &str, keywords: &[Keyword]) -> bool {
    !text.is_empty() && keywords.iter().any(|k| k.is_match(text))
}

fn first_group<T: Copy>(text: &str, groups: &[CompiledGroup<T>]) -> Option<T> {
    groups
        .iter()
        .find(|g| any_match(text, &g.keywords))
        .map(|g| g.category)
}

/// Stateless keyword classifier. Every decision is a pure function of the
/// tables it was built with.
#[derive(Debug, Clone)]
pub struct Classifier {
    tables: KeywordTables,
    compiled: CompiledTables,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordTables::default()).expect("built-in keyword tables")
    }
}

impl Classifier {
    pub fn new(tables: KeywordTables) -> Result<Self> {
        let tables = tables.normalized();
        let compiled = CompiledTables::compile(&tables)?;
        Ok(Self { tables, compiled })
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }

    /// Industrial-occupation filter. Production-operator phrases win over
    /// office-operator phrases, which win over exclusions, which win over
    /// generic industrial keywords.
    pub fn is_industrial(&self, title: &str, roles: &[String]) -> bool {
        let title = normalize(title);
        let t = &self.compiled;

        if any_match(&title, &t.production_operators) {
            return true;
        }
        if any_match(&title, &t.office_operators) {
            return false;
        }
        if any_match(&title, &t.exclusions) {
            return false;
        }
        if any_match(&title, &t.industrial) {
            return true;
        }
        roles
            .iter()
            .map(|r| normalize(r))
            .any(|r| any_match(&r, &t.industrial))
    }

    pub fn classify_segment(&self, title: &str, employer: Option<&str>) -> IndustrySegment {
        let text = normalize(&format!("{} {}", title, employer.unwrap_or_default()));
        first_group(&text, &self.compiled.segments).unwrap_or_default()
    }

    pub fn classify_position_level(&self, title: &str) -> PositionLevel {
        first_group(&normalize(title), &self.compiled.levels).unwrap_or_default()
    }

    pub fn categorize_skill(&self, name: &str) -> SkillCategory {
        first_group(&normalize(name), &self.compiled.skill_categories).unwrap_or_default()
    }

    /// Marker words found in the title or snippet, in table order.
    pub fn industrial_keywords(&self, title: &str, snippet: &str) -> Vec<String> {
        let text = normalize(&format!("{} {}", title, snippet));
        self.compiled
            .marker_words
            .iter()
            .filter(|k| k.is_match(&text))
            .map(|k| k.as_str().to_string())
            .collect()
    }

    /// Fills the derived classification fields of a record.
    pub fn classify(&self, record: &mut VacancyRecord) {
        record.industry_segment = Some(
            self.classify_segment(&record.title, record.employer_name.as_deref()),
        );
        record.position_level = Some(self.classify_position_level(&record.title));
        record.industrial_keywords = self.industrial_keywords(&record.title, &record.snippet());
    }

    pub fn is_industrial_record(&self, record: &VacancyRecord) -> bool {
        self.is_industrial(&record.title, &record.professional_roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::default()
    }

    #[test]
    fn empty_title_falls_back_to_defaults() {
        let c = classifier();
        assert!(!c.is_industrial("", &[]));
        assert_eq!(c.classify_segment("", None), IndustrySegment::Other);
        assert_eq!(c.classify_position_level(""), PositionLevel::Other);
        assert_eq!(c.categorize_skill(""), SkillCategory::Other);
        assert!(c.industrial_keywords("", "").is_empty());

        let mut record = VacancyRecord::default();
        c.classify(&mut record);
        assert_eq!(record.industry_segment, Some(IndustrySegment::Other));
        assert_eq!(record.position_level, Some(PositionLevel::Other));
    }

    #[test]
    fn operator_precedence() {
        let c = classifier();
        assert!(c.is_industrial("Оператор станков с ЧПУ", &[]));
        assert!(c.is_industrial("Оператор линии розлива", &[]));
        assert!(!c.is_industrial("Оператор колл-центра", &[]));
        assert!(!c.is_industrial("Оператор ПК", &[]));
        // production phrase beats an exclusion word
        assert!(c.is_industrial("Машинист экскаватора, водитель", &[]));
    }

    #[test]
    fn exclusions_beat_industrial_keywords() {
        let c = classifier();
        assert!(!c.is_industrial("Инженер-программист", &[]));
        assert!(!c.is_industrial("Бухгалтер на завод", &[]));
        assert!(!c.is_industrial("IT инженер", &[]));
        assert!(c.is_industrial("Инженер-конструктор", &[]));
    }

    #[test]
    fn roles_can_mark_a_vacancy_industrial() {
        let c = classifier();
        assert!(!c.is_industrial("Стажер", &[]));
        assert!(c.is_industrial("Стажер", &["Инженер-технолог".to_string()]));
    }

    #[test]
    fn short_keywords_need_whole_words() {
        let c = classifier();
        // "it" inside a longer word must not exclude
        assert!(c.is_industrial("Слесарь-ремонтник (Digital завод)", &[]));
        assert_eq!(
            c.classify_segment("Инженер КИП", None),
            IndustrySegment::Instrumentation
        );
        assert_eq!(c.categorize_skill("Работа в 1С"), SkillCategory::Information);
    }

    #[test]
    fn hyphen_separates_short_keywords() {
        let c = classifier();
        assert!(!c.is_industrial("IT-инженер", &[]));
        assert!(!c.is_industrial("HR-специалист на завод", &[]));
        assert!(!c.is_industrial("HR-менеджер", &[]));
        assert_eq!(
            c.classify_segment("Слесарь-КИП", None),
            IndustrySegment::Instrumentation
        );
        assert_eq!(
            c.classify_segment("Инженер-КИПиА", None),
            IndustrySegment::Instrumentation
        );
    }

    #[test]
    fn segment_uses_table_order_and_employer() {
        let c = classifier();
        assert_eq!(
            c.classify_segment("Сталевар", Some("Машиностроение Урала")),
            IndustrySegment::Machinery
        );
        assert_eq!(
            c.classify_segment("Лаборант", Some("ПАО Химпром")),
            IndustrySegment::Chemical
        );
        assert_eq!(
            c.classify_segment("Мастер смены", Some("Газпром нефть")),
            IndustrySegment::OilGas
        );
        assert_eq!(c.classify_segment("Кладовщик", None), IndustrySegment::Other);
    }

    #[test]
    fn position_levels_prefer_most_senior() {
        let c = classifier();
        assert_eq!(c.classify_position_level("Главный инженер"), PositionLevel::Executive);
        assert_eq!(
            c.classify_position_level("Технический директор"),
            PositionLevel::Executive
        );
        assert_eq!(c.classify_position_level("Мастер участка"), PositionLevel::Leadership);
        assert_eq!(
            c.classify_position_level("Заместитель начальника цеха"),
            PositionLevel::Leadership
        );
        assert_eq!(c.classify_position_level("Инженер-механик"), PositionLevel::Engineer);
        assert_eq!(c.classify_position_level("Технолог"), PositionLevel::Specialist);
        assert_eq!(c.classify_position_level("Сварщик НАКС"), PositionLevel::Worker);
        assert_eq!(c.classify_position_level("Кладовщик"), PositionLevel::Other);
    }

    #[test]
    fn extracts_marker_words() {
        let c = classifier();
        let found = c.industrial_keywords("Наладчик оборудования", "помощь технологу и механику");
        assert_eq!(found, vec!["технолог", "механик", "наладчик"]);
    }

    #[test]
    fn override_tables_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(
            &path,
            r#"{"segments": [{"category": "food", "keywords": ["Пекарь"]}]}"#,
        )
        .unwrap();

        let tables = KeywordTables::load(Some(&path)).unwrap();
        let c = Classifier::new(tables).unwrap();
        assert_eq!(c.classify_segment("ПЕКАРЬ", None), IndustrySegment::Food);
        // sections missing from the file keep their defaults
        assert_eq!(c.classify_position_level("Токарь"), PositionLevel::Worker);
    }
}

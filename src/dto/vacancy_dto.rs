use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::vacancy::VacancyRecord;
use crate::utils::text::{clean_opt, strip_html};
use crate::utils::time::parse_timestamp;

// Every field deserializer below goes through `Value` and never fails, so a
// single mistyped field costs that field only, never the whole posting.

fn deserialize_string_flexible<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => clean_opt(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn deserialize_f64_flexible<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => s
            .trim()
            .replace([' ', '\u{a0}'], "")
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    })
}

fn deserialize_bool_flexible<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "да"
        ),
        _ => false,
    })
}

/// Nested object that falls back to `None` when it has the wrong shape.
fn deserialize_lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value)
        .map_err(|e| debug!(error = %e, "Dropping mistyped nested field"))
        .ok())
}

/// Array of nested objects. Elements with the wrong shape are dropped, and a
/// non-array value yields an empty list.
fn deserialize_lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSalary {
    #[serde(default, deserialize_with = "deserialize_f64_flexible")]
    pub from: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_flexible")]
    pub to: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_flexible")]
    pub gross: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEmployer {
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_flexible")]
    pub trusted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnippet {
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub requirement: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub responsibility: Option<String>,
}

/// One element of an exported vacancy array. Unknown fields are ignored and
/// every known field tolerates `null`, absence and type drift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVacancy {
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub area: Option<NamedRef>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub collection_region: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub salary: Option<RawSalary>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub experience: Option<NamedRef>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub schedule: Option<NamedRef>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub employment: Option<NamedRef>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub employer: Option<RawEmployer>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub snippet: Option<RawSnippet>,
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub key_skills: Vec<NamedRef>,
    #[serde(default, deserialize_with = "deserialize_lenient_list")]
    pub professional_roles: Vec<NamedRef>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub collected_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_flexible")]
    pub collection_method: Option<String>,
}

fn ref_name(r: Option<NamedRef>) -> Option<String> {
    r.and_then(|r| r.name)
}

fn names(refs: Vec<NamedRef>) -> Vec<String> {
    refs.into_iter().filter_map(|r| r.name).collect()
}

impl From<RawVacancy> for VacancyRecord {
    fn from(raw: RawVacancy) -> Self {
        let salary = raw.salary.unwrap_or_default();
        let employer = raw.employer.unwrap_or_default();
        let snippet = raw.snippet.unwrap_or_default();

        let published_at = raw
            .published_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| raw.created_at.as_deref().and_then(parse_timestamp));

        Self {
            external_id: raw.id,
            title: raw.name.map(|n| strip_html(&n)).unwrap_or_default(),
            employer_name: employer.name,
            employer_id: employer.id,
            employer_trusted: employer.trusted,
            area: ref_name(raw.area),
            region: raw.region.or(raw.collection_region),
            salary_from: salary.from,
            salary_to: salary.to,
            salary_currency: salary.currency.map(|c| c.to_uppercase()),
            experience: ref_name(raw.experience),
            schedule: ref_name(raw.schedule),
            employment: ref_name(raw.employment),
            requirement: clean_opt(snippet.requirement.map(|s| strip_html(&s))),
            responsibility: clean_opt(snippet.responsibility.map(|s| strip_html(&s))),
            skills: names(raw.key_skills),
            professional_roles: names(raw.professional_roles),
            published_at,
            collected_at: raw.collected_at.as_deref().and_then(parse_timestamp),
            collection_method: raw.collection_method,
            ..Default::default()
        }
    }
}

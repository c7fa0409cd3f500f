use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub data_dir: PathBuf,
    pub report_dir: PathBuf,
    pub confidence_level: f64,
    pub bootstrap_resamples: usize,
    pub bootstrap_seed: Option<u64>,
    pub salary_min: f64,
    pub salary_max: f64,
    pub region_min_vacancies: usize,
    pub keywords_path: Option<PathBuf>,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            database_url: get_env("DATABASE_URL")?,
            data_dir: PathBuf::from(get_env("DATA_DIR")?),
            report_dir: env::var("REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("reports")),
            confidence_level: get_env_parse_or("CONFIDENCE_LEVEL", 0.95)?,
            bootstrap_resamples: get_env_parse_or("BOOTSTRAP_RESAMPLES", 1000)?,
            bootstrap_seed: get_env_parse_opt("BOOTSTRAP_SEED")?,
            salary_min: get_env_parse_or("SALARY_MIN", 20_000.0)?,
            salary_max: get_env_parse_or("SALARY_MAX", 1_000_000.0)?,
            region_min_vacancies: get_env_parse_or("REGION_MIN_VACANCIES", 50)?,
            keywords_path: env::var("KEYWORDS_PATH").ok().map(PathBuf::from),
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(Error::Config(format!(
                "CONFIDENCE_LEVEL must be within (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.salary_min >= self.salary_max {
            return Err(Error::Config(format!(
                "SALARY_MIN ({}) must be lower than SALARY_MAX ({})",
                self.salary_min, self.salary_max
            )));
        }
        if self.bootstrap_resamples == 0 {
            return Err(Error::Config(
                "BOOTSTRAP_RESAMPLES must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_opt<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(None),
    }
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_env_parse_opt(name)?.unwrap_or(default))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

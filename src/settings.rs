use std::path::PathBuf;
use std::time::Duration;

use chrono::Datelike;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::SetupError;

pub const DEFAULT_START_YEAR: i32 = 1994;
pub const DEFAULT_ARCHIVE_ROOT: &str = "https://www.sec.gov/Archives/";
pub const DEFAULT_DB_PATH: &str = "data/edgar.sqlite";
pub const DEFAULT_FORM_TYPES: &[&str] = &["8-k", "sc 13e4", "sc to-i", "425", "sc 13d", "sc 13d/a"];

/// Lines of descriptive header at the top of every `master.idx`.
pub const INDEX_PREAMBLE_LINES: usize = 11;

#[derive(Debug, Deserialize)]
struct RawSettings {
    start_year: i32,
    end_year: Option<i32>,
    end_quarter: Option<u8>,
    tracked_form_types: Vec<String>,
    worker_pool_size: Option<usize>,
    db_path: PathBuf,
    archive_root_url: String,
    user_agent: String,
    request_timeout_secs: u64,
    index_preamble_lines: usize,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub start_year: i32,
    pub end_year: i32,
    pub end_quarter: u8,
    pub tracked_form_types: Vec<String>,
    pub worker_pool_size: usize,
    pub db_path: PathBuf,
    pub archive_root_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub index_preamble_lines: usize,
}

impl Settings {
    /// Defaults, then `edgar.toml` (optional), then `EDGAR_*` environment variables.
    pub fn load() -> Result<Self, SetupError> {
        let raw: RawSettings = Config::builder()
            .set_default("start_year", DEFAULT_START_YEAR)?
            .set_default("tracked_form_types", DEFAULT_FORM_TYPES.to_vec())?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("archive_root_url", DEFAULT_ARCHIVE_ROOT)?
            .set_default("user_agent", concat!("edgar_scraper/", env!("CARGO_PKG_VERSION")))?
            .set_default("request_timeout_secs", 30)?
            .set_default("index_preamble_lines", INDEX_PREAMBLE_LINES as u64)?
            .add_source(File::with_name("edgar").required(false))
            .add_source(
                Environment::with_prefix("EDGAR")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("tracked_form_types"),
            )
            .build()?
            .try_deserialize()?;

        Ok(Self::resolve(raw))
    }

    fn resolve(raw: RawSettings) -> Self {
        let (year, quarter) = current_quarter();
        Settings {
            start_year: raw.start_year,
            end_year: raw.end_year.unwrap_or(year),
            end_quarter: raw.end_quarter.unwrap_or(quarter),
            tracked_form_types: normalize_form_types(raw.tracked_form_types),
            worker_pool_size: raw.worker_pool_size.unwrap_or_else(default_workers),
            db_path: raw.db_path,
            archive_root_url: with_trailing_slash(raw.archive_root_url),
            user_agent: raw.user_agent,
            request_timeout: Duration::from_secs(raw.request_timeout_secs),
            index_preamble_lines: raw.index_preamble_lines,
        }
    }

    /// Checked after CLI overrides have been applied.
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(1..=4).contains(&self.end_quarter) {
            return Err(SetupError::Config(format!(
                "end_quarter must be 1-4, got {}",
                self.end_quarter
            )));
        }
        if self.start_year > self.end_year {
            return Err(SetupError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if self.worker_pool_size == 0 {
            return Err(SetupError::Config("worker_pool_size must be at least 1".into()));
        }
        if self.tracked_form_types.is_empty() {
            return Err(SetupError::Config("tracked_form_types is empty".into()));
        }
        Ok(())
    }

    pub fn set_form_types(&mut self, forms: Vec<String>) {
        self.tracked_form_types = normalize_form_types(forms);
    }
}

/// Category keys compare case-insensitively; keep them lower-cased, trimmed
/// and free of repeats while preserving declaration order.
fn normalize_form_types(forms: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(forms.len());
    for form in forms {
        let key = form.trim().to_lowercase();
        if !key.is_empty() && !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn current_quarter() -> (i32, u8) {
    let today = chrono::Utc::now().date_naive();
    (today.year(), (today.month0() / 3 + 1) as u8)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

use crate::align::finalize::UnseededPolicy;
use crate::align::session::{parse_timezone, SessionWindow, SourceTz};
use crate::calendar::{calendar_for, FixedCalendar, TradingCalendar};
use crate::config::ConfigError;
use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "POLYGON_API_KEY";

fn parse_clock(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|_| ConfigError::InvalidTime(s.to_string()))
}

//aligner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    //exchange code resolved through the calendar module
    pub exchange: String,

    //exchange timezone and regular session, local wall clock
    pub timezone: String,
    pub session_open: String,
    pub session_last_bar: String,

    //how naive timestamps in raw files are read ("UTC" or an IANA name)
    pub source_timezone: String,

    //span, inferred from the data when absent
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    //price used for empty days before the first known close
    pub seed_close: Option<f64>,
    pub unseeded: UnseededPolicy,

    //explicit session list replacing the exchange rules
    pub calendar_file: Option<PathBuf>,
}

impl Default for AlignConfig {
    fn default() -> Self {
        AlignConfig {
            exchange: "XNYS".to_string(),
            timezone: "America/New_York".to_string(),
            session_open: "09:30".to_string(),
            session_last_bar: "15:59".to_string(),
            source_timezone: "UTC".to_string(),
            start: None,
            end: None,
            seed_close: None,
            unseeded: UnseededPolicy::Drop,
            calendar_file: None,
        }
    }
}

impl AlignConfig {
    pub fn session(&self) -> Result<SessionWindow, ConfigError> {
        let tz = parse_timezone(&self.timezone)?;
        let open = parse_clock(&self.session_open)?;
        let last_bar = parse_clock(&self.session_last_bar)?;
        Ok(SessionWindow::new(open, last_bar, tz)?)
    }

    pub fn source_tz(&self) -> Result<SourceTz, ConfigError> {
        Ok(SourceTz::parse(&self.source_timezone)?)
    }

    pub fn calendar(&self) -> anyhow::Result<Box<dyn TradingCalendar>> {
        match &self.calendar_file {
            Some(path) => Ok(Box::new(FixedCalendar::from_file(path)?)),
            None => Ok(calendar_for(&self.exchange)?),
        }
    }
}

//fetcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,

    //falls back to the POLYGON_API_KEY environment variable
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    pub max_attempts: u32,
    pub retry_base_delay_secs: f64,
    pub pacing_secs: f64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: "https://api.polygon.io".to_string(),
            api_key: None,
            start: None,
            end: None,
            max_attempts: 5,
            retry_base_delay_secs: 5.0,
            pacing_secs: 6.0,
            timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_base_delay_secs.max(0.0))
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs_f64(self.pacing_secs.max(0.0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

//settings of the fetch and align stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    pub raw_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub fetch: FetchConfig,
    pub align: AlignConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            tickers: Vec::new(),
            raw_dir: PathBuf::from("data/raw"),
            clean_dir: PathBuf::from("data/clean"),
            fetch: FetchConfig::default(),
            align: AlignConfig::default(),
        }
    }
}

impl PipelineConfig {
    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {:?}", path))?;
        let config: PipelineConfig = serde_json::from_str(&contents)
            .context(format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_is_nyse() {
        let session = AlignConfig::default().session().unwrap();
        assert_eq!(session, SessionWindow::nyse());
        assert_eq!(session.bars_per_day(), 390);
    }

    #[test]
    fn custom_session_and_bad_values() {
        let config = AlignConfig {
            timezone: "Europe/London".into(),
            session_open: "08:00".into(),
            session_last_bar: "16:29".into(),
            ..AlignConfig::default()
        };
        assert_eq!(config.session().unwrap().bars_per_day(), 510);

        let bad = AlignConfig {
            session_open: "half past nine".into(),
            ..AlignConfig::default()
        };
        assert!(matches!(bad.session(), Err(ConfigError::InvalidTime(_))));

        let bad_zone = AlignConfig {
            timezone: "Nowhere/City".into(),
            ..AlignConfig::default()
        };
        assert!(bad_zone.session().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"tickers": ["AAPL"], "align": {"unseeded": "backfill", "start": "2024-01-02"}}"#,
        )
        .unwrap();
        assert_eq!(config.tickers, vec!["AAPL".to_string()]);
        assert_eq!(config.align.unseeded, UnseededPolicy::Backfill);
        assert_eq!(config.align.exchange, "XNYS");
        assert_eq!(config.fetch.max_attempts, 5);
    }

    #[test]
    fn api_key_is_never_serialized() {
        let mut config = PipelineConfig::default();
        config.fetch.api_key = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let mut config = PipelineConfig::default();
        config.tickers = vec!["MSFT".into()];
        config.to_json_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), config);
    }
}

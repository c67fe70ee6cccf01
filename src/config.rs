use serde::Deserialize;
use std::path::PathBuf;
use config::builder::DefaultState;
use config::{Config as ConfigLoader, ConfigBuilder, Environment, File};

use crate::error::{AppError, Result};
use crate::http::submitter::parse_endpoint;
use crate::limiter::WindowUnit;

pub const DEFAULT_ENDPOINT: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";
const ENV_PREFIX: &str = "SUBMIT_GATE";
const CONFIG_FILE: &str = "submit-gate";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // General
    pub log_level: String,
    pub log_format: LogFormat,

    // API
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,

    // Rate limiting
    pub window_unit: WindowUnit,
    pub request_limit: usize,

    // Submission
    pub document_path: PathBuf,
    pub signature: String,
    pub repeat: usize,
}

impl Config {
    /// Loads `.env`, then an optional `submit-gate.{toml,yaml,json}`, then
    /// `SUBMIT_GATE_*` environment variables, later sources winning.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        Self::from_builder(builder)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = ConfigLoader::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("connect_timeout_ms", 2_000_i64)?
            .set_default("request_timeout_ms", 10_000_i64)?
            .set_default("window_unit", "seconds")?
            .set_default("request_limit", 10_i64)?
            .set_default("document_path", "document.json")?
            .set_default("signature", "")?
            .set_default("repeat", 1_i64)?;

        Ok(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.request_limit == 0 {
            return Err(invalid("request_limit must be greater than zero"));
        }
        if self.repeat == 0 {
            return Err(invalid("repeat must be greater than zero"));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(invalid("timeouts must be greater than zero"));
        }
        parse_endpoint(&self.endpoint)?;
        Ok(())
    }
}

fn invalid(msg: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_builder(Config::defaults().unwrap()).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.window_unit, WindowUnit::Seconds);
        assert_eq!(config.request_limit, 10);
        assert_eq!(config.repeat, 1);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.document_path, PathBuf::from("document.json"));
    }

    #[test]
    fn test_overrides() {
        let builder = Config::defaults()
            .unwrap()
            .set_override("window_unit", "minutes")
            .unwrap()
            .set_override("request_limit", 100_i64)
            .unwrap()
            .set_override("log_format", "json")
            .unwrap();

        let config = Config::from_builder(builder).unwrap();
        assert_eq!(config.window_unit, WindowUnit::Minutes);
        assert_eq!(config.request_limit, 100);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_zero_request_limit_is_rejected() {
        let builder = Config::defaults()
            .unwrap()
            .set_override("request_limit", 0_i64)
            .unwrap();
        assert!(matches!(Config::from_builder(builder), Err(AppError::Config(_))));
    }

    #[test]
    fn test_bad_endpoint_is_rejected() {
        let builder = Config::defaults()
            .unwrap()
            .set_override("endpoint", "ismp.crpt.ru/api")
            .unwrap();
        assert!(Config::from_builder(builder).is_err());
    }

    #[test]
    fn test_unknown_window_unit_is_rejected() {
        let builder = Config::defaults()
            .unwrap()
            .set_override("window_unit", "fortnights")
            .unwrap();
        assert!(matches!(Config::from_builder(builder), Err(AppError::Config(_))));
    }
}

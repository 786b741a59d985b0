//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use intake_core::engine::EngineConfig;
use intake_core::pipeline::{PipelineConfig, SearchConfig};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: String,
    pub google_places_api_key: String,
    pub chat_model: String,
    pub extraction_model: String,
    pub closing_turn: usize,
    pub generation_timeout: Duration,
    pub places_page_delay: Duration,
    pub pipeline_concurrency: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };
        let with_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Server, Database and Logging ---
        let bind_address = parse("BIND_ADDRESS", &with_default("BIND_ADDRESS", "0.0.0.0:3000"))?;
        let database_url = required("DATABASE_URL")?;

        let log_level_str = with_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- API Keys (all required) ---
        let openai_api_key = required("OPENAI_API_KEY")?;
        let google_places_api_key = required("GOOGLE_PLACES_API_KEY")?;

        // --- Conversation and Pipeline Settings ---
        let chat_model = with_default("CHAT_MODEL", "gpt-4o");
        let extraction_model = with_default("EXTRACTION_MODEL", "gpt-4o-mini");
        let closing_turn: usize = parse("CLOSING_TURN", &with_default("CLOSING_TURN", "14"))?;
        let timeout_secs: u64 = parse(
            "GENERATION_TIMEOUT_SECS",
            &with_default("GENERATION_TIMEOUT_SECS", "30"),
        )?;
        let page_delay_ms: u64 = parse(
            "PLACES_PAGE_DELAY_MS",
            &with_default("PLACES_PAGE_DELAY_MS", "2000"),
        )?;
        let pipeline_concurrency: usize = parse(
            "PIPELINE_CONCURRENCY",
            &with_default("PIPELINE_CONCURRENCY", "4"),
        )?;

        if closing_turn == 0 {
            return Err(ConfigError::InvalidValue(
                "CLOSING_TURN".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            google_places_api_key,
            chat_model,
            extraction_model,
            closing_turn,
            generation_timeout: Duration::from_secs(timeout_secs),
            places_page_delay: Duration::from_millis(page_delay_ms),
            pipeline_concurrency: pipeline_concurrency.max(1),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            closing_turn: self.closing_turn,
            generation_timeout: self.generation_timeout,
            ..EngineConfig::default()
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            search: SearchConfig {
                page_delay: self.places_page_delay,
                query_concurrency: self.pipeline_concurrency,
                ..SearchConfig::default()
            },
            application_concurrency: self.pipeline_concurrency,
        }
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

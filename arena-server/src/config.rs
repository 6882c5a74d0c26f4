use std::env;
use std::str::FromStr;
use std::time::Duration;

use arena_core::{
    DEFAULT_INVITE_TTL_SECONDS, DEFAULT_MAX_ENERGY, DEFAULT_REGEN_MINUTES,
    MAX_QUESTIONS_PER_BATTLE,
};
use arena_persistence::connection::DEFAULT_DATABASE_URL;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("AUTH_JWT_SECRET is required unless AUTH_DEV_MODE=true")]
    MissingJwtSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_dev_mode: bool,
    pub auth_jwt_secret: Option<String>,
    pub words_file: String,
    pub questions_per_battle: usize,
    pub question_time_limit_seconds: u64,
    pub invite_ttl_seconds: i64,
    pub energy_max: i32,
    pub energy_regen_minutes: i64,
    pub study_energy_cost: i32,
    pub ranked_match_window: i32,
    pub connection_timeout_seconds: u64,
    pub cleanup_interval_seconds: u64,
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}

fn check_range(name: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let auth_dev_mode = match lookup("AUTH_DEV_MODE") {
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "AUTH_DEV_MODE",
                        value: raw,
                    });
                }
            },
            None => false,
        };
        let auth_jwt_secret = lookup("AUTH_JWT_SECRET").filter(|secret| !secret.is_empty());
        if !auth_dev_mode && auth_jwt_secret.is_none() {
            return Err(ConfigError::MissingJwtSecret);
        }

        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "PORT", 8080)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            auth_dev_mode,
            auth_jwt_secret,
            words_file: lookup("WORDS_FILE").unwrap_or_else(|| "./data/words.tsv".to_string()),
            questions_per_battle: parse_var(&lookup, "QUESTIONS_PER_BATTLE", 10)?,
            question_time_limit_seconds: parse_var(&lookup, "QUESTION_TIME_LIMIT_SECONDS", 15)?,
            invite_ttl_seconds: parse_var(
                &lookup,
                "INVITE_TTL_SECONDS",
                DEFAULT_INVITE_TTL_SECONDS,
            )?,
            energy_max: parse_var(&lookup, "ENERGY_MAX", DEFAULT_MAX_ENERGY)?,
            energy_regen_minutes: parse_var(&lookup, "ENERGY_REGEN_MINUTES", DEFAULT_REGEN_MINUTES)?,
            study_energy_cost: parse_var(&lookup, "STUDY_ENERGY_COST", 10)?,
            ranked_match_window: parse_var(&lookup, "RANKED_MATCH_WINDOW", 100)?,
            connection_timeout_seconds: parse_var(&lookup, "CONNECTION_TIMEOUT_SECONDS", 300)?,
            cleanup_interval_seconds: parse_var(&lookup, "CLEANUP_INTERVAL_SECONDS", 30)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "QUESTIONS_PER_BATTLE",
            self.questions_per_battle as i64,
            1,
            MAX_QUESTIONS_PER_BATTLE as i64,
        )?;
        check_range(
            "QUESTION_TIME_LIMIT_SECONDS",
            self.question_time_limit_seconds as i64,
            1,
            300,
        )?;
        check_range("INVITE_TTL_SECONDS", self.invite_ttl_seconds, 1, 86_400)?;
        check_range("ENERGY_MAX", i64::from(self.energy_max), 1, 10_000)?;
        check_range("ENERGY_REGEN_MINUTES", self.energy_regen_minutes, 1, 1_440)?;
        check_range(
            "STUDY_ENERGY_COST",
            i64::from(self.study_energy_cost),
            0,
            i64::from(self.energy_max),
        )?;
        check_range("RANKED_MATCH_WINDOW", i64::from(self.ranked_match_window), 0, 10_000)?;
        check_range(
            "CLEANUP_INTERVAL_SECONDS",
            self.cleanup_interval_seconds as i64,
            1,
            3_600,
        )?;
        Ok(())
    }

    /// Defaults with dev-mode auth, for tests and local runs.
    pub fn for_development() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite::memory:".to_string(),
            auth_dev_mode: true,
            auth_jwt_secret: None,
            words_file: "./data/words.tsv".to_string(),
            questions_per_battle: 10,
            question_time_limit_seconds: 15,
            invite_ttl_seconds: DEFAULT_INVITE_TTL_SECONDS,
            energy_max: DEFAULT_MAX_ENERGY,
            energy_regen_minutes: DEFAULT_REGEN_MINUTES,
            study_energy_cost: 10,
            ranked_match_window: 100,
            connection_timeout_seconds: 300,
            cleanup_interval_seconds: 30,
        }
    }

    pub fn question_time_limit(&self) -> Duration {
        Duration::from_secs(self.question_time_limit_seconds)
    }

    pub fn energy_regen_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.energy_regen_minutes)
    }
}

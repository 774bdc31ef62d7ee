//! 환경 변수 기반 설정

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// 경매 생성 시 기본 진행 시간(분)
pub const DEFAULT_DURATION_MINUTES: u32 = 10;
/// 경매 진행 시간 허용 범위(분)
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub default_duration_minutes: u32,
    /// 시작 시 테이블을 지우고 다시 만든다
    pub reset_database: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let max_connections = parse_or("DB_MAX_CONNECTIONS", &lookup, DEFAULT_MAX_CONNECTIONS)?;
        let default_duration_minutes = parse_or(
            "DEFAULT_DURATION_MINUTES",
            &lookup,
            DEFAULT_DURATION_MINUTES,
        )?;
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&default_duration_minutes) {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_DURATION_MINUTES",
                value: default_duration_minutes.to_string(),
            });
        }
        let reset_database = parse_or("RESET_DATABASE", &lookup, false)?;

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            default_duration_minutes,
            reset_database,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Configuration management
///
/// Loads configuration from environment variables into a type-safe struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `FREE_USER_PROMPT_LIMIT`: Free-plan personal prompt cap (default: 10)
/// - `FREE_TEAM_PROMPT_LIMIT`: Free-plan team prompt cap (default: 25)
/// - `RUST_LOG`: Log filter (default: info)
use std::env;

use crate::db::pool::DatabaseConfig;
use crate::quota::QuotaConfig;

/// Complete engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Quota limits
    pub quota: QuotaConfig,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric variable
    /// fails to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10)?;

        let quota_defaults = QuotaConfig::default();
        let quota = QuotaConfig {
            free_user_prompt_limit: parse_env(
                "FREE_USER_PROMPT_LIMIT",
                quota_defaults.free_user_prompt_limit,
            )?,
            free_team_prompt_limit: parse_env(
                "FREE_TEAM_PROMPT_LIMIT",
                quota_defaults.free_team_prompt_limit,
            )?,
        };

        Ok(Config {
            database: DatabaseConfig {
                url,
                max_connections,
                ..Default::default()
            },
            quota,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

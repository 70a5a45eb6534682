//! Environment-driven configuration (spec.md §6), read the way the
//! teacher's `establish_connection` reads `DATABASE_URL`: `dotenv` first,
//! then plain `std::env::var`.

use std::env;

use crate::error::{IndexerError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Chain RPC endpoint.
    pub url: String,
    /// Expected chain name; checked hard against what the node reports.
    pub chain: String,
    pub start_block: u64,
    pub delay_block: u64,
    pub database_url: String,
    pub log_rotation_days: u64,
    pub log_retention_weeks: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Ok(Config {
            url: required("URL")?,
            chain: required("CHAIN")?,
            start_block: parse_required("START_BLOCK")?,
            delay_block: parse_required("DELAY_BLOCK")?,
            database_url: required("DATABASE_URL")?,
            log_rotation_days: env::var("ROTATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            log_retention_weeks: env::var("RETENTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| IndexerError::Config(format!("missing environment variable {}", key)))
}

fn parse_required(key: &str) -> Result<u64> {
    required(key)?
        .parse()
        .map_err(|_| IndexerError::Config(format!("{} must be an integer", key)))
}

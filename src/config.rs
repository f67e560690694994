//! Runtime configuration
//!
//! Read from the process environment (after `.env` is loaded by the
//! binaries). Everything has a default except the Gemini key; without it the
//! chat runs on the rule-based narrative only.

use crate::auth::{DEFAULT_HASH_COST, DEFAULT_SESSION_TTL_HOURS};
use crate::error::CashflowError;
use crate::risk::LadderPreset;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_PATH: &str = "data.json";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 15;
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";
/// Range bcrypt accepts for its work factor
const HASH_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_timeout: Duration,
    pub risk_ladder: LadderPreset,
    pub seed_demo_data: bool,
    pub password_hash_cost: u32,
    pub session_ttl: chrono::Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_timeout: Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
            risk_ladder: LadderPreset::Standard,
            seed_demo_data: false,
            password_hash_cost: DEFAULT_HASH_COST,
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(port) = get("PORT").or_else(|| get("API_PORT")) {
            config.port = port
                .parse()
                .map_err(|_| invalid("PORT", &port, "a port number"))?;
        }

        if let Some(path) = get("DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }

        config.gemini_api_key = get("GEMINI_API_KEY").filter(|k| k != PLACEHOLDER_API_KEY);

        if let Some(model) = get("GEMINI_MODEL") {
            config.gemini_model = model;
        }

        if let Some(secs) = get("GEMINI_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| invalid("GEMINI_TIMEOUT_SECS", &secs, "a positive number of seconds"))?;
            config.gemini_timeout = Duration::from_secs(secs);
        }

        if let Some(ladder) = get("RISK_LADDER") {
            config.risk_ladder = ladder.parse()?;
        }

        if let Some(flag) = get("SEED_DEMO_DATA") {
            config.seed_demo_data = parse_bool(&flag)
                .ok_or_else(|| invalid("SEED_DEMO_DATA", &flag, "true or false"))?;
        }

        if let Some(cost) = get("BCRYPT_COST") {
            config.password_hash_cost = cost
                .parse()
                .ok()
                .filter(|c| HASH_COST_RANGE.contains(c))
                .ok_or_else(|| invalid("BCRYPT_COST", &cost, "a bcrypt cost between 4 and 31"))?;
        }

        if let Some(hours) = get("SESSION_TTL_HOURS") {
            let hours: i64 = hours
                .parse()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| invalid("SESSION_TTL_HOURS", &hours, "a positive number of hours"))?;
            config.session_ttl = chrono::Duration::hours(hours);
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> CashflowError {
    CashflowError::ConfigError(format!(
        "{}='{}' is invalid, expected {}",
        key, value, expected
    ))
}

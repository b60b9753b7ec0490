//! Configuration module
//!
//! Loads configuration from environment variables.

use chrono::Weekday;
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub telegram_token: String,

    /// Chat that receives the reports
    pub group_chat_id: i64,

    /// Local hour (0-23) of the daily report
    pub report_hour: u32,

    /// Day of the weekly report
    pub weekly_report_day: Weekday,

    /// Minutes between the daily and the weekly trigger on report day
    pub weekly_offset_minutes: u32,

    /// Directory holding the snapshot file
    pub data_path: PathBuf,

    /// Keep counters when a report could not be delivered
    pub defer_reset_on_send_failure: bool,

    /// Long-poll timeout for getUpdates, in seconds
    pub poll_timeout_secs: u64,

    /// Telegram Bot API base URL
    pub telegram_api_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = lookup("TELEGRAM_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("TELEGRAM_TOKEN"))?;

        let group_chat_id: i64 = lookup("GROUP_CHAT_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("GROUP_CHAT_ID"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("GROUP_CHAT_ID"))?;
        if group_chat_id == 0 {
            return Err(ConfigError::InvalidValue("GROUP_CHAT_ID"));
        }

        let report_hour: u32 = lookup("REPORT_HOUR")
            .unwrap_or_else(|| "21".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("REPORT_HOUR"))?;
        if report_hour > 23 {
            return Err(ConfigError::InvalidValue("REPORT_HOUR"));
        }

        let weekly_report_day: Weekday = lookup("WEEKLY_REPORT_DAY")
            .unwrap_or_else(|| "sun".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("WEEKLY_REPORT_DAY"))?;

        let weekly_offset_minutes: u32 = lookup("WEEKLY_REPORT_OFFSET_MINUTES")
            .unwrap_or_else(|| "5".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("WEEKLY_REPORT_OFFSET_MINUTES"))?;
        if !(1..=59).contains(&weekly_offset_minutes) {
            return Err(ConfigError::InvalidValue("WEEKLY_REPORT_OFFSET_MINUTES"));
        }

        let data_path = PathBuf::from(lookup("DATA_PATH").unwrap_or_else(|| ".".to_string()));

        let defer_reset_on_send_failure = parse_bool(
            lookup("DEFER_RESET_ON_SEND_FAILURE"),
            "DEFER_RESET_ON_SEND_FAILURE",
        )?;

        let poll_timeout_secs = lookup("POLL_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("POLL_TIMEOUT_SECS"))?;

        let telegram_api_url = lookup("TELEGRAM_API_URL")
            .unwrap_or_else(|| "https://api.telegram.org".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            telegram_token,
            group_chat_id,
            report_hour,
            weekly_report_day,
            weekly_offset_minutes,
            data_path,
            defer_reset_on_send_failure,
            poll_timeout_secs,
            telegram_api_url,
        })
    }
}

fn parse_bool(value: Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    match value {
        None => Ok(false),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(ConfigError::InvalidValue(key)),
        },
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

use crate::llm::tier::{TierProfile, TierTable};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STANDARD_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_PRO_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_PRO_IMAGE_SIZE: &str = "1K";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Absent keys are only reported when a request is attempted.
    pub gemini_api_key: Option<String>,
    pub gemini_api_base_url: String,
    pub gemini_standard_model: String,
    pub gemini_pro_model: String,
    pub gemini_pro_image_size: String,
    pub request_timeout_secs: u64,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(value: String) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        warn!(
            "Empty GEMINI_API_BASE_URL; defaulting to {}.",
            DEFAULT_API_BASE_URL
        );
        return DEFAULT_API_BASE_URL.to_string();
    }
    trimmed.to_string()
}

fn non_empty_or(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 120);
        if request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be greater than zero"));
        }

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(non_empty_or(env_string("LOG_DIR", "logs"), "logs")),
            gemini_api_key: env_optional("GEMINI_API_KEY"),
            gemini_api_base_url: normalize_base_url(env_string(
                "GEMINI_API_BASE_URL",
                DEFAULT_API_BASE_URL,
            )),
            gemini_standard_model: non_empty_or(
                env_string("GEMINI_STANDARD_MODEL", DEFAULT_STANDARD_MODEL),
                DEFAULT_STANDARD_MODEL,
            ),
            gemini_pro_model: non_empty_or(
                env_string("GEMINI_PRO_MODEL", DEFAULT_PRO_MODEL),
                DEFAULT_PRO_MODEL,
            ),
            gemini_pro_image_size: non_empty_or(
                env_string("GEMINI_PRO_IMAGE_SIZE", DEFAULT_PRO_IMAGE_SIZE),
                DEFAULT_PRO_IMAGE_SIZE,
            ),
            request_timeout_secs,
        })
    }

    pub fn tier_table(&self) -> TierTable {
        TierTable::new(
            TierProfile::new(&self.gemini_standard_model, None),
            TierProfile::new(&self.gemini_pro_model, Some(&self.gemini_pro_image_size)),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            gemini_api_key: None,
            gemini_api_base_url: DEFAULT_API_BASE_URL.to_string(),
            gemini_standard_model: DEFAULT_STANDARD_MODEL.to_string(),
            gemini_pro_model: DEFAULT_PRO_MODEL.to_string(),
            gemini_pro_image_size: DEFAULT_PRO_IMAGE_SIZE.to_string(),
            request_timeout_secs: 120,
        }
    }
}

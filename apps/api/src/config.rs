use std::str::FromStr;

use anyhow::{Context, Result};

pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_WHATSAPP_URL: &str = "https://w.app/ogzaqz";

/// Application configuration loaded from environment variables.
/// Fails at startup if `API_KEY` is missing or a numeric value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub total_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub whatsapp_url: String,
    pub templates_dir: String,
    pub static_dir: String,
    pub port: u16,
    pub rust_log: String,
    pub probe_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a fixed table.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("Required environment variable 'API_KEY' is not set")?;

        Ok(Config {
            api_key,
            api_base: or_default(&lookup, "LLM_API_BASE", DEFAULT_API_BASE),
            model: or_default(&lookup, "LLM_MODEL", DEFAULT_MODEL),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.3)?,
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 300)?,
            timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", 10)?,
            total_timeout_secs: parse_or::<u64, _>(&lookup, "LLM_TOTAL_TIMEOUT_SECS", 10)?.max(1),
            max_retries: parse_or::<u32, _>(&lookup, "LLM_MAX_RETRIES", 3)?.max(1),
            retry_base_ms: parse_or(&lookup, "LLM_RETRY_BASE_MS", 1000)?,
            whatsapp_url: or_default(&lookup, "WHATSAPP_URL", DEFAULT_WHATSAPP_URL),
            templates_dir: or_default(&lookup, "TEMPLATES_DIR", "templates"),
            static_dir: or_default(&lookup, "STATIC_DIR", "static"),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: or_default(&lookup, "RUST_LOG", "info"),
            probe_on_startup: parse_or(&lookup, "PROBE_ON_STARTUP", true)?,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.api_base.trim_end_matches('/'))
    }
}

fn or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::gemini_adapter::GEMINI_BASE_URL;
use crate::llm::openai_adapter::OPENAI_BASE_URL;
use crate::tools::search::TAVILY_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Process-wide settings, loaded once before the server accepts connections.
#[derive(Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub gemini_api_keys: Vec<String>,
    pub openai_api_keys: Vec<String>,
    pub tavily_api_key: String,
    pub gemini_base_url: String,
    pub openai_base_url: String,
    pub tavily_base_url: String,
    pub max_iterations: usize,
    pub temperature: Option<f64>,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_keys = load_keys(&lookup, "GEMINI_API_KEY");
        if gemini_api_keys.is_empty() {
            return Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()));
        }
        let tavily_api_key = lookup("TAVILY_API_KEY")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TAVILY_API_KEY".to_string()))?;

        let port = parse_or(&lookup, "PORT", 8000u16)?;
        let max_iterations = parse_or(&lookup, "MAX_ITERATIONS", 10usize)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60u64)?;
        let temperature = lookup("TEMPERATURE")
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::InvalidValue("TEMPERATURE".to_string(), e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            gemini_api_keys,
            openai_api_keys: load_keys(&lookup, "OPENAI_API_KEY"),
            tavily_api_key,
            gemini_base_url: lookup("GEMINI_BASE_URL").unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            tavily_base_url: lookup("TAVILY_BASE_URL").unwrap_or_else(|| TAVILY_BASE_URL.to_string()),
            max_iterations,
            temperature,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue("HOST".to_string(), e.to_string()))
    }
}

// `KEY` may hold a comma-separated list; `KEY_2`..`KEY_10` add more.
fn load_keys<F>(lookup: &F, primary: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys = Vec::new();
    if let Some(raw) = lookup(primary) {
        for item in raw.split(',') {
            let trimmed = item.trim();
            if !trimmed.is_empty() {
                keys.push(trimmed.to_string());
            }
        }
    }
    for idx in 2..=10 {
        if let Some(value) = lookup(&format!("{}_{}", primary, idx)) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                keys.push(trimmed.to_string());
            }
        }
    }
    keys
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub listen_addr: String,
    pub max_concurrency: usize,
    pub history_capacity: usize,
    pub offline: bool,
    pub config_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::DEFAULT_LISTEN_ADDR.to_string(),
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            history_capacity: Self::DEFAULT_HISTORY_CAPACITY,
            offline: false,
            config_path: None,
        }
    }
}

impl ApiConfig {
    const DEFAULT_LISTEN_ADDR: &'static str = "0.0.0.0:8000";
    const DEFAULT_MAX_CONCURRENCY: usize = 4;
    pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("MARKETING_API_ADDR")
            .unwrap_or_else(|_| Self::DEFAULT_LISTEN_ADDR.to_string());

        let max_concurrency = parse_positive("MARKETING_API_MAX_CONCURRENCY")?
            .unwrap_or(Self::DEFAULT_MAX_CONCURRENCY);

        let history_capacity = parse_positive("MARKETING_HISTORY_CAPACITY")?
            .unwrap_or(Self::DEFAULT_HISTORY_CAPACITY);

        let offline = env::var("MARKETING_API_OFFLINE")
            .ok()
            .and_then(|value| parse_bool(&value))
            .unwrap_or(false);

        let config_path = env::var("MARKETING_CONFIG")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            listen_addr,
            max_concurrency,
            history_capacity,
            offline,
            config_path,
        })
    }
}

fn parse_positive(var: &str) -> Result<Option<usize>> {
    env::var(var)
        .ok()
        .map(|value| {
            value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|parsed| *parsed > 0)
                .with_context(|| format!("{var} must be a positive integer"))
        })
        .transpose() // Option<Result> -> Result<Option>
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

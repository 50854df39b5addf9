use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Hosted collaborator that failed a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamService {
    Model,
    Search,
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamService::Model => write!(f, "model"),
            UpstreamService::Search => write!(f, "search"),
        }
    }
}

/// Core error type for the marketing agents.
#[derive(Debug, Error)]
pub enum MarketingError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{service} service error: {message}")]
    Upstream {
        service: UpstreamService,
        message: String,
    },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarketingError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Upstream {
            service: UpstreamService::Model,
            message: message.into(),
        }
    }

    pub fn search(message: impl Into<String>) -> Self {
        Self::Upstream {
            service: UpstreamService::Search,
            message: message.into(),
        }
    }

    /// True for failures detected at process start rather than per request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::MissingSecret(_) | Self::ConfigIo { .. }
        )
    }
}

pub type Result<T, E = MarketingError> = std::result::Result<T, E>;

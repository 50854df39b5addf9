use std::sync::Arc;

use anyhow::Result;
use marketing_core::{ConfigLoader, Orchestrator, OrchestratorSettings};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::info;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::history::HistoryStore;
use axum::http::StatusCode;

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    history: Arc<HistoryStore>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CapacityReport {
    pub max_concurrency: usize,
    pub available: usize,
    pub active: usize,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: &ApiConfig) -> Self {
        let max_concurrency = config.max_concurrency.max(1);
        Self {
            orchestrator: Arc::new(orchestrator),
            history: Arc::new(HistoryStore::new(config.history_capacity)),
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Load collaborator configuration and build the orchestrator.
    ///
    /// Missing credentials fail here, before the listener binds.
    pub fn try_from_config(config: &ApiConfig) -> Result<Self> {
        let orchestrator = if config.offline {
            info!(target: "telemetry.api", "offline mode: using stub collaborators");
            Orchestrator::offline(OrchestratorSettings::default())
        } else {
            let core_config = ConfigLoader::load(config.config_path.clone())?;
            Orchestrator::from_config(&core_config)?
        };
        Ok(Self::new(orchestrator, config))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn capacity(&self) -> CapacityReport {
        let available = self.permits.available_permits();
        CapacityReport {
            max_concurrency: self.max_concurrency,
            available,
            active: self.max_concurrency.saturating_sub(available),
        }
    }

    pub fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, ApiError> {
        match self.permits.clone().try_acquire_owned() {
            Ok(permit) => Ok(permit),
            Err(TryAcquireError::NoPermits) => Err(ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "analysis capacity reached; retry once a slot frees up",
            )),
            Err(TryAcquireError::Closed) => Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "analysis executor unavailable",
            )),
        }
    }
}

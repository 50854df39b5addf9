//! Bounded in-memory history of successful analyses.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use marketing_core::RunOutcome;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Response body of a successful analysis, also kept in history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    pub success: bool,
    pub request_id: String,
    pub query: String,
    pub selected_agents: Vec<String>,
    pub results: BTreeMap<String, String>,
    pub formatted_output: String,
    pub processing_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        Self {
            success: true,
            request_id: outcome.request_id.clone(),
            query: outcome.query.clone(),
            selected_agents: outcome
                .selected
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            results: outcome
                .outputs
                .iter()
                .map(|output| (output.kind.as_str().to_string(), output.text.clone()))
                .collect(),
            formatted_output: outcome.combined.markdown.clone(),
            processing_time_seconds: outcome.duration.as_secs_f64(),
            timestamp: Utc::now(),
        }
    }
}

/// Ring buffer of analysis records; the oldest entry is evicted at capacity.
pub struct HistoryStore {
    capacity: usize,
    entries: RwLock<VecDeque<AnalysisRecord>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn push(&self, record: AnalysisRecord) {
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    pub async fn get(&self, request_id: &str) -> Option<AnalysisRecord> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .find(|record| record.request_id == request_id)
            .cloned()
    }

    /// Up to `limit` most recent records, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<AnalysisRecord> {
        let entries = self.entries.read().await;
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

//! Request, routing and per-run shared state.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::{AgentKind, MarketingError};

pub const MIN_QUERY_CHARS: usize = 10;
pub const MAX_QUERY_CHARS: usize = 1000;

/// Validated, immutable user query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    text: String,
}

impl UserRequest {
    pub fn new(text: impl Into<String>) -> Result<Self, MarketingError> {
        let text = text.into();
        let chars = text.chars().count();
        if !(MIN_QUERY_CHARS..=MAX_QUERY_CHARS).contains(&chars) {
            return Err(MarketingError::Validation(format!(
                "query must be between {MIN_QUERY_CHARS} and {MAX_QUERY_CHARS} characters (got {chars})"
            )));
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered, duplicate-free selection of agent kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    kinds: Vec<AgentKind>,
}

impl RoutingDecision {
    /// Keep the first occurrence of every kind, preserving selection order.
    pub fn from_kinds(kinds: impl IntoIterator<Item = AgentKind>) -> Self {
        let mut selected = Vec::new();
        for kind in kinds {
            if !selected.contains(&kind) {
                selected.push(kind);
            }
        }
        Self { kinds: selected }
    }

    pub fn kinds(&self) -> &[AgentKind] {
        &self.kinds
    }

    pub fn contains(&self, kind: AgentKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

/// Text produced by one agent, plus the prior outputs it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub kind: AgentKind,
    pub text: String,
    pub context_used: Vec<AgentKind>,
}

/// State shared by every agent of one run.
///
/// Outputs are write-once per kind; the completion list only grows.
pub struct SharedState {
    request: UserRequest,
    routing: RoutingDecision,
    outputs: DashMap<AgentKind, AgentOutput>,
    completed: watch::Sender<Vec<AgentKind>>,
}

impl SharedState {
    pub fn new(request: UserRequest, routing: RoutingDecision) -> Self {
        let (completed, _) = watch::channel(Vec::new());
        Self {
            request,
            routing,
            outputs: DashMap::new(),
            completed,
        }
    }

    pub fn request(&self) -> &UserRequest {
        &self.request
    }

    pub fn routing(&self) -> &RoutingDecision {
        &self.routing
    }

    /// Store an output unless one already exists for its kind.
    ///
    /// Returns `false` when the write was dropped because the kind was
    /// already recorded; the first value is kept.
    pub fn record(&self, output: AgentOutput) -> bool {
        match self.outputs.entry(output.kind) {
            Entry::Occupied(_) => {
                warn!(kind = %output.kind, "duplicate agent output dropped");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(output);
                true
            }
        }
    }

    pub fn output(&self, kind: AgentKind) -> Option<AgentOutput> {
        self.outputs.get(&kind).map(|entry| entry.value().clone())
    }

    /// Append a completion marker and wake any agent waiting on it.
    pub fn mark_completed(&self, kind: AgentKind) {
        self.completed.send_modify(|done| done.push(kind));
    }

    pub fn completed(&self) -> Vec<AgentKind> {
        self.completed.borrow().clone()
    }

    pub fn is_completed(&self, kind: AgentKind) -> bool {
        self.completed.borrow().contains(&kind)
    }

    /// True once every selected kind has a completion marker.
    pub fn all_completed(&self) -> bool {
        let done = self.completed.borrow();
        self.routing.kinds().iter().all(|kind| done.contains(kind))
    }

    /// Wait until every listed kind has completed.
    pub async fn wait_for(&self, kinds: &[AgentKind]) {
        if kinds.is_empty() {
            return;
        }
        let mut receiver = self.completed.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver
            .wait_for(|done| kinds.iter().all(|kind| done.contains(kind)))
            .await;
    }

    /// Outputs `kind` may read that are recorded right now, in dependency order.
    pub fn context_for(&self, kind: AgentKind) -> Vec<AgentOutput> {
        kind.context_kinds()
            .iter()
            .filter_map(|dep| self.output(*dep))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn state(kinds: &[AgentKind]) -> SharedState {
        SharedState::new(
            UserRequest::new("Launch plan for a reusable water bottle").unwrap(),
            RoutingDecision::from_kinds(kinds.iter().copied()),
        )
    }

    fn output(kind: AgentKind, text: &str) -> AgentOutput {
        AgentOutput {
            kind,
            text: text.to_string(),
            context_used: vec![],
        }
    }

    #[test]
    fn query_length_bounds_are_inclusive() {
        assert!(UserRequest::new("a".repeat(9)).is_err());
        assert!(UserRequest::new("a".repeat(10)).is_ok());
        assert!(UserRequest::new("é".repeat(1000)).is_ok());
        assert!(matches!(
            UserRequest::new("a".repeat(1001)),
            Err(MarketingError::Validation(_))
        ));
    }

    #[test]
    fn routing_decision_drops_duplicates_in_order() {
        let decision = RoutingDecision::from_kinds([
            AgentKind::ContentDelivery,
            AgentKind::MarketResearch,
            AgentKind::ContentDelivery,
        ]);
        assert_eq!(
            decision.kinds(),
            &[AgentKind::ContentDelivery, AgentKind::MarketResearch]
        );
    }

    #[test]
    fn first_write_wins() {
        let state = state(&[AgentKind::MarketResearch]);
        assert!(state.record(output(AgentKind::MarketResearch, "first")));
        assert!(!state.record(output(AgentKind::MarketResearch, "second")));
        assert_eq!(
            state.output(AgentKind::MarketResearch).unwrap().text,
            "first"
        );
    }

    #[test]
    fn completion_tracks_selected_kinds_only() {
        let state = state(&[AgentKind::MarketResearch, AgentKind::ContentDelivery]);
        assert!(!state.all_completed());
        state.mark_completed(AgentKind::MarketResearch);
        state.mark_completed(AgentKind::MarketingStrategy);
        assert!(!state.all_completed());
        state.mark_completed(AgentKind::ContentDelivery);
        assert!(state.all_completed());
        assert_eq!(state.completed().len(), 3);
    }

    #[test]
    fn empty_routing_is_trivially_complete() {
        assert!(state(&[]).all_completed());
    }

    #[test]
    fn context_follows_permitted_kinds() {
        let state = state(&AgentKind::ALL);
        state.record(output(AgentKind::MarketingStrategy, "strategy"));
        state.record(output(AgentKind::ContentDelivery, "content"));

        let context = state.context_for(AgentKind::ContentDelivery);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].kind, AgentKind::MarketingStrategy);
        assert!(state.context_for(AgentKind::MarketResearch).is_empty());
    }

    #[tokio::test]
    async fn wait_for_resolves_after_dependencies_complete() {
        let state = Arc::new(state(&AgentKind::ALL));
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .wait_for(&[AgentKind::MarketResearch, AgentKind::MarketingStrategy])
                    .await;
            })
        };

        state.mark_completed(AgentKind::MarketResearch);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        state.mark_completed(AgentKind::MarketingStrategy);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}

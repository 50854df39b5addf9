//! Event bus for explainability of a single run.
//!
//! The orchestrator and every agent emit events through a cloned
//! [`EventCollector`]; the orchestrator drains them into the run outcome.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

use crate::AgentKind;

/// Where a routing decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingSource {
    Supervisor,
    Explicit,
}

/// Orchestrator and agent lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Agents selected for the request
    Routed {
        timestamp: u64,
        agents: Vec<AgentKind>,
        source: RoutingSource,
    },
    /// Agent began with the listed prior outputs as context
    AgentStarted {
        timestamp: u64,
        kind: AgentKind,
        context: Vec<AgentKind>,
    },
    /// Search executed on behalf of a model tool call
    ToolInvoked {
        timestamp: u64,
        kind: AgentKind,
        tool: String,
        query: String,
        results: usize,
    },
    /// Agent recorded its output
    AgentFinished {
        timestamp: u64,
        kind: AgentKind,
        duration_ms: u64,
        tool_calls: usize,
    },
    /// Combined report assembled
    Collected { timestamp: u64, sections: usize },
}

impl Event {
    pub fn timestamp(&self) -> u64 {
        match self {
            Event::Routed { timestamp, .. }
            | Event::AgentStarted { timestamp, .. }
            | Event::ToolInvoked { timestamp, .. }
            | Event::AgentFinished { timestamp, .. }
            | Event::Collected { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> Option<AgentKind> {
        match self {
            Event::AgentStarted { kind, .. }
            | Event::ToolInvoked { kind, .. }
            | Event::AgentFinished { kind, .. } => Some(*kind),
            Event::Routed { .. } | Event::Collected { .. } => None,
        }
    }

    /// One-line human readable description.
    pub fn describe(&self) -> String {
        match self {
            Event::Routed { agents, source, .. } => {
                let names = agents
                    .iter()
                    .map(AgentKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("routed ({source:?}) to [{names}]")
            }
            Event::AgentStarted { kind, context, .. } => {
                format!("{kind} started with {} context section(s)", context.len())
            }
            Event::ToolInvoked {
                kind,
                tool,
                query,
                results,
                ..
            } => format!("{kind} called {tool}(\"{query}\") -> {results} result(s)"),
            Event::AgentFinished {
                kind,
                duration_ms,
                tool_calls,
                ..
            } => format!("{kind} finished in {duration_ms} ms after {tool_calls} tool call(s)"),
            Event::Collected { sections, .. } => {
                format!("collector merged {sections} section(s)")
            }
        }
    }
}

/// Cloneable sender side of the event bus.
#[derive(Clone)]
pub struct EventCollector {
    sender: mpsc::UnboundedSender<Event>,
}

impl EventCollector {
    /// Create a new event collector
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit_routed(&self, agents: Vec<AgentKind>, source: RoutingSource) {
        self.emit(Event::Routed {
            timestamp: current_timestamp(),
            agents,
            source,
        });
    }

    pub fn emit_started(&self, kind: AgentKind, context: Vec<AgentKind>) {
        self.emit(Event::AgentStarted {
            timestamp: current_timestamp(),
            kind,
            context,
        });
    }

    pub fn emit_tool(&self, kind: AgentKind, tool: &str, query: &str, results: usize) {
        self.emit(Event::ToolInvoked {
            timestamp: current_timestamp(),
            kind,
            tool: tool.to_string(),
            query: query.to_string(),
            results,
        });
    }

    pub fn emit_finished(&self, kind: AgentKind, duration_ms: u64, tool_calls: usize) {
        self.emit(Event::AgentFinished {
            timestamp: current_timestamp(),
            kind,
            duration_ms,
            tool_calls,
        });
    }

    pub fn emit_collected(&self, sections: usize) {
        self.emit(Event::Collected {
            timestamp: current_timestamp(),
            sections,
        });
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.sender.send(event) {
            tracing::warn!(error = %e, "Failed to emit event");
        }
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new().0
    }
}

/// Drain everything currently buffered in the receiver.
pub fn drain_events(receiver: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Get current Unix timestamp in milliseconds
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

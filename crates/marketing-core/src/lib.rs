//! Marketing agents core: a supervisor routes a request to research, strategy
//! and content agents, which run concurrently and are merged by a collector.

pub mod agent;
pub mod collector;
pub mod config;
mod error;
pub mod events;
mod kind;
pub mod llm;
pub mod metrics;
pub mod search;
mod security;
pub mod state;
pub mod supervisor;
mod telemetry;
mod workflow;

pub use agent::{AgentProfile, MarketingAgent};
pub use collector::{Collector, CombinedReport};
pub use config::{Config, ConfigLoader, ContextMode, Credentials};
pub use error::{MarketingError, Result, UpstreamService};
pub use events::{Event, EventCollector, RoutingSource};
pub use kind::{AgentDescriptor, AgentKind, agent_catalog};
pub use llm::{DynModelClient, ModelClient, OpenAiClient, StubModelClient};
pub use search::{DynSearchClient, SearchClient, SearchResult, SerperClient, StubSearchClient};
pub use security::{SecretValue, require_env};
pub use state::{AgentOutput, RoutingDecision, SharedState, UserRequest};
pub use supervisor::Supervisor;
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use workflow::{Orchestrator, OrchestratorSettings, RunOptions, RunOutcome, new_request_id};

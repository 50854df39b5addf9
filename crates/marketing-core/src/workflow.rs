use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::agent::{AgentProfile, MarketingAgent};
use crate::collector::{Collector, CombinedReport};
use crate::config::{Config, ContextMode};
use crate::events::{Event, EventCollector, RoutingSource, drain_events};
use crate::llm::{DynModelClient, OpenAiClient, StubModelClient};
use crate::search::{DEFAULT_NUM_RESULTS, DynSearchClient, SerperClient, StubSearchClient};
use crate::state::{AgentOutput, RoutingDecision, SharedState, UserRequest};
use crate::supervisor::Supervisor;
use crate::{AgentKind, MarketingError};

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub context_mode: ContextMode,
    pub timeout: Duration,
    pub num_results: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            context_mode: ContextMode::AwaitDependencies,
            timeout: Duration::from_secs(300),
            num_results: DEFAULT_NUM_RESULTS,
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            context_mode: config.orchestrator.context_mode,
            timeout: Duration::from_millis(config.orchestrator.timeout_ms),
            num_results: config.search.num_results,
        }
    }
}

/// Options for a single run.
pub struct RunOptions<'a> {
    pub query: &'a str,
    pub agents: Vec<AgentKind>,     // Non-empty skips the supervisor
    pub request_id: Option<String>, // Generated when absent
}

impl<'a> RunOptions<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            agents: Vec::new(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_agents(mut self, agents: impl IntoIterator<Item = AgentKind>) -> Self {
        self.agents.extend(agents);
        self
    }
}

/// Everything produced by one successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub request_id: String,
    pub query: String,
    pub selected: Vec<AgentKind>,
    pub source: RoutingSource,
    /// Agent outputs in routing order.
    pub outputs: Vec<AgentOutput>,
    pub combined: CombinedReport,
    pub events: Vec<Event>,
    pub duration: Duration,
}

impl RunOutcome {
    pub fn output(&self, kind: AgentKind) -> Option<&AgentOutput> {
        self.outputs.iter().find(|output| output.kind == kind)
    }
}

/// Supervisor, fan-out to the selected agents, then the collector.
pub struct Orchestrator {
    supervisor: Supervisor,
    agents: HashMap<AgentKind, Arc<MarketingAgent>>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        model: DynModelClient,
        search: DynSearchClient,
        settings: OrchestratorSettings,
    ) -> Self {
        let agents = AgentKind::ALL
            .iter()
            .map(|kind| {
                let agent = MarketingAgent::new(
                    AgentProfile::for_kind(*kind),
                    model.clone(),
                    search.clone(),
                )
                .with_num_results(settings.num_results);
                (*kind, Arc::new(agent))
            })
            .collect();

        Self {
            supervisor: Supervisor::new(model),
            agents,
            settings,
        }
    }

    /// Build against the hosted model and search services named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, MarketingError> {
        let credentials = config.credentials()?;
        let model = OpenAiClient::new(
            config.llm.api_base.clone(),
            credentials.model,
            config.llm.model.clone(),
            config.llm.timeout(),
        )?;
        let search = SerperClient::new(
            config.search.endpoint.clone(),
            credentials.search,
            config.search.timeout(),
        )?;
        Ok(Self::new(
            Arc::new(model),
            Arc::new(search),
            OrchestratorSettings::from(config),
        ))
    }

    /// Build against the in-memory stub collaborators.
    pub fn offline(settings: OrchestratorSettings) -> Self {
        Self::new(
            Arc::new(StubModelClient::new()),
            Arc::new(StubSearchClient::new()),
            settings,
        )
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Route `query` with the supervisor and run every selected agent.
    pub async fn run(&self, query: &str) -> Result<RunOutcome, MarketingError> {
        self.run_with_options(RunOptions::new(query)).await
    }

    #[instrument(name = "orchestrator.run", skip_all, fields(request_id = tracing::field::Empty))]
    pub async fn run_with_options(
        &self,
        options: RunOptions<'_>,
    ) -> Result<RunOutcome, MarketingError> {
        let request_id = options.request_id.unwrap_or_else(new_request_id);
        tracing::Span::current().record("request_id", request_id.as_str());
        let request = UserRequest::new(options.query)?;

        let started = Instant::now();
        let (events, mut receiver) = EventCollector::new();
        let timeout = self.settings.timeout;

        let executed = tokio::time::timeout(
            timeout,
            self.execute(request.clone(), options.agents, &events),
        )
        .await;

        let (state, source, combined) = match executed {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "run timed out");
                return Err(MarketingError::Timeout {
                    after_ms: timeout.as_millis() as u64,
                });
            }
        };

        let selected = state.routing().kinds().to_vec();
        let outputs = selected
            .iter()
            .filter_map(|kind| state.output(*kind))
            .collect::<Vec<_>>();
        let duration = started.elapsed();
        info!(
            agents = selected.len(),
            duration_ms = duration.as_millis() as u64,
            "run completed"
        );

        Ok(RunOutcome {
            request_id,
            query: request.text().to_string(),
            selected,
            source,
            outputs,
            combined,
            events: drain_events(&mut receiver),
            duration,
        })
    }

    async fn execute(
        &self,
        request: UserRequest,
        explicit: Vec<AgentKind>,
        events: &EventCollector,
    ) -> Result<(Arc<SharedState>, RoutingSource, CombinedReport), MarketingError> {
        let (routing, source) = if explicit.is_empty() {
            (self.supervisor.route(&request).await?, RoutingSource::Supervisor)
        } else {
            (RoutingDecision::from_kinds(explicit), RoutingSource::Explicit)
        };

        if routing.is_empty() {
            return Err(MarketingError::Validation(
                "no agent matched the request".into(),
            ));
        }
        events.emit_routed(routing.kinds().to_vec(), source);

        let state = Arc::new(SharedState::new(request, routing));
        let mut tasks = JoinSet::new();
        for kind in state.routing().kinds().iter().copied() {
            let agent = self.agent(kind)?;
            let state = state.clone();
            let events = events.clone();
            let mode = self.settings.context_mode;
            tasks.spawn(async move {
                if mode == ContextMode::AwaitDependencies {
                    let dependencies = kind
                        .context_kinds()
                        .iter()
                        .copied()
                        .filter(|dependency| state.routing().contains(*dependency))
                        .collect::<Vec<_>>();
                    state.wait_for(&dependencies).await;
                }

                let context = state.context_for(kind);
                let output = agent.run(state.request(), context, &events).await?;
                state.record(output);
                state.mark_completed(kind);
                Ok::<_, MarketingError>(kind)
            });
        }

        // Join exactly the launched set; dropping `tasks` aborts the rest.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(kind)) => debug!(kind = %kind, "agent joined"),
                Ok(Err(err)) => {
                    tasks.abort_all();
                    return Err(err);
                }
                Err(err) => {
                    tasks.abort_all();
                    return Err(MarketingError::Other(anyhow!("agent task failed: {err}")));
                }
            }
        }

        let combined = Collector::collect(&state).ok_or_else(|| {
            MarketingError::Other(anyhow!("collector ran before every agent completed"))
        })?;
        events.emit_collected(combined.sections);
        Ok((state, source, combined))
    }

    fn agent(&self, kind: AgentKind) -> Result<Arc<MarketingAgent>, MarketingError> {
        self.agents
            .get(&kind)
            .cloned()
            .ok_or_else(|| MarketingError::Other(anyhow!("no agent registered for {kind}")))
    }
}

/// Short request identifier: the first 8 hex digits of a v4 UUID.
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ModelClient, ModelReply, OutputSchema, ToolSpec};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    fn stub_orchestrator(model: StubModelClient, search: StubSearchClient) -> Orchestrator {
        Orchestrator::new(
            Arc::new(model),
            Arc::new(search),
            OrchestratorSettings::default(),
        )
    }

    #[tokio::test]
    async fn competitor_query_yields_single_research_section() {
        let orchestrator = Orchestrator::offline(OrchestratorSettings::default());
        let outcome = orchestrator
            .run("Analyze competitors for a new plant-based protein bar")
            .await
            .unwrap();

        assert_eq!(outcome.selected, vec![AgentKind::MarketResearch]);
        assert_eq!(outcome.source, RoutingSource::Supervisor);
        assert_eq!(outcome.combined.sections, 1);
        assert_eq!(outcome.combined.markdown.matches("\n## ").count(), 1);
        assert!(outcome.combined.markdown.contains("## Market Research Analysis\n"));
        assert_eq!(outcome.request_id.len(), 8);
    }

    #[tokio::test]
    async fn delivery_reads_strategy_output_as_input() {
        let model = Arc::new(StubModelClient::new());
        let orchestrator = Orchestrator::new(
            model.clone(),
            Arc::new(StubSearchClient::new()),
            OrchestratorSettings::default(),
        );

        let outcome = orchestrator
            .run("Give me strategy and content ideas for an oat milk brand")
            .await
            .unwrap();
        assert_eq!(
            outcome.selected,
            vec![AgentKind::MarketingStrategy, AgentKind::ContentDelivery]
        );

        let strategy = outcome.output(AgentKind::MarketingStrategy).unwrap();
        let delivery = outcome.output(AgentKind::ContentDelivery).unwrap();
        assert_eq!(delivery.context_used, vec![AgentKind::MarketingStrategy]);
        assert!(!delivery.text.contains(&strategy.text));

        let expected = format!(
            "Here's the marketing strategy for context: {}",
            strategy.text
        );
        let delivery_conversation = model
            .conversations()
            .into_iter()
            .find(|conversation| {
                conversation
                    .iter()
                    .any(|message| message.content().starts_with("I need content ideas for"))
            })
            .unwrap();
        assert!(
            delivery_conversation
                .iter()
                .any(|message| matches!(message, ChatMessage::User { content } if *content == expected))
        );
    }

    #[tokio::test]
    async fn search_failure_fails_the_run() {
        let orchestrator = stub_orchestrator(
            StubModelClient::new(),
            StubSearchClient::failing("search service returned status 503"),
        );
        let err = orchestrator
            .run("Research the market size for electric scooters")
            .await
            .unwrap_err();
        assert!(matches!(err, MarketingError::Upstream { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn empty_routing_is_rejected() {
        let orchestrator =
            stub_orchestrator(StubModelClient::new().with_routing(vec![]), StubSearchClient::new());
        let err = orchestrator
            .run("Tell me something about lamps")
            .await
            .unwrap_err();
        assert!(matches!(err, MarketingError::Validation(_)));
    }

    #[tokio::test]
    async fn short_query_is_rejected_before_routing() {
        let model = Arc::new(StubModelClient::new());
        let orchestrator = Orchestrator::new(
            model.clone(),
            Arc::new(StubSearchClient::new()),
            OrchestratorSettings::default(),
        );
        let err = orchestrator.run("too short").await.unwrap_err();
        assert!(matches!(err, MarketingError::Validation(_)));
        assert!(model.conversations().is_empty());
    }

    #[tokio::test]
    async fn explicit_agents_bypass_supervisor() {
        let orchestrator = Orchestrator::offline(OrchestratorSettings::default());
        let outcome = orchestrator
            .run_with_options(
                RunOptions::new("Analyze competitors for a new plant-based protein bar")
                    .with_agents([AgentKind::ContentDelivery, AgentKind::ContentDelivery])
                    .with_request_id("feedbeef"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.selected, vec![AgentKind::ContentDelivery]);
        assert_eq!(outcome.source, RoutingSource::Explicit);
        assert_eq!(outcome.request_id, "feedbeef");
        assert!(matches!(
            outcome.events.first(),
            Some(Event::Routed { source: RoutingSource::Explicit, .. })
        ));
        assert!(matches!(outcome.events.last(), Some(Event::Collected { sections: 1, .. })));
    }

    #[tokio::test]
    async fn all_three_agents_run_in_dependency_order() {
        let orchestrator = Orchestrator::offline(OrchestratorSettings::default());
        let outcome = orchestrator
            .run_with_options(
                RunOptions::new("Full launch plan for a smart water bottle")
                    .with_agents(AgentKind::ALL),
            )
            .await
            .unwrap();

        let delivery = outcome.output(AgentKind::ContentDelivery).unwrap();
        assert_eq!(
            delivery.context_used,
            vec![AgentKind::MarketResearch, AgentKind::MarketingStrategy]
        );
        let strategy = outcome.output(AgentKind::MarketingStrategy).unwrap();
        assert_eq!(strategy.context_used, vec![AgentKind::MarketResearch]);

        let finished = outcome
            .events
            .iter()
            .filter_map(|event| match event {
                Event::AgentFinished { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(finished, AgentKind::ALL.to_vec());
    }

    /// Model whose research answers only arrive after a delay.
    struct SlowResearchModel {
        delay: Duration,
    }

    #[async_trait]
    impl ModelClient for SlowResearchModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<ModelReply, MarketingError> {
            let research = messages
                .iter()
                .any(|message| message.content().starts_with("I need a market research"));
            if research {
                tokio::time::sleep(self.delay).await;
            }
            Ok(ModelReply::Final("answer".into()))
        }

        async fn complete_structured(
            &self,
            _messages: &[ChatMessage],
            _schema: &OutputSchema,
        ) -> Result<Value, MarketingError> {
            Ok(json!({ "selected_agents": ["market_research", "marketing_strategy"] }))
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn snapshot_mode_does_not_wait_for_dependencies() {
        let settings = OrchestratorSettings {
            context_mode: ContextMode::Snapshot,
            ..OrchestratorSettings::default()
        };
        let orchestrator = Orchestrator::new(
            Arc::new(SlowResearchModel {
                delay: Duration::from_millis(100),
            }),
            Arc::new(StubSearchClient::new()),
            settings,
        );

        let outcome = orchestrator
            .run("Research and strategy for a ceramic cookware line")
            .await
            .unwrap();
        let strategy = outcome.output(AgentKind::MarketingStrategy).unwrap();
        assert!(strategy.context_used.is_empty());
    }

    #[tokio::test]
    async fn overall_timeout_aborts_the_run() {
        let settings = OrchestratorSettings {
            timeout: Duration::from_millis(50),
            ..OrchestratorSettings::default()
        };
        let orchestrator = Orchestrator::new(
            Arc::new(SlowResearchModel {
                delay: Duration::from_secs(10),
            }),
            Arc::new(StubSearchClient::new()),
            settings,
        );

        let err = orchestrator
            .run("Research and strategy for a ceramic cookware line")
            .await
            .unwrap_err();
        assert!(matches!(err, MarketingError::Timeout { after_ms: 50 }));
    }
}

//! One parameterised agent, instantiated per [`AgentKind`] from a profile.

use std::time::Instant;

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::events::EventCollector;
use crate::llm::{ChatMessage, DynModelClient, ModelReply, ToolCall, ToolSpec};
use crate::search::{DEFAULT_NUM_RESULTS, DynSearchClient, render_results};
use crate::state::{AgentOutput, UserRequest};
use crate::{AgentKind, MarketingError, metrics};

/// Prompting and tool configuration that distinguishes one agent kind.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub role_prompt: &'static str,
    pub request_phrase: &'static str,
    pub tool_name: &'static str,
    pub tool_description: &'static str,
}

impl AgentProfile {
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::MarketResearch => Self {
                kind,
                role_prompt: "You are a specialized Market Research Agent. Your job is to thoroughly analyze:\n\
                    1. Industry landscape and market size\n\
                    2. Target audience demographics and psychographics\n\
                    3. Key competitors and their market share\n\
                    4. Current market trends and growth opportunities\n\
                    5. Regulatory environment and barriers to entry\n\n\
                    Use the search tool to find detailed information. Synthesize the information into a comprehensive \
                    market analysis. Structure your response clearly with sections and bullet points where appropriate.\n\
                    Include web citations at the end.",
                request_phrase: "I need a market research analysis for",
                tool_name: "deep_search",
                tool_description:
                    "Search for detailed information about the market, industry, and competitors.",
            },
            AgentKind::MarketingStrategy => Self {
                kind,
                role_prompt: "You are a specialized Marketing Strategy Agent. Your job is to develop innovative marketing strategies:\n\
                    1. Unique selling propositions (USPs) and product positioning\n\
                    2. Go-to-market strategies for maximum impact\n\
                    3. Pricing and distribution strategies\n\
                    4. Competitive advantage frameworks\n\
                    5. Customer acquisition and retention tactics\n\n\
                    Use the search tool to research successful strategies. Tailor your recommendations to the specific \
                    product/service and market conditions. Be specific, actionable, and creative.\n\
                    Include web citations at the end.",
                request_phrase: "I need marketing strategies for",
                tool_name: "strategy_search",
                tool_description:
                    "Search for marketing strategies, case studies, and successful approaches.",
            },
            AgentKind::ContentDelivery => Self {
                kind,
                role_prompt: "You are a specialized Content Delivery Agent. Your job is to create engaging marketing content:\n\
                    1. Social media posts tailored to different platforms (Instagram, TikTok, LinkedIn, etc.)\n\
                    2. Video content ideas with scripts/storyboards\n\
                    3. Advertisement concepts with copy and visual direction\n\
                    4. Content calendars and posting schedules\n\
                    5. Trend-based content that resonates with Gen-Z and current viral formats\n\n\
                    Use the search tool to research current trends and viral formats. Your content should be creative, \
                    attention-grabbing, and aligned with the brand's voice and target audience.\n\
                    Include web citations at the end.",
                request_phrase: "I need content ideas for",
                tool_name: "trend_search",
                tool_description:
                    "Search for current trends, viral content formats, and audience preferences.",
            },
        }
    }

    pub fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.tool_name.to_string(),
            description: self.tool_description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return (default: 5)",
                        "default": DEFAULT_NUM_RESULTS
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

/// Build the user message that hands prior outputs to a later agent.
pub fn context_message(context: &[AgentOutput]) -> Option<String> {
    let parts = context
        .iter()
        .filter(|output| !output.text.is_empty())
        .map(|output| {
            format!(
                "Here's the {} for context: {}",
                output.kind.context_label(),
                output.text
            )
        })
        .collect::<Vec<_>>();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Agent that answers from its kind's perspective, optionally grounded by
/// one round of search tool calls.
pub struct MarketingAgent {
    profile: AgentProfile,
    model: DynModelClient,
    search: DynSearchClient,
    num_results: usize,
}

impl MarketingAgent {
    pub fn new(profile: AgentProfile, model: DynModelClient, search: DynSearchClient) -> Self {
        Self {
            profile,
            model,
            search,
            num_results: DEFAULT_NUM_RESULTS,
        }
    }

    /// Default result count when the model does not ask for one.
    pub fn with_num_results(mut self, num_results: usize) -> Self {
        self.num_results = num_results.max(1);
        self
    }

    pub fn kind(&self) -> AgentKind {
        self.profile.kind
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Conversation sent on the first model call.
    pub fn conversation(&self, request: &UserRequest, context: &[AgentOutput]) -> Vec<ChatMessage> {
        let mut conversation = vec![
            ChatMessage::system(self.profile.role_prompt),
            ChatMessage::user(format!(
                "{}: {}",
                self.profile.request_phrase,
                request.text()
            )),
        ];
        if let Some(message) = context_message(context) {
            conversation.push(ChatMessage::user(message));
        }
        conversation
    }

    /// Run the agent to completion.
    ///
    /// The model is called at most twice: once with the tool available and,
    /// if it asked for tools, once more with every tool result appended.
    #[instrument(name = "agent.run", skip_all, fields(kind = %self.profile.kind))]
    pub async fn run(
        &self,
        request: &UserRequest,
        context: Vec<AgentOutput>,
        events: &EventCollector,
    ) -> Result<AgentOutput, MarketingError> {
        let started = Instant::now();
        let context_used = context.iter().map(|output| output.kind).collect::<Vec<_>>();
        events.emit_started(self.profile.kind, context_used.clone());

        let result = self.converse(request, &context, events).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok((text, tool_calls)) => {
                metrics::record_agent_run(self.profile.kind, "ok", duration_ms, tool_calls);
                events.emit_finished(self.profile.kind, duration_ms, tool_calls);
                info!(duration_ms, tool_calls, chars = text.len(), "agent completed");
                Ok(AgentOutput {
                    kind: self.profile.kind,
                    text,
                    context_used,
                })
            }
            Err(err) => {
                metrics::record_agent_run(self.profile.kind, "error", duration_ms, 0);
                warn!(error = %err, duration_ms, "agent failed");
                Err(err)
            }
        }
    }

    async fn converse(
        &self,
        request: &UserRequest,
        context: &[AgentOutput],
        events: &EventCollector,
    ) -> Result<(String, usize), MarketingError> {
        let tools = [self.profile.tool_spec()];
        let mut conversation = self.conversation(request, context);

        let (content, calls) = match self.model.complete(&conversation, &tools).await? {
            ModelReply::Final(text) => return Ok((text, 0)),
            ModelReply::ToolRequest { content, calls } => (content, calls),
        };

        debug!(tool_calls = calls.len(), "model requested tools");
        conversation.push(ChatMessage::Assistant {
            content,
            tool_calls: calls.clone(),
        });

        for call in &calls {
            let result = self.invoke_tool(call, events).await?;
            conversation.push(ChatMessage::Tool {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content: result,
            });
        }

        // Second reply is final even if it asks for more tools.
        let reply = self.model.complete(&conversation, &tools).await?;
        if let ModelReply::ToolRequest { calls: extra, .. } = &reply {
            debug!(ignored = extra.len(), "follow-up tool calls ignored");
        }
        Ok((reply.into_text(), calls.len()))
    }

    async fn invoke_tool(
        &self,
        call: &ToolCall,
        events: &EventCollector,
    ) -> Result<String, MarketingError> {
        if call.name != self.profile.tool_name {
            warn!(tool = %call.name, "model requested an unknown tool");
            return Ok(format!("Unknown tool: {}", call.name));
        }

        let (query, limit) = self.search_arguments(&call.arguments)?;
        let results = self.search.search(&query, limit).await?;
        events.emit_tool(self.profile.kind, self.profile.tool_name, &query, results.len());
        Ok(render_results(&results))
    }

    fn search_arguments(&self, arguments: &Value) -> Result<(String, usize), MarketingError> {
        let query = match arguments {
            Value::String(query) => query.clone(),
            Value::Object(map) => map
                .get("query")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    MarketingError::model(format!(
                        "{} call is missing the 'query' argument",
                        self.profile.tool_name
                    ))
                })?,
            other => {
                return Err(MarketingError::model(format!(
                    "{} call has malformed arguments: {other}",
                    self.profile.tool_name
                )));
            }
        };

        let limit = arguments
            .get("num_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(self.num_results);

        Ok((query, limit))
    }
}

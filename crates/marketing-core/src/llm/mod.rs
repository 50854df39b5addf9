//! Language-model collaborator: conversation types, the client trait, and
//! the concrete/stub implementations.

pub mod openai;

pub use openai::OpenAiClient;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AgentKind, MarketingError};

/// One turn of a conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System { content }
            | ChatMessage::User { content }
            | ChatMessage::Assistant { content, .. }
            | ChatMessage::Tool { content, .. } => content,
        }
    }
}

/// A model-initiated request to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Tool made available to the model for one completion.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// JSON schema the model output must conform to.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

/// Tagged result of a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final(String),
    ToolRequest {
        /// Text the model produced alongside its tool calls (often empty).
        content: String,
        calls: Vec<ToolCall>,
    },
}

impl ModelReply {
    pub fn into_text(self) -> String {
        match self {
            ModelReply::Final(text) => text,
            ModelReply::ToolRequest { content, .. } => content,
        }
    }
}

/// Hosted language model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Free-text completion with the given tools available.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, MarketingError>;

    /// Completion constrained to a JSON schema; returns the parsed document.
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<Value, MarketingError>;

    fn model_name(&self) -> &str;
}

pub type DynModelClient = Arc<dyn ModelClient>;

/// Deterministic in-memory model for tests and offline runs.
///
/// Routing is keyword based; every agent issues one search with the request
/// text and then answers with a summary naming its tool.
pub struct StubModelClient {
    routing: Option<Vec<AgentKind>>,
    search_first: bool,
    conversations: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubModelClient {
    pub fn new() -> Self {
        Self {
            routing: None,
            search_first: true,
            conversations: Mutex::new(Vec::new()),
        }
    }

    /// Always route to the given kinds instead of classifying by keyword.
    pub fn with_routing(mut self, kinds: Vec<AgentKind>) -> Self {
        self.routing = Some(kinds);
        self
    }

    /// Answer immediately without requesting a search.
    pub fn without_search(mut self) -> Self {
        self.search_first = false;
        self
    }

    /// Every conversation received by `complete`, in call order.
    pub fn conversations(&self) -> Vec<Vec<ChatMessage>> {
        self.conversations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn classify(text: &str) -> Vec<AgentKind> {
        let text = text.to_ascii_lowercase();
        let mut kinds = Vec::new();
        let keywords: [(AgentKind, &[&str]); 3] = [
            (
                AgentKind::MarketResearch,
                &["research", "competitor", "industry", "market size", "audience"],
            ),
            (
                AgentKind::MarketingStrategy,
                &["strategy", "strategies", "positioning", "go-to-market", "pricing"],
            ),
            (
                AgentKind::ContentDelivery,
                &["content", "social", "post", "video", "ad "],
            ),
        ];
        for (kind, words) in keywords {
            if words.iter().any(|word| text.contains(word)) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

impl Default for StubModelClient {
    fn default() -> Self {
        Self::new()
    }
}

fn first_user_message(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .find_map(|message| match message {
            ChatMessage::User { content } => Some(content.as_str()),
            _ => None,
        })
        .unwrap_or_default()
}

#[async_trait]
impl ModelClient for StubModelClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, MarketingError> {
        let call_index = {
            let mut guard = self
                .conversations
                .lock()
                .map_err(|_| MarketingError::model("stub model state poisoned"))?;
            guard.push(messages.to_vec());
            guard.len()
        };

        let request = first_user_message(messages);
        let tool_results = messages
            .iter()
            .filter(|message| matches!(message, ChatMessage::Tool { .. }))
            .count();

        if let Some(tool) = tools.first() {
            if self.search_first && tool_results == 0 {
                return Ok(ModelReply::ToolRequest {
                    content: String::new(),
                    calls: vec![ToolCall {
                        id: format!("call_{call_index}"),
                        name: tool.name.clone(),
                        arguments: json!({ "query": request }),
                    }],
                });
            }
        }

        let tool_name = tools.first().map(|tool| tool.name.as_str()).unwrap_or("none");
        Ok(ModelReply::Final(format!(
            "{tool_name} summary for \"{request}\" ({tool_results} search results consulted)"
        )))
    }

    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        _schema: &OutputSchema,
    ) -> Result<Value, MarketingError> {
        let kinds = match &self.routing {
            Some(kinds) => kinds.clone(),
            None => Self::classify(first_user_message(messages)),
        };
        Ok(json!({ "selected_agents": kinds }))
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

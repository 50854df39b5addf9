//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{ChatMessage, ModelClient, ModelReply, OutputSchema, ToolCall, ToolSpec};
use crate::{MarketingError, SecretValue};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretValue,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: SecretValue,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MarketingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MarketingError::InvalidConfiguration(err.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    async fn send(&self, body: Value) -> Result<ResponseMessage, MarketingError> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| MarketingError::model(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MarketingError::model(format!(
                "model service returned status {}: {}",
                status.as_u16(),
                truncate(&detail, 200)
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| MarketingError::model(format!("malformed completion body: {err}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| MarketingError::model("completion contained no choices"))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    #[instrument(name = "llm.complete", skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, MarketingError> {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(wire_tool).collect());
        }

        let message = self.send(body).await?;
        let content = message.content.unwrap_or_default();
        let calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments)),
            })
            .collect::<Vec<_>>();

        debug!(tool_calls = calls.len(), "model replied");

        if calls.is_empty() {
            Ok(ModelReply::Final(content))
        } else {
            Ok(ModelReply::ToolRequest { content, calls })
        }
    }

    #[instrument(name = "llm.structured", skip_all, fields(model = %self.model, schema = %schema.name))]
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<Value, MarketingError> {
        let body = json!({
            "model": self.model,
            "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                }
            }
        });

        let message = self.send(body).await?;
        let content = message
            .content
            .ok_or_else(|| MarketingError::model("structured completion had no content"))?;
        serde_json::from_str(&content).map_err(|err| {
            MarketingError::model(format!("structured completion is not valid JSON: {err}"))
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::System { content } => json!({ "role": "system", "content": content }),
        ChatMessage::User { content } => json!({ "role": "user", "content": content }),
        ChatMessage::Assistant {
            content,
            tool_calls,
        } => {
            let mut value = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                value["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
            }
            value
        }
        ChatMessage::Tool {
            call_id,
            name,
            content,
        } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "name": name,
            "content": content,
        }),
    }
}

fn wire_tool(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

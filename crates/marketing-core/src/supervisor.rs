use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::llm::{ChatMessage, DynModelClient, OutputSchema};
use crate::state::{RoutingDecision, UserRequest};
use crate::{AgentKind, MarketingError};

const ROUTER_PROMPT: &str = "You are an agent router for a marketing system with three specialized sub-agents:\n\
1. market_research - Analyzes market, industry, competitors for a product/service\n\
2. marketing_strategy - Develops strategies to penetrate markets and differentiate products\n\
3. content_delivery - Creates social media content and advertising ideas aligned with trends\n\n\
Based on the user's request, determine which agent(s) should be activated.\n\
Return ONLY the agents that are explicitly or implicitly requested.";

/// Schema constraining the routing call to a subset of the agent labels.
pub fn router_schema() -> OutputSchema {
    let labels = AgentKind::ALL
        .iter()
        .map(AgentKind::as_str)
        .collect::<Vec<_>>();
    OutputSchema {
        name: "AgentRouter".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "selected_agents": {
                    "type": "array",
                    "items": { "type": "string", "enum": labels }
                }
            },
            "required": ["selected_agents"],
            "additionalProperties": false
        }),
    }
}

/// Classifies a request into the agent kinds that should handle it.
pub struct Supervisor {
    model: DynModelClient,
}

impl Supervisor {
    pub fn new(model: DynModelClient) -> Self {
        Self { model }
    }

    #[instrument(name = "supervisor.route", skip_all, fields(model = self.model.model_name()))]
    pub async fn route(&self, request: &UserRequest) -> Result<RoutingDecision, MarketingError> {
        let messages = [
            ChatMessage::system(ROUTER_PROMPT),
            ChatMessage::user(request.text()),
        ];
        let value = self
            .model
            .complete_structured(&messages, &router_schema())
            .await?;
        debug!(response = %value, "router response");

        let decision = parse_routing(&value)?;
        info!(
            agents = ?decision.kinds().iter().map(AgentKind::as_str).collect::<Vec<_>>(),
            "request routed"
        );
        Ok(decision)
    }
}

/// Decode the structured router output. Unknown labels are a model error.
pub fn parse_routing(value: &Value) -> Result<RoutingDecision, MarketingError> {
    let labels = value
        .get("selected_agents")
        .and_then(Value::as_array)
        .ok_or_else(|| MarketingError::model("router response is missing 'selected_agents'"))?;

    let kinds = labels
        .iter()
        .map(|label| {
            label
                .as_str()
                .and_then(|label| label.parse::<AgentKind>().ok())
                .ok_or_else(|| MarketingError::model(format!("router returned unknown agent {label}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RoutingDecision::from_kinds(kinds))
}

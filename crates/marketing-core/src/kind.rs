//! The closed set of marketing agents and their static catalog entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MarketingError;

/// Agent kind a request can be routed to.
///
/// Declaration order is also the dependency order: each kind may read the
/// outputs of the kinds declared before it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Industry, audience and competitor analysis
    MarketResearch,
    /// Positioning and go-to-market planning
    MarketingStrategy,
    /// Social media content and advertising ideas
    ContentDelivery,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [
        AgentKind::MarketResearch,
        AgentKind::MarketingStrategy,
        AgentKind::ContentDelivery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::MarketResearch => "market_research",
            AgentKind::MarketingStrategy => "marketing_strategy",
            AgentKind::ContentDelivery => "content_delivery",
        }
    }

    /// Heading used for this kind's section of the combined report.
    pub fn section_title(&self) -> &'static str {
        match self {
            AgentKind::MarketResearch => "Market Research Analysis",
            AgentKind::MarketingStrategy => "Marketing Strategy",
            AgentKind::ContentDelivery => "Content Ideas",
        }
    }

    /// Phrase used when handing this kind's output to a later agent.
    pub fn context_label(&self) -> &'static str {
        match self {
            AgentKind::MarketResearch => "market research",
            AgentKind::MarketingStrategy => "marketing strategy",
            AgentKind::ContentDelivery => "content plan",
        }
    }

    /// Kinds whose outputs this kind is allowed to read.
    pub fn context_kinds(&self) -> &'static [AgentKind] {
        match self {
            AgentKind::MarketResearch => &[],
            AgentKind::MarketingStrategy => &[AgentKind::MarketResearch],
            AgentKind::ContentDelivery => {
                &[AgentKind::MarketResearch, AgentKind::MarketingStrategy]
            }
        }
    }

    /// One-line description shown to the routing model and API clients.
    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::MarketResearch => {
                "Analyzes market trends, competition, industry data, and target audiences"
            }
            AgentKind::MarketingStrategy => {
                "Develops positioning, go-to-market strategies, and competitive advantages"
            }
            AgentKind::ContentDelivery => {
                "Creates social media content and advertising ideas aligned with trends"
            }
        }
    }

    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            AgentKind::MarketResearch => &[
                "Industry landscape analysis",
                "Target audience demographics",
                "Competitor analysis",
                "Market trends identification",
                "Regulatory environment assessment",
            ],
            AgentKind::MarketingStrategy => &[
                "Unique selling proposition development",
                "Go-to-market strategy",
                "Pricing and distribution strategies",
                "Competitive advantage frameworks",
                "Customer acquisition tactics",
            ],
            AgentKind::ContentDelivery => &[
                "Social media posts for different platforms",
                "Video content ideas and scripts",
                "Advertisement concepts",
                "Content calendars",
                "Trend-based content creation",
            ],
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = MarketingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
            .ok_or_else(|| MarketingError::Validation(format!("unknown agent kind: {value}")))
    }
}

/// Catalog entry describing one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentDescriptor {
    pub name: AgentKind,
    pub description: &'static str,
    pub capabilities: Vec<&'static str>,
}

/// Static catalog of every agent kind.
pub fn agent_catalog() -> Vec<AgentDescriptor> {
    AgentKind::ALL
        .into_iter()
        .map(|kind| AgentDescriptor {
            name: kind,
            description: kind.description(),
            capabilities: kind.capabilities().to_vec(),
        })
        .collect()
}

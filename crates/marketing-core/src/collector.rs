use serde::Serialize;

use crate::state::SharedState;

const REPORT_TITLE: &str = "# Marketing Agent Results";
const MISSING_OUTPUT: &str = "No response available";

/// Markdown report merging every selected agent's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedReport {
    pub markdown: String,
    pub sections: usize,
}

/// Barrier that merges outputs once every selected agent has completed.
pub struct Collector;

impl Collector {
    /// Build the report, or `None` while any selected agent is still running.
    ///
    /// Sections follow routing order. The result depends only on the state,
    /// so repeated calls on a completed run are byte-identical.
    pub fn collect(state: &SharedState) -> Option<CombinedReport> {
        if !state.all_completed() {
            return None;
        }

        let mut markdown = format!("{REPORT_TITLE}\n\n");
        let kinds = state.routing().kinds();
        for kind in kinds {
            let text = state
                .output(*kind)
                .map(|output| output.text)
                .unwrap_or_else(|| MISSING_OUTPUT.to_string());
            markdown.push_str(&format!("## {}\n{}\n\n", kind.section_title(), text));
        }

        Some(CombinedReport {
            markdown,
            sections: kinds.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AgentOutput, RoutingDecision, UserRequest};
    use crate::AgentKind;

    fn completed_state(kinds: &[AgentKind]) -> SharedState {
        let state = SharedState::new(
            UserRequest::new("Campaign for a new trail running shoe").unwrap(),
            RoutingDecision::from_kinds(kinds.iter().copied()),
        );
        for kind in kinds {
            state.record(AgentOutput {
                kind: *kind,
                text: format!("{} output", kind.as_str()),
                context_used: vec![],
            });
            state.mark_completed(*kind);
        }
        state
    }

    #[test]
    fn withholds_report_until_all_selected_complete() {
        let state = SharedState::new(
            UserRequest::new("Campaign for a new trail running shoe").unwrap(),
            RoutingDecision::from_kinds([AgentKind::MarketResearch, AgentKind::ContentDelivery]),
        );
        state.mark_completed(AgentKind::MarketResearch);
        assert!(Collector::collect(&state).is_none());
        state.mark_completed(AgentKind::ContentDelivery);
        assert!(Collector::collect(&state).is_some());
    }

    #[test]
    fn one_section_per_selected_kind_in_selection_order() {
        let subsets: Vec<Vec<AgentKind>> = vec![
            vec![AgentKind::MarketResearch],
            vec![AgentKind::ContentDelivery, AgentKind::MarketResearch],
            vec![AgentKind::MarketingStrategy, AgentKind::ContentDelivery],
            vec![
                AgentKind::ContentDelivery,
                AgentKind::MarketingStrategy,
                AgentKind::MarketResearch,
            ],
        ];

        for subset in subsets {
            let report = Collector::collect(&completed_state(&subset)).unwrap();
            assert_eq!(report.sections, subset.len());

            let mut last_position = 0;
            for kind in &subset {
                let heading = format!("## {}\n", kind.section_title());
                assert_eq!(report.markdown.matches(&heading).count(), 1);
                let position = report.markdown.find(&heading).unwrap();
                assert!(position > last_position);
                last_position = position;
            }
            for kind in AgentKind::ALL.iter().filter(|kind| !subset.contains(kind)) {
                assert!(!report.markdown.contains(kind.section_title()));
            }
        }
    }

    #[test]
    fn collecting_twice_is_byte_identical() {
        let state = completed_state(&AgentKind::ALL);
        let first = Collector::collect(&state).unwrap();
        let second = Collector::collect(&state).unwrap();
        assert_eq!(first.markdown.as_bytes(), second.markdown.as_bytes());
    }

    #[test]
    fn missing_output_is_reported_in_place() {
        let state = SharedState::new(
            UserRequest::new("Campaign for a new trail running shoe").unwrap(),
            RoutingDecision::from_kinds([AgentKind::MarketingStrategy]),
        );
        state.mark_completed(AgentKind::MarketingStrategy);
        let report = Collector::collect(&state).unwrap();
        assert!(report.markdown.contains("## Marketing Strategy\nNo response available\n\n"));
    }

    #[test]
    fn empty_selection_yields_title_only() {
        let report = Collector::collect(&completed_state(&[])).unwrap();
        assert_eq!(report.markdown, "# Marketing Agent Results\n\n");
        assert_eq!(report.sections, 0);
    }

    #[test]
    fn report_layout() {
        let report = Collector::collect(&completed_state(&[
            AgentKind::MarketResearch,
            AgentKind::ContentDelivery,
        ]))
        .unwrap();
        insta::assert_snapshot!(report.markdown, @r"
        # Marketing Agent Results

        ## Market Research Analysis
        market_research output

        ## Content Ideas
        content_delivery output
        ");
    }
}

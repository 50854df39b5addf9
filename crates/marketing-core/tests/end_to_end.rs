use marketing_core::{
    AgentKind, ConfigLoader, Event, MarketingError, Orchestrator, RunOptions, UpstreamService,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const MODEL_KEY_ENV: &str = "MARKETING_E2E_MODEL_KEY";
const SEARCH_KEY_ENV: &str = "MARKETING_E2E_SEARCH_KEY";

fn set_keys() {
    unsafe {
        std::env::set_var(MODEL_KEY_ENV, "sk-e2e");
        std::env::set_var(SEARCH_KEY_ENV, "serper-e2e");
    }
}

fn orchestrator(model: &MockServer, search: &MockServer) -> Orchestrator {
    set_keys();
    let config = ConfigLoader::parse(&format!(
        r#"
        [llm]
        api_base = "{model}"
        api_key_env = "{MODEL_KEY_ENV}"

        [search]
        endpoint = "{search}/search"
        api_key_env = "{SEARCH_KEY_ENV}"
        num_results = 3
        "#,
        model = model.uri(),
        search = search.uri(),
    ))
    .unwrap();
    Orchestrator::from_config(&config).unwrap()
}

fn completion(message: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
    }))
}

fn has_tool_results(request: &Request) -> bool {
    String::from_utf8_lossy(&request.body).contains(r#""role":"tool""#)
}

async fn mount_model(server: &MockServer, selected: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-e2e"))
        .and(body_partial_json(json!({ "response_format": { "type": "json_schema" } })))
        .respond_with(completion(json!({
            "role": "assistant",
            "content": json!({ "selected_agents": selected }).to_string()
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(has_tool_results)
        .respond_with(completion(json!({
            "role": "assistant",
            "content": "Competitor landscape: three incumbents dominate."
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {
                    "name": "deep_search",
                    "arguments": "{\"query\":\"plant-based protein bar competitors\"}"
                }
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn routes_searches_and_collects_against_http_services() {
    let model = MockServer::start().await;
    let search = MockServer::start().await;
    mount_model(&model, json!(["market_research"])).await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "serper-e2e"))
        .and(body_partial_json(json!({
            "q": "plant-based protein bar competitors",
            "num": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                { "title": "Protein bar market share", "link": "https://bars.example", "snippet": "Top brands" }
            ]
        })))
        .expect(1)
        .mount(&search)
        .await;

    let outcome = orchestrator(&model, &search)
        .run("Analyze competitors for a new plant-based protein bar")
        .await
        .unwrap();

    assert_eq!(outcome.selected, vec![AgentKind::MarketResearch]);
    assert_eq!(
        outcome.combined.markdown,
        "# Marketing Agent Results\n\n## Market Research Analysis\nCompetitor landscape: three incumbents dominate.\n\n"
    );

    let tool_events = outcome
        .events
        .iter()
        .filter(|event| matches!(event, Event::ToolInvoked { results: 1, .. }))
        .count();
    assert_eq!(tool_events, 1);

    // Routing call, the tool round, and the follow-up.
    let requests = model.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
    let follow_up: serde_json::Value = requests[2].body_json().unwrap();
    assert_eq!(follow_up["messages"][3]["role"], "tool");
    assert_eq!(follow_up["messages"][3]["tool_call_id"], "call_1");
    assert!(
        follow_up["messages"][3]["content"]
            .as_str()
            .unwrap()
            .starts_with("1. Protein bar market share\n   URL: https://bars.example")
    );
}

#[tokio::test]
async fn search_outage_fails_the_request() {
    let model = MockServer::start().await;
    let search = MockServer::start().await;
    mount_model(&model, json!(["market_research"])).await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&search)
        .await;

    let err = orchestrator(&model, &search)
        .run_with_options(
            RunOptions::new("Analyze competitors for a new plant-based protein bar")
                .with_agents([AgentKind::MarketResearch]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketingError::Upstream { service: UpstreamService::Search, ref message } if message.contains("502")
    ));
}

#[tokio::test]
async fn unknown_router_label_is_a_model_error() {
    let model = MockServer::start().await;
    let search = MockServer::start().await;
    mount_model(&model, json!(["seo_audit"])).await;

    let err = orchestrator(&model, &search)
        .run("Analyze competitors for a new plant-based protein bar")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketingError::Upstream { service: UpstreamService::Model, .. }
    ));
    assert!(search.received_requests().await.unwrap_or_default().is_empty());
}

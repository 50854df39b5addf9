use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

use crate::AgentKind;

struct AgentMetrics {
    runs: Counter<u64>,
    duration_ms: Histogram<f64>,
    tool_calls: Counter<u64>,
    searches: Counter<u64>,
    search_duration_ms: Histogram<f64>,
}

static METRICS: OnceCell<AgentMetrics> = OnceCell::new();

fn handles() -> &'static AgentMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("marketing.agents");
        AgentMetrics {
            runs: meter
                .u64_counter("agent_runs_total")
                .with_description("Agent executions by kind and status")
                .init(),
            duration_ms: meter
                .f64_histogram("agent_duration_ms")
                .with_description("Agent runtime in milliseconds")
                .init(),
            tool_calls: meter
                .u64_counter("agent_tool_calls_total")
                .with_description("Tool calls requested by the model")
                .init(),
            searches: meter
                .u64_counter("search_requests_total")
                .with_description("Outbound search requests by status")
                .init(),
            search_duration_ms: meter
                .f64_histogram("search_duration_ms")
                .with_description("Search latency in milliseconds")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) {
    if std::env::var("MARKETING_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target: "telemetry",
            "MARKETING_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export agent metrics."
        );
    }
}

/// Record one agent execution (no-op if no provider installed).
pub fn record_agent_run(kind: AgentKind, status: &str, duration_ms: u64, tool_calls: usize) {
    let metrics = handles();
    let attrs = [
        KeyValue::new("kind", kind.as_str()),
        KeyValue::new("status", status.to_string()),
    ];

    metrics.runs.add(1, &attrs);
    metrics.duration_ms.record(duration_ms as f64, &attrs);
    if tool_calls > 0 {
        metrics.tool_calls.add(tool_calls as u64, &attrs);
    }
}

pub fn record_search(status: &str, duration_ms: u64) {
    let metrics = handles();
    let attrs = [KeyValue::new("status", status.to_string())];
    metrics.searches.add(1, &attrs);
    metrics.search_duration_ms.record(duration_ms as f64, &attrs);
}

use tracing::info;

pub fn analysis_started(request_id: &str, explicit_agents: usize, available_permits: usize) {
    info!(
        target: "telemetry.api",
        request_id,
        explicit_agents,
        available_permits,
        event = "analysis_started"
    );
}

pub fn analysis_completed(
    request_id: &str,
    agents: usize,
    processing_time_seconds: f64,
    history_entries: usize,
) {
    info!(
        target: "telemetry.api",
        request_id,
        agents,
        processing_time_seconds,
        history_entries,
        event = "analysis_completed"
    );
}

pub fn analysis_failed(request_id: &str, status: u16, error: &str) {
    info!(
        target: "telemetry.api",
        request_id,
        status,
        error,
        event = "analysis_failed"
    );
}

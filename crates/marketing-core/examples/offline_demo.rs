//! Offline demo: supervisor routing, dependency-gated agents and the collector
//! running against the in-memory stub collaborators.
//!
//! Run with: cargo run --example offline_demo

use marketing_core::{
    AgentKind, ContextMode, Orchestrator, OrchestratorSettings, RunOptions, TelemetryOptions,
    init_telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_telemetry(TelemetryOptions::default().with_level("info"))?;

    println!("Demo 1: supervisor routing");
    let orchestrator = Orchestrator::offline(OrchestratorSettings::default());
    let outcome = orchestrator
        .run("Analyze competitors for a new plant-based protein bar")
        .await?;
    println!("{}", outcome.combined.markdown);

    println!("Demo 2: every agent, dependency gated");
    let outcome = orchestrator
        .run_with_options(
            RunOptions::new("Launch plan for a refillable deodorant brand").with_agents(AgentKind::ALL),
        )
        .await?;
    for event in &outcome.events {
        println!("  {}", event.describe());
    }

    println!("\nDemo 3: snapshot context (no waiting)");
    let snapshot = Orchestrator::offline(OrchestratorSettings {
        context_mode: ContextMode::Snapshot,
        ..OrchestratorSettings::default()
    });
    let outcome = snapshot
        .run_with_options(
            RunOptions::new("Launch plan for a refillable deodorant brand").with_agents(AgentKind::ALL),
        )
        .await?;
    for output in &outcome.outputs {
        println!("  {} read {} prior output(s)", output.kind, output.context_used.len());
    }

    Ok(())
}

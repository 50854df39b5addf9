use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use marketing_core::{
    AgentKind, ConfigLoader, Orchestrator, OrchestratorSettings, RunOptions, RunOutcome,
    TelemetryOptions, agent_catalog, init_telemetry,
};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "marketing-cli",
    version,
    about = "Route a marketing request to research, strategy and content agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one request and print the combined report.
    Run(RunArgs),
    /// List the available agents.
    Agents,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Marketing question or request (10 to 1000 characters).
    #[arg(long)]
    query: String,

    /// Run only these agents instead of asking the supervisor (repeatable).
    #[arg(long = "agent", value_parser = parse_agent)]
    agents: Vec<AgentKind>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use in-memory stub collaborators; no credentials or network needed.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Print the routing and agent event trace after the report.
    #[arg(long, default_value_t = false)]
    explain: bool,

    /// Print the whole outcome as JSON instead of markdown.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_agent(value: &str) -> Result<AgentKind, String> {
    value.parse::<AgentKind>().map_err(|err| err.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Agents => {
            for agent in agent_catalog() {
                println!("{} - {}", agent.name, agent.description);
                for capability in agent.capabilities {
                    println!("  * {capability}");
                }
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let orchestrator = if args.offline {
        init_telemetry(TelemetryOptions::default().with_level("warn"))?;
        Orchestrator::offline(OrchestratorSettings::default())
    } else {
        let config = ConfigLoader::load(args.config.clone())?;
        init_telemetry(TelemetryOptions::default().with_level(config.logging.level.clone()))?;
        Orchestrator::from_config(&config)?
    };

    let rt = Runtime::new()?;
    let outcome = rt.block_on(async {
        let options = RunOptions::new(&args.query).with_agents(args.agents.iter().copied());
        orchestrator.run_with_options(options).await
    })?;

    info!(
        request_id = %outcome.request_id,
        agents = outcome.selected.len(),
        "run finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", outcome.combined.markdown);
        if args.explain {
            print_trace(&outcome);
        }
    }
    Ok(())
}

fn print_trace(outcome: &RunOutcome) {
    println!("---");
    println!(
        "request {} finished in {:.2}s",
        outcome.request_id,
        outcome.duration.as_secs_f64()
    );
    let start = outcome.events.first().map(|event| event.timestamp()).unwrap_or_default();
    for event in &outcome.events {
        println!(
            "+{:>6} ms  {}",
            event.timestamp().saturating_sub(start),
            event.describe()
        );
    }
}

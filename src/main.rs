//! World Sim - Entry Point
//!
//! Loads a scenario, then either inspects the world or delivers a line of
//! speech to every agent and runs cognitive ticks against the HTTP oracle.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use world_sim::core::config::CognitionConfig;
use world_sim::core::error::Result;
use world_sim::core::types::now_millis;
use world_sim::ecs::describe::{describe_entity, entity_names, world_state};
use world_sim::ecs::loader::Scenario;
use world_sim::entity::Stimulus;
use world_sim::llm::audit::{AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
use world_sim::llm::client::LlmClient;
use world_sim::llm::oracle::OracleGateway;
use world_sim::simulation::tick::{broadcast, run_world_tick, TickEvent};

/// Run LLM-driven agents in a scenario world
#[derive(Parser, Debug)]
#[command(name = "world-sim")]
#[command(about = "Drive oracle-backed agents through a simulated world")]
struct Args {
    /// Scenario file (TOML)
    #[arg(long, default_value = "data/scenario.toml")]
    scenario: PathBuf,

    /// Cognition config file (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every entity and its components
    QueryWorld,
    /// List entity names
    ListEntities,
    /// Describe one entity by name
    DescribeEntity { name: String },
    /// Say something to every agent and run cognitive ticks
    Say {
        text: String,

        /// Ticks to run after speaking
        #[arg(long, default_value_t = 1)]
        ticks: u32,

        /// Dump the oracle audit trail afterwards
        #[arg(long)]
        audit: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("world_sim=info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CognitionConfig::load(path)?,
        None => CognitionConfig::default(),
    };

    let mut scenario = Scenario::load(&args.scenario)?;

    match args.command {
        Command::QueryWorld => print!("{}", world_state(&scenario.world)),
        Command::ListEntities => {
            for name in entity_names(&scenario.names) {
                println!("{}", name);
            }
        }
        Command::DescribeEntity { name } => print!("{}", describe_entity(&scenario.world, &scenario.names, &name)),
        Command::Say { text, ticks, audit } => {
            let client = LlmClient::from_env()?;
            tracing::info!(model = client.model(), "oracle ready");

            let recorder = Arc::new(MemoryAuditSink::new());
            let sink: Arc<dyn AuditSink> = if audit { recorder.clone() } else { Arc::new(TracingAuditSink) };
            let gateway = Arc::new(
                OracleGateway::new(Arc::new(client))
                    .with_audit(sink)
                    .with_timeout(config.oracle_timeout()),
            );

            broadcast(&mut scenario.agents, &Stimulus::speech(text, now_millis()).from_source("Narrator"));

            for _ in 0..ticks {
                let events = run_world_tick(
                    &mut scenario.world,
                    &scenario.names,
                    &mut scenario.agents,
                    Arc::clone(&gateway),
                    &config,
                )
                .await;
                println!("=== Tick {} ===", scenario.world.current_tick);
                for event in &events {
                    print_event(event);
                }
            }

            if audit {
                for record in recorder.records() {
                    print_audit(&record);
                }
            }
        }
    }

    Ok(())
}

fn print_event(event: &TickEvent) {
    match event {
        TickEvent::Thought { agent, thought } => println!("{} thinks: {}", agent, thought),
        TickEvent::ActionRequested { agent, action } => println!(
            "{} wants to {} {}",
            agent,
            action.tool,
            action.parameters
        ),
        TickEvent::GoalsGenerated { agent, count } => println!("{} set {} new goal(s)", agent, count),
        TickEvent::GoalCompleted { agent, goal } => println!("{} completed: {}", agent, goal),
        TickEvent::GoalsReplaced { agent, retired, .. } => println!("{} dropped {} goal(s) for new ones", agent, retired),
        TickEvent::PlanCreated { agent, goal, steps } => println!("{} planned {} step(s) for: {}", agent, steps, goal),
        TickEvent::PlanFailed { agent, goal, error } => println!("{} could not plan '{}': {}", agent, goal, error),
        other => tracing::debug!(event = ?other, "tick event"),
    }
}

fn print_audit(record: &AuditRecord) {
    match record {
        AuditRecord::Prompt { caller_id, prompt, .. } => println!("--- prompt [{}]\n{}", caller_id, prompt),
        AuditRecord::Response {
            caller_id,
            text,
            latency_ms,
        } => println!("--- response [{}] {}ms\n{}", caller_id, latency_ms, text),
        AuditRecord::Error {
            caller_id,
            error,
            context,
        } => println!("--- error [{}] {}: {}", caller_id, context, error),
    }
}

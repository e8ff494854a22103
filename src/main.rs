use std::path::PathBuf;
use std::sync::Arc;

use agentdb_core::settings::{load_settings, AgentDbSettings};
use agentdb_core::{AgentId, ToolContext};
use agentdb_store::{AgentStores, ConnectionConfig};
use agentdb_telemetry::{init_telemetry, TelemetryConfig};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

/// Per-agent memory store with layered context awakening.
#[derive(Debug, Parser)]
#[command(name = "agentdb", version)]
struct Cli {
    /// Directory holding one `<agent_id>.db` per agent.
    #[arg(long, global = true, env = "AGENTDB_AGENTS_DIR")]
    agents_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the tool surface and admin API over HTTP.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// List agents with their record counts.
    Agents,
    /// Print an agent's awakening context.
    Awaken {
        agent_id: String,
        /// Include the 20 most recent tool calls.
        #[arg(long)]
        tool_history: bool,
    },
}

impl Cli {
    /// CLI flags override everything loaded from file and env.
    fn apply(&self, settings: &mut AgentDbSettings) {
        if let Some(dir) = &self.agents_dir {
            settings.agents_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        if self.json_logs {
            settings.logging.json = true;
        }
        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                settings.server.host = host.clone();
            }
            if let Some(port) = port {
                settings.server.port = *port;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings().context("failed to load settings")?;
    cli.apply(&mut settings);

    let telemetry = TelemetryConfig::from_settings(&settings.logging)?;
    init_telemetry(&telemetry)?;

    let stores = Arc::new(
        AgentStores::new(
            &settings.agents_dir,
            ConnectionConfig {
                pool_size: settings.store.pool_size,
                busy_timeout_ms: settings.store.busy_timeout_ms,
            },
        )
        .with_context(|| format!("failed to open {}", settings.agents_dir.display()))?,
    );

    match cli.command {
        Command::Serve { .. } => serve(&settings, stores).await,
        Command::Agents => list_agents(&stores),
        Command::Awaken {
            agent_id,
            tool_history,
        } => awaken(stores, &agent_id, tool_history).await,
    }
}

async fn serve(settings: &AgentDbSettings, stores: Arc<AgentStores>) -> Result<()> {
    let config = agentdb_server::ServerConfig::from(&settings.server);
    let handle = agentdb_server::start(config, stores)
        .await
        .context("failed to start server")?;
    tracing::info!(port = handle.port, "agentdb server ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}

fn list_agents(stores: &AgentStores) -> Result<()> {
    let mut summaries = Vec::new();
    for agent in stores.list_agents()? {
        summaries.push(stores.get_or_open(&agent)?.summary()?);
    }
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}

/// Awaken through the registry so the call is logged like any other.
async fn awaken(stores: Arc<AgentStores>, raw: &str, tool_history: bool) -> Result<()> {
    let agent_id = AgentId::parse(raw)?;
    let registry = agentdb_engine::create_default_registry(stores);
    let Some(tool) = registry.get("awaken") else {
        bail!("awaken tool is not registered");
    };
    let args = serde_json::json!({
        "agent_id": agent_id.as_str(),
        "include_tool_history": tool_history,
    });
    let bundle = tool.execute(args, &ToolContext::new(agent_id)).await?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

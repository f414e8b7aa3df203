use datagen_bridge::agent::{AgentRuntime, DataGenAgent};
use datagen_bridge::config::Config;
use datagen_bridge::gateway::{self, AppState};
use datagen_bridge::models::OpenAIProvider;
use datagen_bridge::session::SessionStore;
use datagen_bridge::tools::ToolRegistry;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "datagen", version, about = "WebSocket bridge to the DataGen sample-data agent")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the WebSocket bridge (default)
    Serve {
        /// Listen host (overrides WS_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides WS_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Model identifier (overrides MODEL)
        #[arg(long)]
        model: Option<String>,
    },
    /// Invoke a single tool directly and print its result
    Tool {
        /// Tool name (write_json, read_json, generate_sample_users)
        name: String,
        /// JSON-encoded arguments
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = Cli::parse();
    let mut cfg = Config::resolve(cli.config.as_deref()).await?;

    match cli.command {
        Some(Command::Tool { name, args }) => run_tool(&cfg, &name, &args).await,
        Some(Command::Serve { host, port, model }) => {
            if let Some(h) = host {
                cfg.host = h;
            }
            if let Some(p) = port {
                cfg.port = p;
            }
            if let Some(m) = model {
                cfg.model = m;
            }
            serve(cfg).await
        }
        None => serve(cfg).await,
    }
}

async fn run_tool(cfg: &Config, name: &str, raw_args: &str) -> anyhow::Result<()> {
    let args: serde_json::Value =
        serde_json::from_str(raw_args).context("--args must be valid JSON")?;
    let registry = ToolRegistry::with_builtins(&cfg.data_dir);
    let result = registry.call(name, args).await?;
    match result {
        serde_json::Value::String(s) => println!("{s}"),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let api_key = cfg.require_api_key()?;
    let provider = OpenAIProvider::new(
        api_key,
        &cfg.base_url,
        cfg.model.as_str(),
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    info!(endpoint = provider.endpoint(), model = provider.model(), "model provider ready");

    let tools = ToolRegistry::with_builtins(&cfg.data_dir);
    info!(tools = ?tools.names(), data_dir = %cfg.data_dir.display(), "tools registered");

    let agent: Arc<dyn AgentRuntime> = Arc::new(
        DataGenAgent::new(Arc::new(provider), tools).with_max_steps(cfg.max_agent_steps),
    );
    let sessions = SessionStore::with_max_turns(cfg.max_history_turns);

    let addr = cfg.listen_addr();
    let gw = gateway::start_gateway(addr.as_str(), AppState::new(agent, sessions))
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("DataGen WebSocket server listening on ws://{}", gw.addr);

    tokio::signal::ctrl_c().await?;
    info!(open = gw.sessions.len(), "received Ctrl-C, shutting down");
    gw.shutdown().await;
    info!("shutdown complete");

    Ok(())
}

//! Diagnostic CLI for the Graphlink MCP adapter.
//!
//! Exercises the client facade directly: list the remote tool catalog,
//! invoke a tool, inspect workspaces, or dump cache counters.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map as JsonMap, Value};

use graphlink_client::{GraphlinkClient, GraphlinkConfig};

#[derive(Parser)]
#[command(name = "graphlink", about = "Graphlink MCP adapter diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tools exposed by the active graph.
    Tools,
    /// Invoke a tool and print its result.
    Call {
        /// Tool name.
        name: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// List known workspaces.
    Workspaces,
    /// Print result-cache counters.
    CacheStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = GraphlinkConfig::from_env().context("load configuration from GRAPHLINK_* variables")?;
    let client = GraphlinkClient::new(config)?;

    match cli.command {
        Command::Tools => {
            let tools = client.list_tools().await?;
            for tool in tools {
                match tool.description {
                    Some(description) => println!("{}\t{}", tool.name, description),
                    None => println!("{}", tool.name),
                }
            }
        }
        Command::Call { name, args } => {
            let arguments = parse_arguments(&args)?;
            let result = client.handle_tool_call(&name, arguments).await;
            println!("{}", result.as_text());
        }
        Command::Workspaces => {
            let result = client.handle_tool_call("list-workspaces", JsonMap::new()).await;
            println!("{}", result.as_text());
        }
        Command::CacheStats => {
            let stats = client.cache_stats().await;
            println!(
                "hits: {}  misses: {}  entries: {}  hit rate: {}",
                stats.hits,
                stats.misses,
                stats.entries,
                stats.hit_rate()
            );
        }
    }

    client.shutdown().await;
    Ok(())
}

fn parse_arguments(raw: &str) -> Result<JsonMap<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("parse --args as JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--args must be a JSON object"),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

//! Graphoni CLI: search, inspect and propose changes to the Graphoni graph wiki.
//!
//! Also hosts the MCP tool server (`graphoni mcp`).

mod commands;
mod render;

use clap::Parser;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Command-line client for the Graphoni graph wiki
#[derive(Parser, Debug)]
#[command(name = "graphoni", version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Server URL (default: $GRAPHONI_URL or http://localhost:3001)
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key (default: $GRAPHONI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output raw JSON
    #[arg(short, long, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search nodes
    Search {
        /// Search query
        query: String,
        /// Max results (default: 20)
        #[arg(short = 'n', long = "limit")]
        limit: Option<i64>,
        /// Comma-separated node types to filter
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
    },
    /// Get a node and its neighborhood
    Node {
        /// Node ID
        id: String,
        /// Hops to expand (default: 1)
        #[arg(long)]
        hops: Option<i64>,
        /// Max elements (default: 100)
        #[arg(short = 'n', long = "limit")]
        limit: Option<i64>,
    },
    /// Expand the neighborhood around a node
    Expand {
        /// Node ID
        id: String,
        /// Hops to expand (default: 1)
        #[arg(long)]
        hops: Option<i64>,
        /// Max elements (default: 100)
        #[arg(short = 'n', long = "limit")]
        limit: Option<i64>,
    },
    /// Find the shortest path between two nodes
    Path {
        /// Source node ID
        from_node: String,
        /// Target node ID
        to_node: String,
        /// Max path length (default: 6)
        #[arg(long)]
        max_length: Option<i64>,
    },
    /// Graph statistics
    Stats,
    /// Run a complex query (structured, cypher, search or community)
    Query {
        /// Raw query-language string, passed through verbatim
        #[arg(long)]
        cypher: Option<String>,
        /// Free-text search
        #[arg(long)]
        search: Option<String>,
        /// Community ID
        #[arg(long)]
        community: Option<String>,
        /// Community level
        #[arg(long)]
        level: Option<i64>,
        /// Comma-separated node types (structured)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
        /// Property filters as a JSON object (structured)
        #[arg(long, value_parser = parse_json_object)]
        filters: Option<Map<String, Value>>,
        /// Center node ID (structured)
        #[arg(long)]
        center: Option<String>,
        /// Hops from the center node (structured)
        #[arg(long)]
        hops: Option<i64>,
        /// Max results (default: 5000)
        #[arg(short = 'n', long = "limit")]
        limit: Option<i64>,
    },
    /// Submit an add-node proposal
    AddNode {
        /// Node label
        #[arg(long)]
        label: String,
        /// Node type
        #[arg(long = "type")]
        node_type: String,
        /// Reason for the change
        #[arg(long)]
        reason: String,
        /// Additional properties as a JSON object
        #[arg(long, value_parser = parse_json_object)]
        properties: Option<Map<String, Value>>,
    },
    /// Submit an edit-node proposal
    EditNode {
        /// Node ID
        id: String,
        /// Reason for the change
        #[arg(long)]
        reason: String,
        /// Properties as a JSON object
        #[arg(long, value_parser = parse_json_object)]
        properties: Map<String, Value>,
    },
    /// Submit a delete-node proposal
    DeleteNode {
        /// Node ID
        id: String,
        /// Reason for the change
        #[arg(long)]
        reason: String,
    },
    /// Submit an add-edge proposal
    AddEdge {
        /// Source node ID
        #[arg(long)]
        source: String,
        /// Target node ID
        #[arg(long)]
        target: String,
        /// Edge type
        #[arg(long)]
        edge_type: String,
        /// Reason for the change
        #[arg(long)]
        reason: String,
        /// Additional properties as a JSON object
        #[arg(long, value_parser = parse_json_object)]
        properties: Option<Map<String, Value>>,
    },
    /// Submit an edit-edge proposal
    EditEdge {
        /// Edge ID
        id: String,
        /// Reason for the change
        #[arg(long)]
        reason: String,
        /// Properties as a JSON object
        #[arg(long, value_parser = parse_json_object)]
        properties: Map<String, Value>,
    },
    /// Submit a delete-edge proposal
    DeleteEdge {
        /// Edge ID
        id: String,
        /// Reason for the change
        #[arg(long)]
        reason: String,
    },
    /// List proposals
    Proposals {
        /// Filter by status (pending, approved, rejected, applied, failed)
        #[arg(long)]
        status: Option<String>,
        /// Max results (default: 50)
        #[arg(short = 'n', long = "limit")]
        limit: Option<i64>,
        /// Results to skip
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show a single proposal
    Proposal {
        /// Proposal ID
        id: String,
    },
    /// Approve a proposal
    Approve {
        /// Proposal ID
        id: String,
        /// Review comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reject a proposal
    Reject {
        /// Proposal ID
        id: String,
        /// Review comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// View the audit log
    Audit {
        /// Filter by target node ID
        #[arg(long)]
        node: Option<String>,
        /// Filter by action
        #[arg(long)]
        action: Option<String>,
        /// Filter by user ID
        #[arg(long)]
        user: Option<String>,
        /// Max results (default: 50)
        #[arg(short = 'n', long = "limit")]
        limit: Option<i64>,
        /// Entries to skip
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show the account behind the API key
    Me,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Serve the Graphoni tools over MCP (JSON-RPC on stdio)
    Mcp,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create the default user configuration file
    Init,
    /// Show the effective configuration (API key masked)
    Show,
}

fn parse_json_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

/// Stderr log level for the given flags. `RUST_LOG` takes precedence.
fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose, cli.quiet)));

    // stdout carries command output and the MCP protocol
    let layer = if cli.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = graphoni_core::load_config(cli.config.as_deref())?;
    config.apply_overrides(cli.url.as_deref(), cli.api_key.as_deref());
    debug!(
        url = %config.server.url,
        authenticated = config.server.api_key.is_some(),
        timeout_secs = ?config.server.timeout_secs,
        "Resolved configuration"
    );

    commands::handle_command(cli.command, config, cli.json).await
}

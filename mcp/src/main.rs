use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use attio_mcp_runtime::{DEFAULT_API_URL, GatewayConfig, McpCommands, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "attio-mcp",
    version,
    about = "Attio MCP server: CRM records, lists, schema, notes and tasks over stdio"
)]
struct Cli {
    /// Attio API base URL
    #[arg(long, env = "ATTIO_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Attio API key, sent as a bearer token
    #[arg(long, env = "ATTIO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "ATTIO_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: McpCommands,
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "attio_mcp=info,attio_mcp_runtime=info".into());
    let (json, plain) = if log_json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = GatewayConfig::new(
        cli.api_url,
        cli.api_key,
        Duration::from_secs(cli.timeout_secs),
    );
    let code = run_mcp(config, cli.command).await;
    std::process::exit(code);
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
use commands::{
    describe_ttl, describe_urn, handle_config_command, load_config, parse_request,
    parse_response, ConfigCommands,
};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Relay CLI - inspect cache keys, TTL policies and configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log as JSON instead of human-readable text
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URN of a JSON-RPC request
    Urn {
        /// The request, e.g. '{"jsonrpc":"2.0","method":"get_block","params":[1],"id":1}'
        request: String,
    },

    /// Resolve the cache TTL of a JSON-RPC request
    Ttl {
        /// The request JSON
        request: String,

        /// Last irreversible block number used for irreversibility checks
        #[arg(long, default_value = "0")]
        lib: u64,

        /// Upstream response (envelope or bare result) to classify
        #[arg(long)]
        response: Option<String>,

        /// Config file holding the policy table
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Logs go to stderr so command output stays pipeable.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,relay_core=warn,relay_cli=info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer =
            tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Commands::Urn { request } => {
            let request = parse_request(&request)?;
            print!("{}", describe_urn(&request));
        }

        Commands::Ttl { request, lib, response, file } => {
            let request = parse_request(&request)?;
            let response = response.as_deref().map(parse_response).transpose()?;
            let table = load_config(&file)?.policy_table()?;
            tracing::debug!(method = %request.method, lib, "resolving ttl");
            print!("{}", describe_ttl(table, &request, lib, response.as_ref()));
        }

        Commands::Config(config_command) => {
            handle_config_command(config_command)?;
        }
    }

    Ok(())
}

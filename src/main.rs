//! icaet-mcp CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use icaet_mcp::{
    commands::{cmd_check, cmd_query, print_check, print_query_result, print_settings_help},
    config::{get_settings, Config, ResponseFormat, Settings},
    error::{Error, Result},
    kb::QueryClient,
    mcp::McpServer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "icaet-mcp")]
#[command(version, about = "ICAET knowledge base MCP server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio (default)
    Serve,

    /// Ask the knowledge base a single question
    Query {
        /// The question to ask
        question: String,

        /// Output format (defaults to the config file setting)
        #[arg(long, value_enum)]
        format: Option<ResponseFormat>,
    },

    /// Validate credentials and configuration
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();
    match cli.command.unwrap_or(Commands::Serve) {
        // Completions need neither config nor credentials
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "icaet-mcp", &mut std::io::stdout());
        }

        Commands::Serve => {
            let (config, settings) = startup(config_path)?;
            let client = QueryClient::new(settings, &config.api)?;
            let server = McpServer::new(config, Arc::new(client));
            server
                .run()
                .await
                .map_err(|e| Error::McpProtocol(e.to_string()))?;
        }

        Commands::Query { question, format } => {
            let (config, settings) = startup(config_path)?;
            let format = format.unwrap_or(config.response.format);
            let client = QueryClient::new(settings, &config.api)?;
            match cmd_query(&client, &question).await {
                Ok(response) => print_query_result(&response, format),
                Err(e) => {
                    eprintln!("Error: {}", e.user_message(config.api.auth_error_hints));
                    std::process::exit(1);
                }
            }
        }

        Commands::Check { json } => {
            let (config, settings) = startup(config_path)?;
            let info = cmd_check(&config, settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_check(&info);
            }
        }
    }

    Ok(())
}

/// Load the config file and validate credentials; exits with guidance when
/// credentials are missing or invalid.
fn startup(config_path: Option<&Path>) -> Result<(Config, Arc<Settings>)> {
    info!("Starting ICAET MCP v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(config_path)?;
    config.validate()?;

    let settings = match get_settings() {
        Ok(s) => s,
        Err(e) => {
            error!("Configuration validation failed");
            print_settings_help(&e);
            std::process::exit(1);
        }
    };
    info!(api_key = %settings.masked_api_key(), "Configuration validated successfully");

    Ok((config, settings))
}

/// Logs always go to stderr; stdout carries the MCP protocol
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

//! TikZ CLI - render TikZ diagrams and maintain cached renders in documents.
//!
//! Provides commands for:
//! - `render`: Render TikZ source to SVG markup
//! - `refresh`: Re-render the TikZ blocks of a stored HTML document
//! - `inspect`: List the TikZ blocks of a document and their cache state

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tikz_config::{CliSettings, Config};
use tracing_subscriber::EnvFilter;

use commands::{InspectArgs, RefreshArgs, RenderArgs};
use error::CliError;
use output::Output;

/// TikZ - render TikZ diagrams through a remote render service.
#[derive(Parser)]
#[command(name = "tikz", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to configuration file (default: auto-discover tikz.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Render service endpoint (overrides config and plugin lookup).
    #[arg(long, global = true, env = "TIKZ_RENDER_ENDPOINT")]
    endpoint: Option<String>,

    /// HTTP timeout in seconds (overrides config).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl GlobalArgs {
    fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render TikZ source to markup.
    Render(RenderArgs),
    /// Refresh the cached renders of TikZ blocks in an HTML document.
    Refresh(RefreshArgs),
    /// List TikZ blocks in an HTML document.
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Inspect(args) => args.execute(),
        Commands::Render(args) => {
            let config = cli.global.load_config()?;
            runtime()?.block_on(args.execute(&config))
        }
        Commands::Refresh(args) => {
            let config = cli.global.load_config()?;
            runtime()?.block_on(args.execute(&config))
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(CliError::Runtime)
}

//! `resolver-server` binary entry point.

mod error;
mod handlers;
mod persistence;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use resolver_core::capabilities::{NullGeoResolver, RegexUserAgentParser};
use resolver_core::config::Config;
use resolver_core::loader::ConditionalLoader;
use resolver_core::logging;
use resolver_core::store::Store;
use tracing::info;

use crate::error::ServerError;
use crate::persistence::FilePersistence;
use crate::server::AppState;

/// `resolver-server` command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "resolver-server", about = "Context-aware configuration resolution service")]
struct Args {
    /// Path to a TOML configuration file. Falls back to environment
    /// variables (`RESOLVER_*`) and defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

fn load_configuration(args: &Args) -> Result<Config, ServerError> {
    let config = match &args.config {
        Some(path) => Config::from_file(path).map_err(ServerError::Core)?,
        None => Config::from_env().unwrap_or_default(),
    };
    Ok(config)
}

fn apply_cli_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config
}

fn initialize_app(args: &Args) -> Result<Config, ServerError> {
    let config = load_configuration(args)?;
    let config = apply_cli_overrides(config, args);
    config.validate().map_err(ServerError::Core)?;

    logging::init_tracing(&config.logging).map_err(ServerError::Core)?;
    info!(host = %config.server.host, port = config.server.port, "resolver-server starting");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = Args::parse();
    let config = initialize_app(&args)?;

    let persistence = Arc::new(FilePersistence::new(config.persistence.spec_dir.clone()));
    let state = AppState {
        store: Store::new(),
        loader: Arc::new(ConditionalLoader::new()),
        ua_parser: Arc::new(RegexUserAgentParser::default()),
        geo_resolver: Arc::new(NullGeoResolver),
        persistence,
        config: config.clone(),
    };

    server::run(config, state).await
}

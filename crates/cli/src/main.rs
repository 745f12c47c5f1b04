mod config;
mod error;

use std::path::PathBuf;

use caveats::{Chain, Permission, Registry, sort_caveats_json};
use clap::{Parser, Subcommand};
use rpc::{Request, Response, RpcError};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

const CONFIG_FILE: &str = "caveats.toml";

#[derive(Parser)]
#[command(name = "caveat")]
#[command(about = "Inspect and exercise caveated permissions", long_about = None)]
#[command(version)]
struct Cli {
    /// Permissions file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every permission with its caveats in canonical order
    Show,
    /// Run a JSON-RPC request through the caveats of its method's permission
    Check {
        /// The request, as JSON
        #[arg(short, long)]
        request: String,
        /// What the restricted method answers, as JSON
        #[arg(long)]
        result: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;
    let permissions = config.permissions(&Registry::builtin())?;
    info!(path = %cli.config.display(), count = permissions.len(), "loaded permissions");

    match cli.command {
        Commands::Show => cmd_show(&permissions),
        Commands::Check { request, result } => cmd_check(&permissions, &request, result.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_show(permissions: &[Permission]) -> Result<()> {
    for permission in permissions {
        let mut value = serde_json::to_value(permission)?;
        if let Some(caveats) = value.get_mut("caveats") {
            sort_caveats_json(caveats);
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn cmd_check(permissions: &[Permission], request: &str, result: Option<&str>) -> Result<()> {
    let request = Request::parse(request)?;
    let result: Value = match result {
        Some(json) => serde_json::from_str(json)?,
        None => Value::Null,
    };

    let response = check_request(permissions, request, result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn check_request(permissions: &[Permission], request: Request, result: Value) -> Response {
    match permissions.iter().find(|p| p.method == request.method) {
        Some(permission) => {
            let response = Chain::new(permission).run(request, |_| Ok(result));
            if let Some(error) = &response.error {
                warn!(%error, "request rejected");
            }
            response
        }
        None => {
            warn!(method = %request.method, "no permission for method");
            Response::failure(request.id.clone(), RpcError::unauthorized(&request))
        }
    }
}

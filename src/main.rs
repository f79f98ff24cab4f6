//! `fleet-sync` command-line front end.
//!
//! Loads configuration, initializes logging and metrics, then runs one
//! subcommand against the configured backend.

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use fleet_sync::config::{load_config, FleetConfig};
use fleet_sync::observability::{logging, metrics};
use fleet_sync::session::{Session, SessionStore, UserDescriptor};
use fleet_sync::{FleetClient, RealtimeClient};

#[derive(Parser)]
#[command(name = "fleet-sync")]
#[command(about = "Fleet data access and real-time sync", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a resource collection
    Fetch {
        resource: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Fetch a single page instead of the whole collection
        #[arg(long)]
        page: Option<u32>,
    },
    /// Stream real-time events to stdout until interrupted
    Watch {
        /// Event types to subscribe in addition to the standing channels
        channels: Vec<String>,
    },
    /// Store a credential in the session file
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "operator")]
        role: String,
    },
    /// Clear the session file
    Logout,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FleetConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("fleet-sync v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    match cli.command {
        Commands::Fetch {
            resource,
            params,
            page,
        } => fetch(&config, &resource, params, page).await,
        Commands::Watch { channels } => watch(&config, channels).await,
        Commands::Login {
            token,
            user_id,
            name,
            role,
        } => {
            let store = session_store(&config)?;
            store.sign_in(Session {
                token,
                user: UserDescriptor {
                    id: user_id,
                    name,
                    role,
                },
            })?;
            println!("Signed in");
            Ok(())
        }
        Commands::Logout => {
            session_store(&config)?.sign_out()?;
            println!("Signed out");
            Ok(())
        }
    }
}

async fn fetch(
    config: &FleetConfig,
    resource: &str,
    params: Vec<(String, String)>,
    page: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = FleetClient::from_config(config)?;

    let mut map: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let envelope = match page {
        Some(page) => {
            map.insert("page".to_string(), Value::from(page));
            map.entry("limit")
                .or_insert_with(|| Value::from(config.pagination.page_size));
            client.fetch_page(resource, &Value::Object(map)).await
        }
        None => client.fetch(resource, &Value::Object(map)).await,
    };

    if !envelope.is_online() {
        tracing::warn!(resource = %resource, "Backend unreachable, showing fallback data");
    }

    match envelope.data() {
        Some(page) if envelope.is_success() => {
            println!("{}", serde_json::to_string_pretty(page)?);
            Ok(())
        }
        _ => Err(envelope
            .error()
            .unwrap_or("request failed")
            .to_string()
            .into()),
    }
}

async fn watch(config: &FleetConfig, channels: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let client = RealtimeClient::from_config(config);
    for channel in channels {
        let label = channel.clone();
        client.subscribe(
            &channel,
            Arc::new(move |payload| println!("{} {}", label, payload)),
        );
    }
    client.connect();

    tokio::signal::ctrl_c().await?;
    client.disconnect();
    tracing::info!("Shutdown complete");
    Ok(())
}

fn session_store(config: &FleetConfig) -> std::io::Result<SessionStore> {
    match &config.session.path {
        Some(path) => SessionStore::load_from_file(std::path::Path::new(path)),
        None => Ok(SessionStore::default()),
    }
}

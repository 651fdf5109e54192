use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dow_ladder::api::state::AppState;
use dow_ladder::config::AppConfig;
use dow_ladder::fetch::{RankingApi, RelicClient};
use dow_ladder::parse_duration;
use dow_ladder::service::{LadderService, ViewKey};
use dow_ladder::storage::{SnapshotStore, StorageConfig};
use dow_ladder::MatchType;

#[derive(Parser)]
#[command(name = "dow-ladder")]
#[command(about = "Dawn of War: Definitive Edition ladder aggregation service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Capture ranking snapshots (the scheduled refresh job)
    Snapshot {
        /// View to snapshot (e.g. "combined-1v1" or "board-4")
        #[arg(long)]
        mode: Option<String>,

        /// Snapshot every combined view
        #[arg(long)]
        all: bool,

        /// Run continuously at interval
        #[arg(long)]
        watch: bool,

        /// Snapshot interval (e.g., "6h", "30m")
        #[arg(long, default_value = "1h")]
        interval: String,
    },

    /// Fetch a combined view once and print it as JSON
    Fetch {
        /// Match type (1v1, 2v2, 3v3, 4v4)
        #[arg(long, default_value = "1v1")]
        match_type: String,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
}

fn build_service(config: &AppConfig) -> Result<Arc<LadderService>> {
    let api: Arc<dyn RankingApi> = Arc::new(RelicClient::new(config.relic.clone())?);
    let store = SnapshotStore::new(StorageConfig::new(config.data_dir.clone()));
    Ok(Arc::new(LadderService::new(api, store)))
}

async fn run_snapshots(service: &LadderService, targets: &[ViewKey]) {
    for key in targets {
        match service.take_snapshot(key).await {
            Ok(snapshot) => {
                println!("Captured {} ({} rows)", snapshot.mode, snapshot.rows.len());
            }
            Err(e) => {
                tracing::error!("Snapshot of {} failed: {}", key, e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting dow-ladder v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load_or_default(Path::new(&cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState {
                service: build_service(&config)?,
                started_at: Utc::now(),
            };
            let app = dow_ladder::api::build_router(state);

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }

        Commands::Snapshot {
            mode,
            all,
            watch,
            interval,
        } => {
            let service = build_service(&config)?;

            let targets: Vec<ViewKey> = if all {
                ViewKey::combined_all()
            } else if let Some(mode) = mode {
                vec![mode.parse().map_err(anyhow::Error::msg)?]
            } else {
                eprintln!("Specify --mode or --all");
                return Ok(());
            };

            if watch {
                let every = parse_duration(&interval).unwrap_or(Duration::from_secs(3600));
                tracing::info!(
                    "Snapshotting {} view(s) every {:?}",
                    targets.len(),
                    every
                );
                let mut ticker = tokio::time::interval(every);
                loop {
                    ticker.tick().await;
                    run_snapshots(&service, &targets).await;
                }
            } else {
                run_snapshots(&service, &targets).await;
            }
        }

        Commands::Fetch { match_type, pretty } => {
            let mt = match_type
                .parse::<MatchType>()
                .map_err(anyhow::Error::msg)?;
            let service = build_service(&config)?;

            let view = service.view(&ViewKey::Combined(mt)).await?;
            let json = if pretty {
                serde_json::to_string_pretty(&view)?
            } else {
                serde_json::to_string(&view)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}

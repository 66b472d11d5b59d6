//! Search Reindexer Main Entry Point
//!
//! Operator CLI for the search reindexing pipeline: inspects and clears
//! reindex locks, reads coverage counts and checks backend availability.
//! Sweeps themselves run inside the host application, which embeds
//! [`search_reindexer::SearchIndexer`] with its own entity registry.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use search_reindexer::{Dependencies, IndexingError, ReindexerConfig};
use search_reindexer_repository::SearchService;
use search_reindexer_shared::BackendKind;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "search-reindexer", version, about = "Search reindexing pipeline operator tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the reindex locks held for a tenant
    LockStatus {
        #[arg(long, env = "TENANT_ID")]
        tenant: String,
        /// Only show this backend's lock
        #[arg(long)]
        backend: Option<BackendKind>,
    },
    /// Force-release a tenant's reindex lock
    LockClear {
        #[arg(long, env = "TENANT_ID")]
        tenant: String,
        #[arg(long)]
        backend: BackendKind,
    },
    /// Show the coverage count of an entity type
    Coverage {
        #[arg(long, env = "TENANT_ID")]
        tenant: String,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        organization: Option<String>,
        #[arg(long)]
        backend: Option<BackendKind>,
    },
    /// Check which search backends are reachable
    Backends,
}

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("search_reindexer=info,search_reindexer_repository=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;
    }

    info!(
        service_name = "search-reindexer",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );

    Ok(())
}

fn backends_or_all(backend: Option<BackendKind>) -> Vec<BackendKind> {
    backend.map_or_else(|| BackendKind::ALL.to_vec(), |b| vec![b])
}

async fn run(command: Command, deps: Dependencies) -> Result<(), IndexingError> {
    match command {
        Command::LockStatus { tenant, backend } => {
            for kind in backends_or_all(backend) {
                match deps.lock_manager.status(kind, &tenant).await? {
                    Some(status) => println!(
                        "{}: {} by {} since {} (processed {}/{}, heartbeat {}s ago{})",
                        kind,
                        status.lock.action,
                        status.lock.organization_id.as_deref().unwrap_or("tenant"),
                        status.lock.started_at.to_rfc3339(),
                        status.lock.processed_count,
                        status.lock.total_count,
                        status.since_heartbeat.num_seconds(),
                        if status.stale { ", stale" } else { "" },
                    ),
                    None => println!("{}: no lock", kind),
                }
            }
        }
        Command::LockClear { tenant, backend } => {
            if deps.lock_manager.clear(backend, &tenant).await? {
                println!("{}: lock cleared", backend);
            } else {
                println!("{}: no lock to clear", backend);
            }
        }
        Command::Coverage {
            tenant,
            entity,
            organization,
            backend,
        } => {
            for kind in backends_or_all(backend) {
                match deps
                    .coverage
                    .get_count(kind, &entity, &tenant, organization.as_deref())
                    .await?
                {
                    Some(count) => println!("{}: {} indexed", kind, count.indexed_count),
                    None => println!("{}: no coverage recorded", kind),
                }
            }
        }
        Command::Backends => {
            let service = deps.connect_search_service(Vec::new()).await?;
            for strategy in service.strategies() {
                let state = if strategy.is_available().await {
                    "available"
                } else {
                    "unavailable"
                };
                println!("{}: {}", strategy.id(), state);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    init_tracing()?;

    let config = ReindexerConfig::from_env()?;

    let deps = match Dependencies::new(config).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    if let Err(e) = run(cli.command, deps).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    Ok(())
}

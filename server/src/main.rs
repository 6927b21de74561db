//! oc-lettings: serve the site, create tables, or run a table migration.
//!
//! Run from repo root: `cargo run -p oc-lettings-server -- serve`

use clap::{Parser, Subcommand, ValueEnum};
use oc_lettings::{
    app_router, app_tables, ensure_database_exists, ensure_tables, legacy_tables, migrate_forward,
    load_dotenv, migrate_reverse, model::UserFields, AppState, Domain, MemoryStore, PgStore,
    RecordStore, Settings, StoreBackend, TracingReporter,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "oc-lettings")]
#[command(about = "Holiday Homes lettings and profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the site over HTTP
    Serve,
    /// Create the legacy and per-domain tables that do not exist yet
    Init,
    /// Move a domain's rows between the legacy and per-domain tables
    Migrate {
        #[arg(value_enum)]
        direction: MigrateDirection,
        /// lettings or profiles
        domain: Domain,
    },
    /// Create a user allowed to use the /admin endpoints
    CreateStaff {
        username: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MigrateDirection {
    Forward,
    Reverse,
}

type BoxError = Box<dyn std::error::Error>;

async fn open_store(settings: &Settings) -> Result<Arc<dyn RecordStore>, BoxError> {
    match &settings.backend {
        StoreBackend::Postgres { database_url } => {
            ensure_database_exists(database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let dotenv_error = load_dotenv();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter)),
        )
        .init();
    if let Some(err) = dotenv_error {
        tracing::warn!(error = %err, "ignoring unreadable .env");
    }

    let store = open_store(&settings).await?;
    let reporter = Arc::new(TracingReporter::new(settings.environment()));

    match cli.command {
        Commands::Serve => {
            ensure_tables(store.as_ref(), &app_tables()).await?;
            let app = app_router(AppState::new(store, reporter));
            let listener = TcpListener::bind(settings.bind_addr).await?;
            tracing::info!("listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
        Commands::Init => {
            ensure_tables(store.as_ref(), &legacy_tables()).await?;
            ensure_tables(store.as_ref(), &app_tables()).await?;
            tracing::info!("tables ready");
        }
        Commands::Migrate { direction, domain } => {
            let report = match direction {
                MigrateDirection::Forward => {
                    migrate_forward(store.as_ref(), reporter.as_ref(), domain).await?
                }
                MigrateDirection::Reverse => {
                    migrate_reverse(store.as_ref(), reporter.as_ref(), domain).await?
                }
            };
            for (table, rows) in &report.copied {
                tracing::info!(table = %table, rows, "copied");
            }
            for table in &report.dropped {
                tracing::info!(table = %table, "dropped");
            }
        }
        Commands::CreateStaff { username, password } => {
            ensure_tables(store.as_ref(), &app_tables()).await?;
            let users = AppState::new(store, reporter).users;
            let user = users
                .create(UserFields {
                    username,
                    password,
                    is_staff: true,
                    ..UserFields::default()
                })
                .await?;
            tracing::info!(id = user.id, username = %user.username, "staff user created");
        }
    }
    Ok(())
}

//! OC Lettings: lettings and profiles backend with a reversible migration off the legacy tables.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod reporting;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;

pub use config::{load_dotenv, Settings, StoreBackend};
pub use error::{AppError, ConfigError, MigrationError, ValidationError};
pub use migration::{
    migrate_forward, migrate_reverse, Direction, Domain, Migration, MigrationReport,
};
pub use reporting::{ErrorReporter, MemoryReporter, TracingReporter};
pub use response::{success_many, success_one, success_one_ok};
pub use routes::{admin_routes, app_router, common_routes, site_routes};
pub use schema::{app_tables, legacy_tables};
pub use state::AppState;
pub use store::{
    ensure_database_exists, ensure_tables, MemoryStore, PgStore, RecordStore, WriteMode,
};

//! Runtime settings from the environment and an optional `.env` file.

use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LOG_FILTER: &str = "oc_lettings=info";

/// Load `.env` from the working directory into the process environment. Variables already set
/// win over the file. Returns the error when a `.env` exists but cannot be read, so the caller can
/// log it once logging is up; a missing file is not an error.
pub fn load_dotenv() -> Option<dotenvy::Error> {
    unreadable_dotenv(dotenvy::dotenv())
}

fn unreadable_dotenv<T>(result: Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(err) if !err.not_found() => Some(err),
        _ => None,
    }
}

/// Which record store backs the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    /// In-process store; data is lost on exit.
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub backend: StoreBackend,
    pub debug: bool,
    pub bind_addr: SocketAddr,
    pub log_filter: String,
}

impl Settings {
    /// Read `STORE`, `DATABASE_URL`, `DEBUG`, `BIND_ADDR` and `LOG_FILTER` from the process
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("STORE").as_deref().unwrap_or("postgres") {
            "postgres" => StoreBackend::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE",
                    value: other.to_string(),
                })
            }
        };
        // Anything but an explicit "True" keeps production behavior.
        let debug = matches!(lookup("DEBUG").as_deref(), Some("True" | "true" | "1"));
        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind.clone(),
        })?;
        let log_filter = lookup("LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.into());
        Ok(Settings {
            backend,
            debug,
            bind_addr,
            log_filter,
        })
    }

    /// Deployment environment attached to every reported event.
    pub fn environment(&self) -> &'static str {
        if self.debug {
            "development"
        } else {
            "production"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_postgres_in_production() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/lettings")]).unwrap();
        assert_eq!(
            s.backend,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/lettings".into()
            }
        );
        assert_eq!(s.environment(), "production");
        assert_eq!(s.bind_addr.port(), 3000);
        assert_eq!(s.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn postgres_requires_database_url() {
        assert!(matches!(settings(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn debug_true_means_development() {
        let s = settings(&[("STORE", "memory"), ("DEBUG", "True")]).unwrap();
        assert_eq!(s.backend, StoreBackend::Memory);
        assert_eq!(s.environment(), "development");
        let s = settings(&[("STORE", "memory"), ("DEBUG", "False")]).unwrap();
        assert_eq!(s.environment(), "production");
    }

    #[test]
    fn rejects_unknown_store_and_bad_address() {
        assert!(matches!(
            settings(&[("STORE", "redis")]),
            Err(ConfigError::Invalid { key: "STORE", .. })
        ));
        assert!(matches!(
            settings(&[("STORE", "memory"), ("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
    }

    #[test]
    fn missing_dotenv_is_not_reported() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, ".env");
        assert!(unreadable_dotenv::<()>(Err(dotenvy::Error::Io(missing))).is_none());
        assert!(unreadable_dotenv(Ok(())).is_none());
    }

    #[test]
    fn unreadable_dotenv_is_handed_back() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, ".env");
        let err = unreadable_dotenv::<()>(Err(dotenvy::Error::Io(denied)));
        assert!(matches!(
            err,
            Some(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::PermissionDenied
        ));
    }
}

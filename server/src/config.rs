//! Configuration management for the server.

use concord_engine::Schema;
use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL; documents stay in memory when unset
    pub database_url: Option<String>,
    /// Bearer token required on document routes, if set
    pub auth_secret: Option<String>,
    /// Default and upper bound for reconcile loops
    pub max_attempts: u32,
    /// Deadline for a single store call
    pub store_timeout: Duration,
    /// Known containers
    pub containers: Schema,
    /// Insert the demo Address/Driver documents on startup
    pub seed_demo_data: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let auth_secret = lookup("AUTH_SECRET").filter(|secret| !secret.is_empty());

        let max_attempts = parse_number(&lookup, "RECONCILE_MAX_ATTEMPTS", 10)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }

        let store_timeout = Duration::from_millis(parse_number(&lookup, "STORE_TIMEOUT_MS", 5000)?);

        let containers = match lookup("CONTAINERS") {
            Some(raw) => raw
                .parse()
                .map_err(|e: concord_engine::Error| ConfigError::InvalidContainers(e.to_string()))?,
            None => Schema::default(),
        };

        let seed_demo_data = matches!(
            lookup("SEED_DEMO_DATA").as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            host,
            port,
            database_url,
            auth_secret,
            max_attempts,
            store_timeout,
            containers,
            seed_demo_data,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid value for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("RECONCILE_MAX_ATTEMPTS must be at least 1")]
    InvalidMaxAttempts,

    #[error("Invalid CONTAINERS value: {0}")]
    InvalidContainers(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.auth_secret, None);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.store_timeout, Duration::from_millis(5000));
        assert!(config.containers.containers.is_empty());
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/concord"),
            ("RECONCILE_MAX_ATTEMPTS", "3"),
            ("STORE_TIMEOUT_MS", "250"),
            ("CONTAINERS", "Address:state:customETag,Driver"),
            ("SEED_DEMO_DATA", "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/concord"));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.containers.etag_field("Address"), "customETag");
        assert!(config.seed_demo_data);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(&[("PORT", "http")]), Err(ConfigError::InvalidPort)));
        assert!(matches!(
            load(&[("RECONCILE_MAX_ATTEMPTS", "0")]),
            Err(ConfigError::InvalidMaxAttempts)
        ));
        assert!(matches!(
            load(&[("STORE_TIMEOUT_MS", "soon")]),
            Err(ConfigError::InvalidNumber { name: "STORE_TIMEOUT_MS", .. })
        ));
        assert!(matches!(
            load(&[("CONTAINERS", "Address:state:etag:extra")]),
            Err(ConfigError::InvalidContainers(_))
        ));
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = load(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }
}

use std::str::FromStr;

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// SQLite connection URL.
    pub database_url: String,
    /// Upper bound on pooled database connections (default: `5`).
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                              |
    /// |------------------------|--------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                            |
    /// | `PORT`                 | `3000`                               |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`              |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                 |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `10`                                 |
    /// | `DATABASE_URL`         | `sqlite://bugtracker.db?mode=rwc`    |
    /// | `DB_MAX_CONNECTIONS`   | `5`                                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse_var("PORT", "port number", var("PORT", "3000"))?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_var(
            "REQUEST_TIMEOUT_SECS",
            "number of seconds",
            var("REQUEST_TIMEOUT_SECS", "30"),
        )?;
        let shutdown_timeout_secs = parse_var(
            "SHUTDOWN_TIMEOUT_SECS",
            "number of seconds",
            var("SHUTDOWN_TIMEOUT_SECS", "10"),
        )?;

        let database_url = var("DATABASE_URL", "sqlite://bugtracker.db?mode=rwc");
        let db_max_connections: u32 = parse_var(
            "DB_MAX_CONNECTIONS",
            "connection count",
            var("DB_MAX_CONNECTIONS", "5"),
        )?;
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                expected: "positive connection count",
                value: "0".into(),
            });
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            db_max_connections,
        })
    }
}

fn parse_var<T: FromStr>(
    var: &'static str,
    expected: &'static str,
    value: String,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        })
}

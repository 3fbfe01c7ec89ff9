//! Application configuration loaded from environment variables.

use domain::OrderPolicy;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json` (default `pretty`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `RETURN_WINDOW_DAYS`: days after completion a return may be requested (default `7`,
///   at most `3650`)
/// - `COMMAND_RETRIES`: retries after a concurrency conflict (default `3`)
/// - `SEED_DEMO_CATALOG`: seed demo products and stock (default `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub return_window_days: i64,
    pub command_retries: u32,
    pub seed_demo_catalog: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            return_window_days: parsed(&lookup, "RETURN_WINDOW_DAYS")
                .filter(|days: &i64| (0..=OrderPolicy::MAX_RETURN_WINDOW_DAYS).contains(days))
                .unwrap_or(defaults.return_window_days),
            command_retries: parsed(&lookup, "COMMAND_RETRIES")
                .unwrap_or(defaults.command_retries),
            seed_demo_catalog: parsed(&lookup, "SEED_DEMO_CATALOG")
                .unwrap_or(defaults.seed_demo_catalog),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Order rules derived from this configuration.
    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy::default()
            .with_return_window_days(self.return_window_days)
            .with_max_command_retries(self.command_retries)
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key)?.trim().parse().ok()
}

impl Default for Config {
    fn default() -> Self {
        let policy = OrderPolicy::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            return_window_days: policy.return_window.num_days(),
            command_retries: policy.max_command_retries,
            seed_demo_catalog: true,
        }
    }
}

//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `FACTORY_URL` - Base URL of the pizza factory
//! - `FACTORY_API_KEY` - Bearer key presented to the factory
//!
//! ## Optional
//! - `PIZZA_HOST` - Bind address (default: 127.0.0.1)
//! - `PIZZA_PORT` - Listen port (default: 3000)
//! - `PIZZA_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string.
//!   Without one the service runs on the in-memory store.
//! - `JWT_TTL_SECS` - Token lifetime in seconds (default: 86400)
//! - `METRICS_URL`, `METRICS_API_KEY`, `METRICS_INTERVAL_SECS` - Metrics collector
//! - `LOG_URL`, `LOG_API_KEY` - Log collector
//! - `TELEMETRY_SOURCE` - Source label attached to telemetry (default: jwt-pizza-service)
//! - `LOG_FORMAT` - `json` for structured output, anything else for text
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_JWT_TTL_SECS: u64 = 86_400;
const DEFAULT_METRICS_INTERVAL_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct PizzaConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Pizza factory endpoint
    pub factory: FactoryConfig,
    /// Log and metrics collectors
    pub telemetry: TelemetryConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Emit JSON log lines instead of human-readable text
    pub json_logs: bool,
}

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret used to sign session tokens
    pub secret: SecretString,
    /// How long an issued token stays valid
    pub ttl: Duration,
}

/// Pizza factory configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FactoryConfig {
    /// Base URL, e.g. `https://pizza-factory.cs329.click`
    pub url: Url,
    /// Key sent as `Authorization: Bearer <key>`
    pub api_key: SecretString,
}

impl std::fmt::Debug for FactoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Telemetry collector configuration. Every sink is optional.
#[derive(Clone)]
pub struct TelemetryConfig {
    /// Source label attached to every metric and log entry
    pub source: String,
    /// Metrics collector push endpoint
    pub metrics_url: Option<Url>,
    /// Credential for the metrics collector
    pub metrics_api_key: Option<SecretString>,
    /// How often metrics are pushed
    pub metrics_interval: Duration,
    /// Log collector push endpoint
    pub log_url: Option<Url>,
    /// Credential for the log collector
    pub log_api_key: Option<SecretString>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: "jwt-pizza-service".to_string(),
            metrics_url: None,
            metrics_api_key: None,
            metrics_interval: Duration::from_secs(DEFAULT_METRICS_INTERVAL_SECS),
            log_url: None,
            log_api_key: None,
        }
    }
}

impl std::fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("source", &self.source)
            .field("metrics_url", &self.metrics_url.as_ref().map(Url::as_str))
            .field("metrics_api_key", &self.metrics_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_interval", &self.metrics_interval)
            .field("log_url", &self.log_url.as_ref().map(Url::as_str))
            .field("log_api_key", &self.log_api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PizzaConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("PIZZA_HOST", "127.0.0.1")?;
        let port = parse_env("PIZZA_PORT", "3000")?;
        let database_url = get_database_url("PIZZA_DATABASE_URL");

        let secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&secret, "JWT_SECRET")?;
        let jwt = JwtConfig {
            secret,
            ttl: Duration::from_secs(parse_env(
                "JWT_TTL_SECS",
                &DEFAULT_JWT_TTL_SECS.to_string(),
            )?),
        };

        let factory = FactoryConfig {
            url: parse_url("FACTORY_URL", &get_required_env("FACTORY_URL")?)?,
            api_key: get_required_secret("FACTORY_API_KEY")?,
        };

        let telemetry = TelemetryConfig::from_env()?;

        Ok(Self {
            host,
            port,
            database_url,
            jwt,
            factory,
            telemetry,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// Build a configuration with defaults for everything but the token
    /// secret and the factory. No database, telemetry or Sentry.
    #[must_use]
    pub fn new(jwt: JwtConfig, factory: FactoryConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            database_url: None,
            jwt,
            factory,
            telemetry: TelemetryConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            json_logs: false,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl TelemetryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            source: get_env_or_default("TELEMETRY_SOURCE", &defaults.source),
            metrics_url: get_optional_env("METRICS_URL")
                .map(|raw| parse_url("METRICS_URL", &raw))
                .transpose()?,
            metrics_api_key: get_optional_env("METRICS_API_KEY").map(SecretString::from),
            metrics_interval: Duration::from_secs(parse_env(
                "METRICS_INTERVAL_SECS",
                &DEFAULT_METRICS_INTERVAL_SECS.to_string(),
            )?),
            log_url: get_optional_env("LOG_URL")
                .map(|raw| parse_url("LOG_URL", &raw))
                .transpose()?,
            log_api_key: get_optional_env("LOG_API_KEY").map(SecretString::from),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    get_required_env(key).map(SecretString::from)
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

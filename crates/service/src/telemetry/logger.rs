//! Structured request and factory logging.
//!
//! Every entry goes through `tracing` at `info` under [`TARGET`], whatever
//! its severity, so routine 4xx traffic stays out of Sentry. Server errors
//! are reported to Sentry once, by the error handler. When a log collector
//! is configured the entry is also pushed off-process on a spawned task. Passwords are
//! masked before an entry is built, so neither sink ever sees one.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::TelemetryConfig;

/// `tracing` target of request and factory log entries.
pub const TARGET: &str = "jwt_pizza::request_log";

/// Replacement for every `password` value.
pub const MASK: &str = "*****";

/// Severity attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level for an HTTP status.
    #[must_use]
    pub fn for_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::Error
        } else if status.is_client_error() {
            Self::Warn
        } else {
            Self::Info
        }
    }
}

/// One log entry as shipped to the collector.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub source: String,
    pub level: LogLevel,
    /// `http` or `factory`.
    pub kind: &'static str,
    pub fields: Value,
}

/// Sends sanitized log entries to `tracing` and the optional collector.
#[derive(Clone)]
pub struct RequestLogger {
    client: reqwest::Client,
    url: Option<Url>,
    api_key: Option<SecretString>,
    source: String,
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl RequestLogger {
    /// Create a logger.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &TelemetryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: config.log_url.clone(),
            api_key: config.log_api_key.clone(),
            source: config.source.clone(),
        })
    }

    /// Log one HTTP exchange.
    pub fn log_http(
        &self,
        method: &Method,
        path: &str,
        status: StatusCode,
        authorized: bool,
        request_body: &[u8],
        response_body: &[u8],
    ) {
        let fields = serde_json::json!({
            "method": method.as_str(),
            "path": path,
            "statusCode": status.as_u16(),
            "authorized": authorized,
            "reqBody": sanitize_body(request_body),
            "resBody": sanitize_body(response_body),
        });
        self.emit(LogLevel::for_status(status), "http", fields);
    }

    /// Log one call to the pizza factory.
    pub fn log_factory(&self, request: &impl Serialize, outcome: Result<u16, &str>) {
        let mut request = serde_json::to_value(request).unwrap_or(Value::Null);
        sanitize(&mut request);

        let (level, outcome) = match outcome {
            Ok(status) => (
                LogLevel::Info,
                serde_json::json!({ "statusCode": status }),
            ),
            Err(error) => (LogLevel::Error, serde_json::json!({ "error": error })),
        };

        let fields = serde_json::json!({
            "request": request,
            "outcome": outcome,
        });
        self.emit(level, "factory", fields);
    }

    fn emit(&self, level: LogLevel, kind: &'static str, fields: Value) {
        tracing::info!(target: TARGET, kind, severity = ?level, %fields, "log entry");

        let Some(url) = self.url.clone() else {
            return;
        };

        let entry = LogEntry {
            source: self.source.clone(),
            level,
            kind,
            fields,
        };
        let client = self.client.clone();
        let api_key = self.api_key.clone();

        // Requires a runtime; the request path always has one.
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        tokio::spawn(async move {
            let mut request = client.post(url).json(&entry);
            if let Some(key) = api_key {
                request = request.bearer_auth(key.expose_secret());
            }
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = response.status().as_u16(), "Log push rejected");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Log push failed"),
            }
        });
    }
}

/// Mask every `password` field, at any depth.
pub fn sanitize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key.eq_ignore_ascii_case("password") {
                    *field = Value::String(MASK.to_string());
                } else {
                    sanitize(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize),
        _ => {}
    }
}

/// Parse a body as JSON and sanitize it. Non-JSON bodies are kept as text
/// only if they do not mention a password.
#[must_use]
pub fn sanitize_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    if let Ok(mut json) = serde_json::from_slice::<Value>(body) {
        sanitize(&mut json);
        return json;
    }
    let text = String::from_utf8_lossy(body);
    if text.to_ascii_lowercase().contains("password") {
        Value::String(MASK.to_string())
    } else {
        Value::String(text.into_owned())
    }
}

//! Pizza factory client.
//!
//! Accepted orders are forwarded to the external factory, which bakes them
//! and returns a signed verification token. The call is synchronous from
//! the diner's point of view and is never retried.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use jwt_pizza_core::{Email, UserId};

use crate::config::FactoryConfig;
use crate::models::{OrderRequest, User};

/// Upper bound on a single factory call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the factory.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The factory could not be reached or sent an unreadable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The factory answered with a non-success status.
    #[error("factory rejected order: {status}")]
    Rejected {
        status: u16,
        /// Diagnostic link the factory attached, passed through verbatim.
        report_url: Option<String>,
    },

    /// Client setup failed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FactoryError {
    /// Diagnostic link to hand back to the diner, if the factory sent one.
    #[must_use]
    pub fn report_url(&self) -> Option<&str> {
        match self {
            Self::Rejected { report_url, .. } => report_url.as_deref(),
            Self::Http(_) | Self::Config(_) => None,
        }
    }
}

/// The diner as the factory sees it.
#[derive(Debug, Clone, Serialize)]
pub struct FactoryDiner<'a> {
    pub id: UserId,
    pub name: &'a str,
    pub email: &'a Email,
}

impl<'a> From<&'a User> for FactoryDiner<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id,
            name: &user.name,
            email: &user.email,
        }
    }
}

/// Body of `POST /api/order` on the factory.
#[derive(Debug, Clone, Serialize)]
pub struct FactoryOrder<'a> {
    pub diner: FactoryDiner<'a>,
    pub order: &'a OrderRequest,
}

/// What the factory hands back for a baked order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryReceipt {
    /// Verification token signed by the factory.
    pub jwt: String,
    #[serde(default)]
    pub report_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FactoryFailure {
    #[serde(default)]
    report_url: Option<String>,
}

/// HTTP client for the pizza factory.
#[derive(Clone)]
pub struct FactoryClient {
    client: reqwest::Client,
    order_url: Url,
}

impl std::fmt::Debug for FactoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryClient")
            .field("order_url", &self.order_url.as_str())
            .finish_non_exhaustive()
    }
}

impl FactoryClient {
    /// Create a factory client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &FactoryConfig) -> Result<Self, FactoryError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| FactoryError::Config(format!("invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base = config.url.as_str().trim_end_matches('/');
        let order_url = Url::parse(&format!("{base}/api/order"))
            .map_err(|e| FactoryError::Config(format!("invalid factory URL: {e}")))?;

        Ok(Self { client, order_url })
    }

    /// Send an order to be baked.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError::Rejected` for non-success responses and
    /// `FactoryError::Http` if the factory is unreachable.
    #[tracing::instrument(skip_all, fields(diner_id = %diner.id, items = order.items.len()))]
    pub async fn send_order(
        &self,
        diner: &User,
        order: &OrderRequest,
    ) -> Result<FactoryReceipt, FactoryError> {
        let body = FactoryOrder {
            diner: diner.into(),
            order,
        };

        let response = self
            .client
            .post(self.order_url.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let failure = response.json::<FactoryFailure>().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Factory rejected order");
            return Err(FactoryError::Rejected {
                status: status.as_u16(),
                report_url: failure.report_url,
            });
        }

        Ok(response.json().await?)
    }
}

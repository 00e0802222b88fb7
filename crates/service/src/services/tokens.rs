//! Session tokens.
//!
//! Tokens are HS256 JWTs carrying a snapshot of the user. A token is only
//! honoured while its SHA-256 digest is present in the session table, so
//! logout and credential changes take effect immediately.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use jwt_pizza_core::{Email, Role, UserId};

use crate::config::JwtConfig;
use crate::db::{PizzaStore, RepositoryError};
use crate::models::User;

/// Errors that can occur while issuing or validating tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed, badly signed or expired token.
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// Well-formed token whose session was revoked.
    #[error("token revoked")]
    Revoked,

    /// Session bookkeeping failed.
    #[error("session store error: {0}")]
    Repository(#[from] RepositoryError),
}

impl TokenError {
    /// Whether the failure is the client's fault (as opposed to ours).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Invalid(_) | Self::Revoked)
    }
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Registered claims are strings, so the user id travels as `"7"`.
    #[serde(with = "subject")]
    pub sub: UserId,
    pub name: String,
    pub email: Email,
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so two tokens issued in the same second differ.
    pub jti: String,
}

impl Claims {
    /// The user snapshot taken when the token was issued.
    #[must_use]
    pub fn into_user(self) -> User {
        User {
            id: self.sub,
            name: self.name,
            email: self.email,
            roles: self.roles,
        }
    }
}

mod subject {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use jwt_pizza_core::UserId;

    pub fn serialize<S: Serializer>(id: &UserId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Issues, validates and revokes session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build a token service from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: config.ttl,
        }
    }

    /// Sign a token for `user` and record it as an active session.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if signing or recording the session fails.
    pub async fn issue(&self, store: &dyn PizzaStore, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = expiry_from_now(self.ttl);

        let claims = Claims {
            sub: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        store
            .insert_session(user.id, &digest(&token), expires_at)
            .await?;

        tracing::debug!(user_id = %user.id, "Issued session token");
        Ok(token)
    }

    /// Revoke every session of `user`, then issue a fresh token.
    ///
    /// Used after a credential change so older tokens stop working.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the session store fails.
    pub async fn issue_replacing(
        &self,
        store: &dyn PizzaStore,
        user: &User,
    ) -> Result<String, TokenError> {
        let revoked = store.delete_user_sessions(user.id).await?;
        tracing::debug!(user_id = %user.id, revoked, "Revoked sessions after credential change");
        self.issue(store, user).await
    }

    /// Verify signature, expiry and session state.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for bad tokens and
    /// `TokenError::Revoked` if the session no longer exists.
    pub async fn validate(&self, store: &dyn PizzaStore, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;

        if !store.session_active(&digest(token)).await? {
            return Err(TokenError::Revoked);
        }

        Ok(data.claims)
    }

    /// End the session a token belongs to. Returns `false` if it was not active.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Repository` if the session store fails.
    pub async fn revoke(&self, store: &dyn PizzaStore, token: &str) -> Result<bool, TokenError> {
        Ok(store.delete_session(&digest(token)).await?)
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Expiry timestamp a token issued now would carry.
#[must_use]
pub fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1))
}

/// SHA-256 digest of a token, hex-encoded. Only digests are stored.
#[must_use]
pub fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

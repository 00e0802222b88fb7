//! Email address type.
//!
//! Emails are the login identifier and must be unique across users, so the
//! stored form is trimmed and lower-cased. `D@JWT.com` and `d@jwt.com` are
//! the same account.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty after trimming.
    #[error("email cannot be empty")]
    Empty,
    /// The input is longer than the RFC 5321 limit.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input is not of the form `local@domain`.
    #[error("email must look like name@domain")]
    Malformed,
}

/// A validated email address.
///
/// ```
/// use jwt_pizza_core::Email;
///
/// assert!(Email::parse("d@jwt.com").is_ok());
/// assert_eq!(Email::parse("  F@jwt.com ").unwrap().as_str(), "f@jwt.com");
/// assert!(Email::parse("pizza").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string, trimming surrounding whitespace and
    /// folding to lower case.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, has no `@`,
    /// more than one `@`, or an empty local part or domain.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_lowercase()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("a@jwt.com").is_ok());
        assert!(Email::parse("pizza.diner+tag@jwt.co.uk").is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(Email::parse("  f@jwt.com\n").unwrap().as_str(), "f@jwt.com");
    }

    #[test]
    fn test_parse_folds_case() {
        let mixed = Email::parse("Dup@JWT.com").unwrap();
        assert_eq!(mixed.as_str(), "dup@jwt.com");
        assert_eq!(mixed, Email::parse("dup@jwt.com").unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("pizza"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@jwt.com"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("d@"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("d@e@jwt.com"), Err(EmailError::Malformed));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@jwt.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"d@jwt.com\"").unwrap();
        assert_eq!(ok.to_string(), "d@jwt.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}

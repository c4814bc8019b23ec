//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers that flow through the registry.
//! A `LogicalName` is the caller's idempotence key; a `Token` is what appears
//! in the URL path.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, ImageError};

/// Caller-supplied canonical identity of an artifact.
///
/// Non-empty. Names used for static artifacts must additionally be a single
/// URL path segment; see [`LogicalName::ensure_path_segment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalName(String);

impl LogicalName {
    /// Create a validated logical name.
    pub fn new(name: impl Into<String>) -> Result<Self, ImageError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ImageError::InvalidName {
                name,
                reason: "must not be empty",
            });
        }
        Ok(Self(name))
    }

    /// Check that this name can be used verbatim as a URL path segment.
    pub fn ensure_path_segment(&self) -> Result<(), ImageError> {
        let reason = if self.0 == "." || self.0 == ".." {
            Some("must not be a relative path component")
        } else if self.0.contains(['/', '?', '#']) {
            Some("must be a single path segment")
        } else if self.0.chars().any(char::is_control) {
            Some("must not contain control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ImageError::InvalidName {
                name: self.0.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LogicalName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// URL path segment identifying an artifact to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Generate a fresh opaque token.
    ///
    /// 122 random bits from a v4 UUID, rendered as 32 lowercase hex
    /// characters so it is always a plain path segment.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Use a logical name verbatim as the token (static artifacts).
    pub fn literal(name: &LogicalName) -> Self {
        Self(name.0.clone())
    }

    /// Return the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Absolute origin that artifact URLs are built from.
///
/// Scheme must be `http` or `https` and a host is required. A path prefix is
/// allowed; query strings and fragments are not. Trailing slashes are
/// stripped so that [`BaseUrl::join`] always yields exactly one separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Parse and validate a base URL.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason,
        };
        let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", parsed.scheme())));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed".to_string()));
        }
        Ok(Self(raw.trim_end_matches('/').to_string()))
    }

    /// Build the URL for a token: `<base>/<token>`.
    pub fn join(&self, token: &Token) -> String {
        format!("{}/{}", self.0, token)
    }

    /// Return the base URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BaseUrl {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BaseUrl> for String {
    fn from(value: BaseUrl) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_logical_name_rejected() {
        assert!(matches!(
            LogicalName::new(""),
            Err(ImageError::InvalidName { .. })
        ));
    }

    #[test]
    fn path_segment_validation() {
        for ok in ["host-a.iso", "test-name-2.initramfs", "x"] {
            LogicalName::new(ok).unwrap().ensure_path_segment().unwrap();
        }
        for bad in ["a/b", ".", "..", "a?b", "a#b", "a\nb"] {
            assert!(
                LogicalName::new(bad).unwrap().ensure_path_segment().is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn generated_tokens_are_hex_segments() {
        let token = Token::generate();
        assert_eq!(token.as_str().len(), 32);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, Token::generate());
    }

    #[test]
    fn literal_token_equals_name() {
        let name = LogicalName::new("host-a.iso").unwrap();
        assert_eq!(Token::literal(&name).as_str(), "host-a.iso");
    }

    #[test]
    fn base_url_join_strips_trailing_slash() {
        let base = BaseUrl::parse("http://base.test:1234/").unwrap();
        let token = Token::literal(&LogicalName::new("img").unwrap());
        assert_eq!(base.join(&token), "http://base.test:1234/img");
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let base = BaseUrl::parse("https://images.example.com/boot").unwrap();
        let token = Token::literal(&LogicalName::new("a.iso").unwrap());
        assert_eq!(base.join(&token), "https://images.example.com/boot/a.iso");
    }

    #[test]
    fn base_url_rejects_non_http_and_relative() {
        assert!(BaseUrl::parse("ftp://host/").is_err());
        assert!(BaseUrl::parse("/relative/path").is_err());
        assert!(BaseUrl::parse("http://host/?q=1").is_err());
    }
}

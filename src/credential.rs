//! API credential resolution.
//!
//! A request may carry its own key; otherwise the process-wide configured key
//! is used. The key value is never logged: [`ApiKey`]'s `Debug` output is
//! redacted and only the [`CredentialSource`] is reported.

use std::fmt;

use crate::error::SearchError;

/// An opaque provider API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// The raw key, for placing on the outbound request only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Supplied by the caller with the request.
    Request,
    /// Configured for the whole process.
    Configured,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Configured => f.write_str("configured"),
        }
    }
}

/// Outcome of [`CredentialResolver::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub key: ApiKey,
    pub source: CredentialSource,
}

/// Ordered resolution: request-supplied, then configured, else fail.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    configured: Option<ApiKey>,
}

impl CredentialResolver {
    #[must_use]
    pub fn new(configured: Option<&str>) -> Self {
        Self {
            configured: configured.and_then(ApiKey::new),
        }
    }

    /// Whether a process-wide key is available.
    #[must_use]
    pub fn has_configured(&self) -> bool {
        self.configured.is_some()
    }

    pub fn resolve(&self, supplied: Option<&str>) -> Result<ResolvedCredential, SearchError> {
        if let Some(key) = supplied.and_then(ApiKey::new) {
            return Ok(ResolvedCredential {
                key,
                source: CredentialSource::Request,
            });
        }
        self.configured
            .clone()
            .map(|key| ResolvedCredential {
                key,
                source: CredentialSource::Configured,
            })
            .ok_or(SearchError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_wins() {
        let resolver = CredentialResolver::new(Some("configured-key"));
        let resolved = resolver.resolve(Some("request-key")).unwrap();
        assert_eq!(resolved.key.expose(), "request-key");
        assert_eq!(resolved.source, CredentialSource::Request);
    }

    #[test]
    fn test_blank_request_key_falls_back() {
        let resolver = CredentialResolver::new(Some("configured-key"));
        let resolved = resolver.resolve(Some("   ")).unwrap();
        assert_eq!(resolved.key.expose(), "configured-key");
        assert_eq!(resolved.source, CredentialSource::Configured);
    }

    #[test]
    fn test_missing_everywhere() {
        let resolver = CredentialResolver::new(Some(""));
        assert!(!resolver.has_configured());
        assert!(matches!(
            resolver.resolve(None),
            Err(SearchError::MissingCredential)
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::new("secret-value").unwrap();
        assert!(!format!("{key:?}").contains("secret-value"));
    }
}

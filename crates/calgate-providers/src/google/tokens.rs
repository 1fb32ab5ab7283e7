//! OAuth token sets and the in-process credential store.
//!
//! The service holds at most one [`TokenSet`] at a time. It is created by a
//! successful code exchange, read by every calendar operation, and replaced
//! wholesale by the next exchange.
//!
//! # Concurrency
//!
//! [`MemoryCredentialStore`] only guards each individual read or write.
//! Two logins racing each other resolve as "last write wins", and a request
//! already in flight keeps using the token it read. This is fine for a single
//! operator; it is not safe for several users authenticating concurrently,
//! since every caller shares the one slot.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seconds shaved off the reported lifetime so refresh happens before Google
/// starts rejecting the token.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// An OAuth token set issued by Google.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token sent as a bearer credential.
    pub access_token: String,

    /// The refresh token, present when offline access was granted.
    pub refresh_token: Option<String>,

    /// When the access token stops being usable.
    pub expires_at: Option<DateTime<Utc>>,

    /// Space-separated scopes that were granted.
    pub scope: Option<String>,

    /// Token type, normally `Bearer`.
    pub token_type: Option<String>,

    /// When this set was issued or last refreshed.
    pub obtained_at: DateTime<Utc>,
}

impl TokenSet {
    /// Creates a token set from token endpoint data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.and_then(|secs| expiry_from(now, secs)),
            scope: None,
            token_type: None,
            obtained_at: now,
        }
    }

    /// Sets the granted scopes.
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the token type.
    pub fn with_token_type(mut self, token_type: Option<String>) -> Self {
        self.token_type = token_type;
        self
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Tokens without a known expiry are treated as valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if the token can be refreshed without user interaction.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Returns a new set carrying a refreshed access token.
    ///
    /// Google usually omits the refresh token on refresh; the existing one
    /// is kept in that case.
    pub fn refreshed(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: expires_in_secs.and_then(|secs| expiry_from(now, secs)),
            scope: self.scope.clone(),
            token_type: self.token_type.clone(),
            obtained_at: now,
        }
    }
}

/// Computes the expiry instant, or `None` when it is not representable.
pub(crate) fn expiry_from(now: DateTime<Utc>, expires_in_secs: i64) -> Option<DateTime<Utc>> {
    let lifetime = Duration::try_seconds(expires_in_secs.checked_sub(EXPIRY_BUFFER_SECS)?)?;
    now.checked_add_signed(lifetime)
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Holder of the process-wide token set.
///
/// Implementations decide where the slot lives; the service only needs these
/// three operations.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Returns a copy of the current token set, if any.
    fn current(&self) -> Option<TokenSet>;

    /// Unconditionally installs `tokens`, dropping whatever was there.
    fn replace(&self, tokens: TokenSet);

    /// Installs `tokens` only if the stored access token is still
    /// `expected_access_token`. Returns whether the write happened.
    fn replace_if_current(&self, expected_access_token: &str, tokens: TokenSet) -> bool;
}

/// In-memory, single-slot credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<Option<TokenSet>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `tokens`.
    pub fn with_tokens(tokens: TokenSet) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn current(&self) -> Option<TokenSet> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, tokens: TokenSet) {
        debug!(
            has_refresh_token = tokens.can_refresh(),
            expires_at = ?tokens.expires_at,
            "replacing stored token set"
        );
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    fn replace_if_current(&self, expected_access_token: &str, tokens: TokenSet) -> bool {
        let mut slot = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if current.access_token == expected_access_token => {
                *slot = Some(tokens);
                true
            }
            _ => {
                debug!("stored token set changed underneath refresh, keeping newer one");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrepresentable_lifetime_has_no_expiry() {
        let now = Utc::now();
        assert!(expiry_from(now, i64::MAX).is_none());
        assert!(expiry_from(now, i64::MIN).is_none());
        assert_eq!(
            expiry_from(now, 3600),
            Some(now + Duration::seconds(3600 - EXPIRY_BUFFER_SECS))
        );
        assert!(TokenSet::new("t", None, Some(i64::MAX)).expires_at.is_none());
    }

    #[test]
    fn token_set_creation() {
        let tokens = TokenSet::new("access-token", Some("refresh-token".to_string()), Some(3600));

        assert_eq!(tokens.access_token, "access-token");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-token"));
        assert!(tokens.expires_at.is_some());
        assert!(!tokens.is_expired());
        assert!(tokens.can_refresh());
    }

    #[test]
    fn expiry_includes_buffer() {
        let tokens = TokenSet::new("access", None, Some(30));
        // 30s lifetime minus the 60s buffer is already in the past.
        assert!(tokens.is_expired());
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let tokens = TokenSet::new("access", None, None);
        assert!(!tokens.is_expired());
        assert!(!tokens.can_refresh());
    }

    #[test]
    fn refreshed_keeps_refresh_token_when_omitted() {
        let original = TokenSet::new("old", Some("keep-me".to_string()), Some(3600))
            .with_scope(Some("scope-a scope-b".to_string()))
            .with_token_type(Some("Bearer".to_string()));
        let refreshed = original.refreshed("new", None, Some(3600));

        assert_eq!(refreshed.access_token, "new");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(refreshed.scope, original.scope);
        assert_eq!(refreshed.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn refreshed_takes_rotated_refresh_token() {
        let original = TokenSet::new("old", Some("first".to_string()), Some(3600));
        let refreshed = original.refreshed("new", Some("second".to_string()), None);
        assert_eq!(refreshed.refresh_token.as_deref(), Some("second"));
        assert!(refreshed.expires_at.is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let tokens = TokenSet::new("ya29.secret", Some("1//refresh".to_string()), Some(3600));
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("ya29.secret"));
        assert!(!debug.contains("1//refresh"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn store_starts_empty() {
        let store = MemoryCredentialStore::new();
        assert!(store.current().is_none());
    }

    #[test]
    fn store_last_write_wins() {
        let store = MemoryCredentialStore::new();
        store.replace(TokenSet::new("first", Some("r1".to_string()), Some(3600)));
        store.replace(TokenSet::new("second", None, Some(3600)));

        let current = store.current().unwrap();
        assert_eq!(current.access_token, "second");
        // Replaced, not merged.
        assert!(current.refresh_token.is_none());
    }

    #[test]
    fn replace_if_current_matches() {
        let store = MemoryCredentialStore::with_tokens(TokenSet::new("old", None, None));
        assert!(store.replace_if_current("old", TokenSet::new("new", None, None)));
        assert_eq!(store.current().unwrap().access_token, "new");
    }

    #[test]
    fn replace_if_current_keeps_newer_login() {
        let store = MemoryCredentialStore::with_tokens(TokenSet::new("newer-login", None, None));
        assert!(!store.replace_if_current("stale", TokenSet::new("refreshed", None, None)));
        assert_eq!(store.current().unwrap().access_token, "newer-login");
    }

    #[test]
    fn replace_if_current_on_empty_store() {
        let store = MemoryCredentialStore::new();
        assert!(!store.replace_if_current("anything", TokenSet::new("x", None, None)));
        assert!(store.current().is_none());
    }
}

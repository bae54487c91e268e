//! Access/refresh token persistence.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::session::AuthState;
use crate::storage::{KeyValueStore, StorageError, StorageResult};

pub mod claims;

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// The bearer credentials of one signed-in user.
///
/// `Debug` never prints the token values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TokenPair {
    /// Short-lived credential attached to every request.
    pub access: String,
    /// Longer-lived credential exchanged for new access tokens.
    pub refresh: String,
}

impl TokenPair {
    /// Builds a pair from its two tokens.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Durable holder of the current [`TokenPair`].
///
/// Both tokens live in a [`KeyValueStore`] under [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`]. Reads and writes are serialized through one lock, so
/// a reader never observes a pair that is only partly written.
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl TokenStore {
    /// Wraps a key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.store.get(key)?.filter(|value| !value.is_empty()))
    }

    /// Replaces both tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store rejects the write.
    pub fn save(&self, pair: &TokenPair) -> StorageResult<()> {
        let _guard = self.guard()?;
        self.store.set_entries(&[
            (ACCESS_TOKEN_KEY, pair.access.as_str()),
            (REFRESH_TOKEN_KEY, pair.refresh.as_str()),
        ])
    }

    /// Current pair, or `None` if either token is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub fn get(&self) -> StorageResult<Option<TokenPair>> {
        let _guard = self.guard()?;
        let access = self.read(ACCESS_TOKEN_KEY)?;
        let refresh = self.read(REFRESH_TOKEN_KEY)?;
        Ok(access.zip(refresh).map(|(access, refresh)| TokenPair { access, refresh }))
    }

    /// Removes both tokens. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store rejects the delete.
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.guard()?;
        self.store
            .delete_entries(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
    }

    /// Current access token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        let _guard = self.guard()?;
        self.read(ACCESS_TOKEN_KEY)
    }

    /// Current refresh token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        let _guard = self.guard()?;
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Replaces the access token after a refresh. The refresh token is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IncompleteTokenPair`] when no refresh token is
    /// stored, or an error from the underlying store.
    pub fn set_access_token(&self, access: &str) -> StorageResult<()> {
        let _guard = self.guard()?;
        if self.read(REFRESH_TOKEN_KEY)?.is_none() {
            return Err(StorageError::IncompleteTokenPair);
        }
        self.store.set(ACCESS_TOKEN_KEY, access)
    }

    /// Whether a stored access token is present and unexpired right now.
    ///
    /// Recomputed on every call. A missing, malformed or unreadable token
    /// counts as not authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(SystemTime::now())
    }

    /// [`Self::is_authenticated`] evaluated at `now`.
    #[must_use]
    pub fn is_authenticated_at(&self, now: SystemTime) -> bool {
        match self.get() {
            Ok(Some(pair)) => claims::is_unexpired_at(&pair.access, now),
            Ok(None) => false,
            Err(e) => {
                log::debug!("token store unreadable, treating session as signed out: {e}");
                false
            }
        }
    }

    /// Auth state derived from the stored tokens at call time.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use test_case::test_case;

    use super::*;
    use crate::storage::InMemoryKeyValueStore;

    fn jwt(exp: i64) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","exp":{exp}}}"#))
        )
    }

    fn new_store() -> (Arc<InMemoryKeyValueStore>, TokenStore) {
        let backend = Arc::new(InMemoryKeyValueStore::new());
        let tokens = TokenStore::new(backend.clone());
        (backend, tokens)
    }

    #[test]
    fn test_save_get_clear() {
        let (_, tokens) = new_store();
        let pair = TokenPair::new("A1", "R1");

        tokens.save(&pair).unwrap();
        assert_eq!(tokens.get().unwrap(), Some(pair));

        tokens.clear().unwrap();
        assert_eq!(tokens.get().unwrap(), None);
        tokens.clear().unwrap();
        assert_eq!(tokens.get().unwrap(), None);
    }

    #[test]
    fn test_save_overwrites_both_tokens() {
        let (backend, tokens) = new_store();
        tokens.save(&TokenPair::new("A1", "R1")).unwrap();
        tokens.save(&TokenPair::new("A2", "R2")).unwrap();

        assert_eq!(backend.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("A2"));
        assert_eq!(backend.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R2"));
    }

    #[test]
    fn test_half_pair_reads_as_absent() {
        let (backend, tokens) = new_store();
        backend.set(ACCESS_TOKEN_KEY, "A1").unwrap();
        assert_eq!(tokens.get().unwrap(), None);

        backend.set(REFRESH_TOKEN_KEY, "").unwrap();
        assert_eq!(tokens.get().unwrap(), None);
    }

    #[test]
    fn test_set_access_token_keeps_refresh() {
        let (_, tokens) = new_store();
        tokens.save(&TokenPair::new("A1", "R1")).unwrap();
        tokens.set_access_token("A2").unwrap();

        assert_eq!(tokens.get().unwrap(), Some(TokenPair::new("A2", "R1")));
    }

    #[test]
    fn test_set_access_token_requires_refresh() {
        let (_, tokens) = new_store();
        assert!(matches!(
            tokens.set_access_token("A2"),
            Err(StorageError::IncompleteTokenPair)
        ));
        assert_eq!(tokens.access_token().unwrap(), None);
    }

    #[test_case(3_600, true ; "expires in an hour")]
    #[test_case(1, true ; "expires in a second")]
    #[test_case(0, false ; "expires now")]
    #[test_case(-60, false ; "expired a minute ago")]
    fn test_is_authenticated_by_expiry(offset_secs: i64, expected: bool) {
        let (_, tokens) = new_store();
        let now = chrono::Utc::now().timestamp();
        tokens.save(&TokenPair::new(jwt(now + offset_secs), "R1")).unwrap();

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(u64::try_from(now).unwrap());
        assert_eq!(tokens.is_authenticated_at(at), expected);
    }

    #[test]
    fn test_is_authenticated_without_or_with_malformed_token() {
        let (_, tokens) = new_store();
        assert!(!tokens.is_authenticated());
        assert_eq!(tokens.auth_state(), AuthState::Unauthenticated);

        tokens.save(&TokenPair::new("not-a-jwt", "R1")).unwrap();
        assert!(!tokens.is_authenticated());
    }

    #[test]
    fn test_auth_state_is_derived_on_every_call() {
        let (_, tokens) = new_store();
        let now = chrono::Utc::now().timestamp();
        tokens.save(&TokenPair::new(jwt(now + 3_600), "R1")).unwrap();
        assert_eq!(tokens.auth_state(), AuthState::Authenticated);

        tokens.save(&TokenPair::new(jwt(now - 3_600), "R1")).unwrap();
        assert_eq!(tokens.auth_state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", TokenPair::new("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret"));
    }
}

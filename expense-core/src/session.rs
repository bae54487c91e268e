//! Authentication routing state.
//!
//! [`AuthSession`] tracks which view a host should show (a splash while
//! checking, the login flow, or the signed-in views). The phase is published on
//! a `tokio::sync::watch` channel. Whether the stored token is *currently*
//! valid is never cached here: [`crate::TokenStore::is_authenticated`]
//! recomputes it on every call.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ExplorerError;
use crate::token::TokenStore;

/// Routing phase of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum AuthState {
    /// Startup, before the stored tokens have been looked at.
    Checking,
    /// No usable session; the login or register flow is shown.
    Unauthenticated,
    /// A session exists; authenticated views are shown.
    Authenticated,
}

/// Receives the terminal "session expired" signal from the request pipeline.
pub trait SessionObserver: Send + Sync {
    /// Called after the pipeline cleared the token store because the session
    /// could not be recovered.
    fn session_expired(&self, reason: &str);
}

/// Drives [`AuthState`] transitions.
///
/// ```text
/// Checking ──start()──▶ Authenticated      (stored token unexpired)
/// Checking ──start()──▶ Unauthenticated    (otherwise)
/// Unauthenticated ──logged_in()──▶ Authenticated
/// Authenticated ──logged_out() / session_expired()──▶ Unauthenticated
/// ```
///
/// Any other transition request is ignored.
#[derive(Debug)]
pub struct AuthSession {
    tokens: Arc<TokenStore>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    /// Creates a session in [`AuthState::Checking`].
    #[must_use]
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Checking);
        Self { tokens, state }
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Leaves [`AuthState::Checking`] based on the stored tokens. Only the first
    /// call has an effect; later calls return the current phase.
    pub fn start(&self) -> AuthState {
        let target = if self.tokens.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
        self.transition(&[AuthState::Checking], target);
        self.state()
    }

    /// Records a successful login (or register-then-login).
    ///
    /// # Errors
    ///
    /// Returns an error if no token pair is stored, since the session could not
    /// make an authenticated request.
    pub fn logged_in(&self) -> Result<AuthState, ExplorerError> {
        if self.tokens.get()?.is_none() {
            return Err(ExplorerError::InvalidInput {
                error: "cannot enter an authenticated session without stored tokens"
                    .to_string(),
            });
        }
        self.transition(&[AuthState::Unauthenticated], AuthState::Authenticated);
        Ok(self.state())
    }

    /// Records an explicit logout.
    pub fn logged_out(&self) -> AuthState {
        self.transition(&[AuthState::Authenticated], AuthState::Unauthenticated);
        self.state()
    }

    fn transition(&self, from: &[AuthState], to: AuthState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if from.contains(current) {
                *current = to;
                true
            } else {
                false
            }
        });
        if changed {
            log::debug!("auth state -> {to:?}");
        }
        changed
    }
}

impl SessionObserver for AuthSession {
    fn session_expired(&self, reason: &str) {
        log::info!("session expired: {reason}");
        self.transition(&[AuthState::Authenticated], AuthState::Unauthenticated);
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    use super::*;
    use crate::storage::InMemoryKeyValueStore;
    use crate::token::TokenPair;

    fn tokens() -> Arc<TokenStore> {
        Arc::new(TokenStore::new(Arc::new(InMemoryKeyValueStore::new())))
    }

    fn valid_jwt() -> String {
        let exp = chrono::Utc::now().timestamp() + 600;
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#)))
    }

    #[test]
    fn test_start_without_tokens() {
        let session = AuthSession::new(tokens());
        assert_eq!(session.state(), AuthState::Checking);
        assert_eq!(session.start(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_start_with_valid_token() {
        let tokens = tokens();
        tokens.save(&TokenPair::new(valid_jwt(), "R1")).unwrap();
        let session = AuthSession::new(tokens);
        assert_eq!(session.start(), AuthState::Authenticated);
    }

    #[test]
    fn test_start_is_evaluated_once() {
        let tokens = tokens();
        let session = AuthSession::new(tokens.clone());
        assert_eq!(session.start(), AuthState::Unauthenticated);

        tokens.save(&TokenPair::new(valid_jwt(), "R1")).unwrap();
        assert_eq!(session.start(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_login_logout_cycle() {
        let tokens = tokens();
        let session = AuthSession::new(tokens.clone());
        session.start();

        assert!(session.logged_in().is_err());
        assert_eq!(session.state(), AuthState::Unauthenticated);

        tokens.save(&TokenPair::new("A1", "R1")).unwrap();
        assert_eq!(session.logged_in().unwrap(), AuthState::Authenticated);
        assert_eq!(session.logged_out(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_checking_only_leaves_through_start() {
        let tokens = tokens();
        tokens.save(&TokenPair::new("A1", "R1")).unwrap();
        let session = AuthSession::new(tokens);

        assert_eq!(session.logged_in().unwrap(), AuthState::Checking);
        assert_eq!(session.logged_out(), AuthState::Checking);
        session.session_expired("test");
        assert_eq!(session.state(), AuthState::Checking);
    }

    #[tokio::test]
    async fn test_session_expired_is_published() {
        let tokens = tokens();
        tokens.save(&TokenPair::new(valid_jwt(), "R1")).unwrap();
        let session = AuthSession::new(tokens);
        session.start();

        let mut rx = session.subscribe();
        session.session_expired("refresh rejected");
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AuthState::Unauthenticated);
    }
}

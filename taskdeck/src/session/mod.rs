//! Session state: the current user and bearer token.
//!
//! The session is an explicit state object — callers hold it by reference
//! (or `Arc`) and all mutation goes through its operations. Only the token
//! survives a process restart; the user profile is re-populated by the
//! next login. A restored session therefore has a token and no profile,
//! and authentication checks look at the token alone.

pub mod persist;

pub use persist::TokenStore;

use parking_lot::Mutex;
use thiserror::Error;

use taskdeck_api::auth::{LoginRequest, RegisterRequest, User};

use crate::api::{ApiClient, ApiError};

/// Coarse session-level errors surfaced to the presentation layer.
///
/// Deliberately static and independent of the underlying cause; the
/// transport-tier detail lives in the propagated [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Login was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Registration was rejected.
    #[error("registration failed")]
    RegistrationFailed,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    token: Option<String>,
    error: Option<SessionError>,
}

/// Holds the authenticated identity for the current process.
#[derive(Debug)]
pub struct SessionStore {
    state: Mutex<SessionState>,
    tokens: TokenStore,
}

impl SessionStore {
    /// Creates an empty, unauthenticated session persisting its token via
    /// the given store.
    #[must_use]
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            tokens,
        }
    }

    /// Re-hydrates the token persisted by a previous process, if any.
    ///
    /// The user profile is not persisted, so a restored session is
    /// authenticated with `user() == None`; route gating treats a present
    /// token as sufficient. Returns whether a token was found.
    pub fn restore(&self) -> bool {
        match self.tokens.load() {
            Some(token) => {
                tracing::info!("session token restored");
                self.state.lock().token = Some(token);
                true
            }
            None => false,
        }
    }

    /// Authenticates with username and password.
    ///
    /// On success stores the returned user and token, persists the token,
    /// and clears any previous error. On failure records
    /// [`SessionError::InvalidCredentials`] and propagates the transport
    /// error so callers can react. Concurrent calls are not deduplicated —
    /// last write wins.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] when the backend rejects the
    /// credentials or the request fails.
    pub async fn login(
        &self,
        client: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let credentials = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        match client.login(&credentials).await {
            Ok(response) => Ok(self.accept(response.user, response.access_token)),
            Err(e) => {
                tracing::warn!(err = %e, "login failed");
                self.state.lock().error = Some(SessionError::InvalidCredentials);
                Err(e)
            }
        }
    }

    /// Registers a new account; same contract as [`login`](Self::login)
    /// against the distinct endpoint.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] when registration is rejected
    /// or the request fails.
    pub async fn register(
        &self,
        client: &ApiClient,
        username: &str,
        email: &str,
        password: &str,
        fullname: &str,
    ) -> Result<User, ApiError> {
        let credentials = RegisterRequest {
            username: username.to_string(),
            fullname: fullname.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        match client.register(&credentials).await {
            Ok(response) => Ok(self.accept(response.user, response.access_token)),
            Err(e) => {
                tracing::warn!(err = %e, "registration failed");
                self.state.lock().error = Some(SessionError::RegistrationFailed);
                Err(e)
            }
        }
    }

    /// Clears the user and token synchronously, without a backend call,
    /// and removes the persisted token.
    ///
    /// Callers owning a live-update listener must tear it down when this
    /// returns: the session is unauthenticated immediately.
    pub fn logout(&self) {
        {
            let mut state = self.state.lock();
            state.user = None;
            state.token = None;
        }
        self.tokens.clear();
        tracing::info!("session cleared");
    }

    /// True iff a token is present; no network round-trip involved.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.lock().token.is_some()
    }

    /// The current bearer token, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    /// The current user profile. `None` while unauthenticated and also
    /// after a cold-start restore (the profile is not persisted).
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.lock().user.clone()
    }

    /// The last session-level error, if any.
    #[must_use]
    pub fn error(&self) -> Option<SessionError> {
        self.state.lock().error.clone()
    }

    /// Installs a fresh identity after a successful login or register.
    fn accept(&self, user: User, token: String) -> User {
        tracing::info!(username = %user.username, "session established");
        self.tokens.save(&token);
        let mut state = self.state.lock();
        state.user = Some(user.clone());
        state.token = Some(token);
        state.error = None;
        user
    }
}

//! Session tokens for the authenticated user
//!
//! The submission pipeline only ever asks a [`SessionProvider`] for the
//! current token. Signing in, refreshing, and signing out belong to the
//! concrete provider.

pub mod cognito;

use std::fmt;

use async_trait::async_trait;

pub use cognito::CognitoSessionProvider;

/// Opaque bearer credential. Never inspected, never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no active session, please sign in")]
    NoSession,

    #[error("sign-in failed: {0}")]
    SignIn(String),

    #[error("could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Token for the current identity, or `NoSession` when nobody is signed in
    /// or the session can no longer be renewed.
    async fn get_token(&self) -> Result<AuthToken, SessionError>;
}

/// A token handed in from outside, e.g. `DECKPROOF_ID_TOKEN`.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<AuthToken>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(AuthToken::new(token)),
        }
    }

    /// A provider with no session; every `get_token` fails.
    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl SessionProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<AuthToken, SessionError> {
        self.token.clone().ok_or(SessionError::NoSession)
    }
}

//! Injected credential sources for the API clients.
//!
//! The clients never hold a mutable global token; whoever constructs a
//! client passes a provider, and the current token is read per request
//! so rotation never requires rebuilding the client.

use std::sync::{PoisonError, RwLock};

/// Source of the bearer token attached to API requests.
pub trait CredentialsProvider: Send + Sync {
    /// The current bearer token, or `None` for unauthenticated calls.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, useful for tests and service accounts.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialsProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// No authentication at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CredentialsProvider for Anonymous {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// A token that the session layer can swap after a refresh.
#[derive(Debug, Default)]
pub struct RotatingToken {
    token: RwLock<Option<String>>,
}

impl RotatingToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Replace the stored token.
    pub fn set(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

impl CredentialsProvider for RotatingToken {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

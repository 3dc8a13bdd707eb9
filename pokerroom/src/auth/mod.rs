//! Identity resolution seam.
//!
//! The room does not authenticate anyone itself. A handshake hands a
//! bearer token to the configured [`IdentityResolver`], which either
//! yields a verified player identity or fails; token formats, session
//! stores, and refresh flows all live behind that trait.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::game::entities::PlayerId;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AuthError {
    #[error("unknown or expired token")]
    InvalidToken,
    #[error("identity backend unavailable: {0}")]
    Unavailable(String),
}

/// A resolved identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub id: PlayerId,
    pub display_name: String,
}

/// Token → identity, implemented by the deployment's auth service.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}

/// In-memory resolver for tests and single-node development: a fixed
/// token table, optionally extended at runtime.
#[derive(Default)]
pub struct StaticIdentities {
    tokens: RwLock<HashMap<String, Identity>>,
}

impl StaticIdentities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, token: &str, id: &str, display_name: &str) {
        self.tokens.write().await.insert(
            token.to_string(),
            Identity {
                id: id.into(),
                display_name: display_name.to_string(),
            },
        );
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentities {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

//! Token storage
//!
//! The gateway is single-tenant: one slot holds whichever token set the most
//! recent successful callback produced. Handlers receive the store as a
//! trait object so a keyed or persistent store can replace it without
//! touching them.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;
use tracing::debug;

use crate::token::TokenSet;

/// Read/replace contract for the current token set.
///
/// Uses `Pin<Box<dyn Future>>` return types so the store can live behind
/// `Arc<dyn TokenStore>`.
pub trait TokenStore: Send + Sync {
    /// Snapshot of the current token set, if any callback has succeeded.
    fn current(&self) -> Pin<Box<dyn Future<Output = Option<TokenSet>> + Send + '_>>;

    /// Overwrite the stored token set entirely. Last write wins.
    fn replace(&self, tokens: TokenSet) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Process-wide single-slot store.
///
/// The lock is only held to clone or swap the value, never across an
/// outbound request.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<TokenSet>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn current(&self) -> Pin<Box<dyn Future<Output = Option<TokenSet>> + Send + '_>> {
        Box::pin(async move { self.slot.read().await.clone() })
    }

    fn replace(&self, tokens: TokenSet) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut slot = self.slot.write().await;
            let previous = slot.replace(tokens);
            debug!(replaced = previous.is_some(), "token set stored");
        })
    }
}

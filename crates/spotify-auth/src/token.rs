//! Token set returned by the Spotify token endpoint

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access/refresh token pair plus its expiry hint.
///
/// `expires_in` is the delta in seconds reported by the token endpoint at
/// exchange time. It is stored as received and never counted down.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

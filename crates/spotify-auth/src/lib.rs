//! Spotify OAuth authorization code flow
//!
//! Provides CSRF state generation, authorization URL construction, the
//! code-for-token exchange and the in-memory token store used by the gateway.
//! This crate has no dependency on the gateway binary and can be tested on
//! its own.
//!
//! Flow:
//! 1. Gateway calls `state::generate_state()` and remembers it per session
//! 2. Browser is redirected to `OAuthClient::authorization_url()`
//! 3. Spotify redirects back with `code` and `state`
//! 4. Gateway calls `OAuthClient::exchange_code()` with the code
//! 5. Resulting `TokenSet` replaces the contents of the `TokenStore`

pub mod client;
pub mod constants;
pub mod error;
pub mod state;
pub mod store;
pub mod token;

pub use client::{OAuthClient, OAuthSettings};
pub use constants::*;
pub use error::{Error, Result};
pub use state::generate_state;
pub use store::{MemoryTokenStore, TokenStore};
pub use token::TokenSet;

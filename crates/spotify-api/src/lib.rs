//! Spotify Web API client
//!
//! Thin bearer-authenticated wrapper over the handful of Web API endpoints
//! the gateway exposes. Response bodies are returned as raw JSON; callers
//! decide how to shape them.

mod client;
mod error;

pub use client::{API_BASE_URL, Operation, SpotifyClient};
pub use error::{Error, Result};

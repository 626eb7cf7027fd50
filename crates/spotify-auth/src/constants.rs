//! Spotify Accounts service defaults
//!
//! Endpoint URLs are public. Client credentials are never compiled in; they
//! come from gateway configuration.

/// Authorization endpoint the browser is redirected to
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for the authorization code exchange
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Scopes needed for profile, playback control, top items and follows.
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "user-top-read",
    "user-follow-read",
];

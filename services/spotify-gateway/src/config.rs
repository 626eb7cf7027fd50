//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from SPOTIFY_CLIENT_SECRET or
//! client_secret_file, never stored in the TOML directly.

use common::Secret;
use serde::Deserialize;
use spotify_auth::{AUTHORIZE_ENDPOINT, DEFAULT_SCOPES, OAuthSettings, TOKEN_ENDPOINT};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub spotify: SpotifyConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// How long a `/login` state stays valid for its `/callback`
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Whether `/callback` and `/tokens` include raw token values
    #[serde(default = "default_expose_tokens")]
    pub expose_tokens: bool,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

/// Spotify application registration and endpoints
#[derive(Debug, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to SPOTIFY_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_max_connections() -> usize {
    1000
}

fn default_session_ttl() -> u64 {
    600
}

fn default_expose_tokens() -> bool {
    true
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_authorize_url() -> String {
    AUTHORIZE_ENDPOINT.to_string()
}

fn default_token_url() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_api_base_url() -> String {
    spotify_api::API_BASE_URL.to_string()
}

impl Config {
    /// Load configuration from a TOML file, overlay environment variables,
    /// and validate that the gateway can serve traffic with it.
    ///
    /// Client secret resolution order:
    /// 1. SPOTIFY_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(id) = std::env::var("SPOTIFY_CLIENT_ID") {
            config.spotify.client_id = id;
        }

        if let Ok(secret) = std::env::var("SPOTIFY_CLIENT_SECRET") {
            config.spotify.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.spotify.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            config.spotify.client_secret = Some(Secret::new(secret.trim().to_owned()));
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.spotify.client_id.trim().is_empty() {
            return Err(common::Error::MissingSetting("spotify.client_id"));
        }
        match &self.spotify.client_secret {
            Some(secret) if !secret.is_blank() => {}
            _ => return Err(common::Error::MissingSetting("spotify.client_secret")),
        }

        for (name, value) in [
            ("redirect_uri", &self.spotify.redirect_uri),
            ("authorize_url", &self.spotify.authorize_url),
            ("token_url", &self.spotify.token_url),
            ("api_base_url", &self.spotify.api_base_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {value}"
                )));
            }
        }

        if self.spotify.scopes.is_empty() {
            return Err(common::Error::Config(
                "scopes must list at least one scope".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.server.session_ttl_secs == 0 {
            return Err(common::Error::Config(
                "session_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.server.upstream_timeout_secs == 0 {
            return Err(common::Error::Config(
                "upstream_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Settings for the OAuth client. Fails only if no secret was resolved.
    pub fn oauth_settings(&self) -> common::Result<OAuthSettings> {
        let client_secret = self
            .spotify
            .client_secret
            .clone()
            .ok_or(common::Error::MissingSetting("spotify.client_secret"))?;

        Ok(OAuthSettings {
            client_id: self.spotify.client_id.clone(),
            client_secret,
            redirect_uri: self.spotify.redirect_uri.clone(),
            scopes: self.spotify.scopes.clone(),
            authorize_url: self.spotify.authorize_url.clone(),
            token_url: self.spotify.token_url.clone(),
        })
    }

    /// Session cookies are marked Secure when the callback is served over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.spotify.redirect_uri.starts_with("https://")
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.server.upstream_timeout_secs)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("spotify-gateway.toml")
    }
}

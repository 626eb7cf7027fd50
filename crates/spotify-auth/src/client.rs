//! Authorization URL construction and code exchange
//!
//! Both interactions use the confidential-client variant of the flow: the
//! client secret is sent in the token request body alongside the code.

use common::Secret;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Result};
use crate::token::TokenSet;

/// Inputs needed to talk to the Spotify Accounts service.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
}

/// OAuth client bound to one registered Spotify application.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: Secret<String>,
    redirect_uri: String,
    scope: String,
    authorize_url: Url,
    token_url: Url,
}

impl OAuthClient {
    /// Build a client, rejecting endpoint URLs that do not parse.
    pub fn new(http: reqwest::Client, settings: OAuthSettings) -> Result<Self> {
        let authorize_url = parse_url(&settings.authorize_url)?;
        let token_url = parse_url(&settings.token_url)?;

        Ok(Self {
            http,
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            redirect_uri: settings.redirect_uri,
            scope: settings.scopes.join(" "),
            authorize_url,
            token_url,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Full authorization URL for the browser redirect.
    ///
    /// `show_dialog=true` forces the consent screen even when the user has
    /// already approved the application.
    pub fn authorization_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &self.scope)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("show_dialog", "true");
        url.into()
    }

    /// Exchange an authorization code for a token set.
    ///
    /// A non-success status is returned as `Error::TokenEndpoint` with the
    /// upstream status and body text. A body missing any of the three token
    /// fields is `Error::InvalidResponse`.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose().as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let tokens = response
            .json::<TokenSet>()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        debug!(expires_in = tokens.expires_in, "authorization code exchanged");
        Ok(tokens)
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

//! Bearer-authenticated calls against the Spotify Web API

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Production Web API base URL
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Web API operations the gateway performs, used as log and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TopTracks,
    CurrentlyPlaying,
    FollowedArtists,
    StartPlayback,
    PausePlayback,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::TopTracks => "top_tracks",
            Operation::CurrentlyPlaying => "currently_playing",
            Operation::FollowedArtists => "followed_artists",
            Operation::StartPlayback => "start_playback",
            Operation::PausePlayback => "pause_playback",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Operation::TopTracks => "me/top/tracks?limit=10",
            Operation::CurrentlyPlaying => "me/player/currently-playing",
            Operation::FollowedArtists => "me/following?type=artist&limit=50",
            Operation::StartPlayback => "me/player/play",
            Operation::PausePlayback => "me/player/pause",
        }
    }
}

/// Web API client. Cheap to clone; shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, operation: Operation) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            operation.path()
        )
    }

    /// The user's ten top tracks.
    pub async fn top_tracks(&self, access_token: &str) -> Result<Value> {
        self.get_json(Operation::TopTracks, access_token)
            .await?
            .ok_or_else(|| Error::Decode("top tracks response had no content".into()))
    }

    /// The track currently playing, or `None` when nothing is (HTTP 204).
    pub async fn currently_playing(&self, access_token: &str) -> Result<Option<Value>> {
        self.get_json(Operation::CurrentlyPlaying, access_token)
            .await
    }

    /// Up to fifty followed artists.
    pub async fn followed_artists(&self, access_token: &str) -> Result<Value> {
        self.get_json(Operation::FollowedArtists, access_token)
            .await?
            .ok_or_else(|| Error::Decode("followed artists response had no content".into()))
    }

    /// Start playback of a single track URI on the active device.
    #[instrument(skip(self, access_token))]
    pub async fn start_playback(&self, access_token: &str, uri: &str) -> Result<()> {
        let request = self
            .http
            .put(self.url(Operation::StartPlayback))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": [uri] }));
        self.send_command(Operation::StartPlayback, request).await
    }

    /// Pause playback on the active device.
    #[instrument(skip_all)]
    pub async fn pause_playback(&self, access_token: &str) -> Result<()> {
        // Empty body so a Content-Length: 0 header is sent
        let request = self
            .http
            .put(self.url(Operation::PausePlayback))
            .bearer_auth(access_token)
            .body("");
        self.send_command(Operation::PausePlayback, request).await
    }

    /// GET a JSON resource. 204 maps to `None`; other non-2xx is an error.
    #[instrument(skip_all, fields(operation = operation.as_str()))]
    async fn get_json(&self, operation: Operation, access_token: &str) -> Result<Option<Value>> {
        let response = self
            .http
            .get(self.url(operation))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} request failed: {e}", operation.as_str())))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("no content");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(upstream_error(operation, response).await);
        }

        response
            .json::<Value>()
            .await
            .map(Some)
            .map_err(|e| Error::Decode(format!("{}: {e}", operation.as_str())))
    }

    /// Send a player command. Spotify answers 204 (or 202 while the device
    /// wakes up); anything else is an error.
    async fn send_command(
        &self,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> Result<()> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} request failed: {e}", operation.as_str())))?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::ACCEPTED => {
                debug!(operation = operation.as_str(), "player command accepted");
                Ok(())
            }
            _ => Err(upstream_error(operation, response).await),
        }
    }
}

async fn upstream_error(operation: Operation, response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    warn!(operation = operation.as_str(), status, "Spotify API call failed");
    Error::Upstream { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, put};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<(String, Option<String>, String)>>>;

    /// Mock Web API. Records (path, authorization, body) for every request
    /// and answers each route with a fixed status and body.
    async fn start_api(
        playing: AxumStatus,
        play: (AxumStatus, &'static str),
    ) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));

        let record = |seen: Seen, path: &'static str| {
            move |headers: HeaderMap, body: String| {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                seen.lock().unwrap().push((path.to_string(), auth, body));
            }
        };

        let top = record(seen.clone(), "top");
        let current = record(seen.clone(), "current");
        let following = record(seen.clone(), "following");
        let play_rec = record(seen.clone(), "play");
        let pause_rec = record(seen.clone(), "pause");

        let app = axum::Router::new()
            .route(
                "/v1/me/top/tracks",
                get(move |h: HeaderMap, b: String| async move {
                    top(h, b);
                    axum::Json(serde_json::json!({"items": [{"name": "Song"}]}))
                }),
            )
            .route(
                "/v1/me/player/currently-playing",
                get(move |h: HeaderMap, b: String| async move {
                    current(h, b);
                    (playing, axum::Json(serde_json::json!({"is_playing": true})))
                }),
            )
            .route(
                "/v1/me/following",
                get(move |h: HeaderMap, b: String| async move {
                    following(h, b);
                    axum::Json(serde_json::json!({"artists": {"items": []}}))
                }),
            )
            .route(
                "/v1/me/player/play",
                put(move |h: HeaderMap, b: String| async move {
                    play_rec(h, b);
                    play
                }),
            )
            .route(
                "/v1/me/player/pause",
                put(move |h: HeaderMap, b: String| async move {
                    pause_rec(h, b);
                    AxumStatus::NO_CONTENT
                }),
            );

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v1"), seen)
    }

    #[tokio::test]
    async fn get_calls_send_bearer_token() {
        let (base, seen) = start_api(AxumStatus::OK, (AxumStatus::NO_CONTENT, "")).await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);

        let top = client.top_tracks("at_123").await.unwrap();
        assert_eq!(top["items"][0]["name"], "Song");
        let followed = client.followed_artists("at_123").await.unwrap();
        assert!(followed["artists"]["items"].is_array());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (_, auth, _) in seen.iter() {
            assert_eq!(auth.as_deref(), Some("Bearer at_123"));
        }
    }

    #[tokio::test]
    async fn currently_playing_no_content_is_none() {
        let (base, _seen) = start_api(AxumStatus::NO_CONTENT, (AxumStatus::NO_CONTENT, "")).await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);

        let current = client.currently_playing("at").await.unwrap();
        assert!(current.is_none(), "204 must map to None, got {current:?}");
    }

    #[tokio::test]
    async fn currently_playing_error_keeps_status() {
        let (base, _seen) =
            start_api(AxumStatus::UNAUTHORIZED, (AxumStatus::NO_CONTENT, "")).await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);

        let err = client.currently_playing("expired").await.unwrap_err();
        assert!(
            matches!(err, Error::Upstream { status: 401, .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn start_playback_sends_uri_list() {
        let (base, seen) = start_api(AxumStatus::OK, (AxumStatus::NO_CONTENT, "")).await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);

        client
            .start_playback("at", "spotify:track:abc")
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let (path, _, body) = &seen[0];
        assert_eq!(path, "play");
        let json: Value = serde_json::from_str(body).unwrap();
        assert_eq!(json, serde_json::json!({"uris": ["spotify:track:abc"]}));
    }

    #[tokio::test]
    async fn start_playback_accepts_202() {
        let (base, _seen) = start_api(AxumStatus::OK, (AxumStatus::ACCEPTED, "")).await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);
        assert!(client.start_playback("at", "spotify:track:x").await.is_ok());
    }

    #[tokio::test]
    async fn start_playback_surfaces_status_and_body() {
        let (base, _seen) = start_api(
            AxumStatus::OK,
            (
                AxumStatus::NOT_FOUND,
                r#"{"error":{"status":404,"message":"Player command failed: No active device found"}}"#,
            ),
        )
        .await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);

        match client.start_playback("at", "spotify:track:x").await {
            Err(Error::Upstream { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("No active device"), "got: {body}");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pause_playback_sends_empty_body() {
        let (base, seen) = start_api(AxumStatus::OK, (AxumStatus::NO_CONTENT, "")).await;
        let client = SpotifyClient::new(reqwest::Client::new(), base);

        client.pause_playback("at").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "pause");
        assert_eq!(seen[0].2, "");
    }

    #[tokio::test]
    async fn unreachable_api_is_http_error() {
        let client = SpotifyClient::new(reqwest::Client::new(), "http://127.0.0.1:1/v1");
        let err = client.top_tracks("at").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }

    #[test]
    fn urls_join_without_double_slash() {
        let client = SpotifyClient::new(reqwest::Client::new(), "https://api.spotify.com/v1/");
        assert_eq!(
            client.url(Operation::FollowedArtists),
            "https://api.spotify.com/v1/me/following?type=artist&limit=50"
        );
    }
}

//! Authenticated pass-through calls to the Spotify Web API
//!
//! Every handler reads the token store first and answers 401 without any
//! outbound call when no token set is stored.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use spotify_api::Operation;
use tracing::{info, instrument};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics::observe_upstream;

/// Current access token, cloned so no lock is held during the upstream call.
async fn access_token(app: &AppState) -> Result<String, ApiError> {
    app.tokens
        .current()
        .await
        .map(|tokens| tokens.access_token)
        .ok_or(ApiError::NotAuthenticated)
}

/// GET /spotify: top tracks, currently playing and followed artists.
///
/// The three reads run concurrently; the first failure aborts the rest.
#[instrument(skip_all)]
pub async fn overview(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    let token = access_token(&app).await?;
    let api = &app.spotify;

    let (top_tracks, currently_playing, followed_artists) = tokio::try_join!(
        observe_upstream(
            Operation::TopTracks.as_str(),
            api.top_tracks(&token)
        ),
        observe_upstream(
            Operation::CurrentlyPlaying.as_str(),
            api.currently_playing(&token)
        ),
        observe_upstream(
            Operation::FollowedArtists.as_str(),
            api.followed_artists(&token)
        ),
    )
    .map_err(|e| ApiError::spotify("Spotify API request failed", e))?;

    Ok(Json(json!({
        "top_tracks": top_tracks,
        "currently_playing": currently_playing,
        "followed_artists": followed_artists,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PlayParams {
    uri: Option<String>,
}

/// PUT /spotify/play?uri=spotify:track:...
#[instrument(skip_all)]
pub async fn play(
    State(app): State<AppState>,
    Query(params): Query<PlayParams>,
) -> Result<Json<Value>, ApiError> {
    let token = access_token(&app).await?;
    let uri = params
        .uri
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::MissingParameter("uri"))?;

    observe_upstream(
        Operation::StartPlayback.as_str(),
        app.spotify.start_playback(&token, &uri),
    )
    .await
    .map_err(|e| ApiError::spotify("Failed to start playback", e))?;

    info!(uri = %uri, "playback started");
    Ok(Json(json!({ "message": format!("Started playing track {uri}") })))
}

/// PUT /spotify/pause
#[instrument(skip_all)]
pub async fn pause(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    let token = access_token(&app).await?;

    observe_upstream(
        Operation::PausePlayback.as_str(),
        app.spotify.pause_playback(&token),
    )
    .await
    .map_err(|e| ApiError::spotify("Failed to pause playback", e))?;

    info!("playback paused");
    Ok(Json(json!({ "message": "Playback paused" })))
}

//! Login redirect, OAuth callback and token inspection

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use spotify_auth::TokenSet;
use tracing::{info, instrument, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics;
use crate::session;

/// GET /login: bind a fresh state to a new session and redirect to Spotify.
#[instrument(skip_all)]
pub async fn login(State(app): State<AppState>, jar: CookieJar) -> Response {
    let state = spotify_auth::generate_state();
    let authorization_url = app.oauth.authorization_url(&state);
    let session_id = app.sessions.begin_login(state).await;

    info!("redirecting to Spotify authorization");

    let jar = jar.add(session::session_cookie(session_id, app.secure_cookies));
    (
        StatusCode::FOUND,
        jar,
        [(header::LOCATION, authorization_url)],
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /callback: validate state, exchange the code, store the tokens.
#[instrument(skip_all)]
pub async fn callback(
    State(app): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Json<Value>, ApiError> {
    // Spotify reports a denied consent as ?error=access_denied
    if let Some(error) = params.error {
        warn!(error = %error, "authorization denied");
        return Ok(Json(json!({ "error": error })));
    }

    let expected = match session::session_id(&jar) {
        Some(id) => app.sessions.take_state(&id).await,
        None => None,
    };
    match (params.state.as_deref(), expected.as_deref()) {
        (Some(received), Some(expected)) if received == expected => {}
        _ => {
            warn!("OAuth state mismatch or missing");
            return Err(ApiError::StateMismatch);
        }
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingParameter("code"))?;

    let tokens = metrics::observe_upstream("token_exchange", app.oauth.exchange_code(&code))
        .await
        .inspect_err(|e| warn!(error = %e, "token exchange failed"))?;

    app.tokens.replace(tokens.clone()).await;
    info!(expires_in = tokens.expires_in, "authentication successful, tokens stored");

    let mut body = json!({ "message": "Authentication successful! Tokens stored." });
    if let Some(object) = body.as_object_mut() {
        object.extend(token_fields(&tokens, app.expose_tokens));
    }
    Ok(Json(body))
}

/// GET /tokens: the stored token set, or a hint to log in first.
pub async fn tokens(State(app): State<AppState>) -> Json<Value> {
    match app.tokens.current().await {
        Some(tokens) => Json(Value::Object(
            token_fields(&tokens, app.expose_tokens).collect(),
        )),
        None => Json(json!({ "message": "No tokens stored yet. Login first." })),
    }
}

/// The three token fields, with secrets masked unless exposure is enabled.
fn token_fields(tokens: &TokenSet, expose: bool) -> impl Iterator<Item = (String, Value)> {
    let (access, refresh) = if expose {
        (
            Value::from(tokens.access_token.clone()),
            Value::from(tokens.refresh_token.clone()),
        )
    } else {
        (Value::from("[REDACTED]"), Value::from("[REDACTED]"))
    };
    [
        ("access_token".to_string(), access),
        ("refresh_token".to_string(), refresh),
        ("expires_in".to_string(), Value::from(tokens.expires_in)),
    ]
    .into_iter()
}

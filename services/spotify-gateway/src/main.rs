//! Spotify OAuth Gateway
//!
//! Single-binary service that:
//! 1. Sends the browser through Spotify's authorization code flow
//! 2. Validates the CSRF state and exchanges the code for tokens
//! 3. Keeps the resulting token set in memory
//! 4. Proxies a few Web API reads and player commands with that token

mod auth;
mod config;
mod error;
mod metrics;
mod session;
mod spotify;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;
use spotify_api::SpotifyClient;
use spotify_auth::{MemoryTokenStore, OAuthClient, TokenStore};

use crate::config::Config;
use crate::session::SessionStore;

/// How long in-flight requests may drain after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    oauth: Arc<OAuthClient>,
    spotify: SpotifyClient,
    tokens: Arc<dyn TokenStore>,
    sessions: SessionStore,
    secure_cookies: bool,
    expose_tokens: bool,
    requests_total: Arc<AtomicU64>,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/tokens", get(auth::tokens))
        .route("/spotify", get(spotify::overview))
        .route("/spotify/play", put(spotify::play))
        .route("/spotify/pause", put(spotify::pause))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting spotify-gateway");

    let prometheus =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        redirect_uri = %config.spotify.redirect_uri,
        scopes = config.spotify.scopes.len(),
        expose_tokens = config.server.expose_tokens,
        "configuration loaded"
    );
    if config.server.expose_tokens {
        warn!("expose_tokens is enabled: /callback and /tokens return raw tokens");
    }

    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let oauth = OAuthClient::new(http.clone(), config.oauth_settings()?)
        .context("invalid OAuth endpoint configuration")?;

    let state = AppState {
        oauth: Arc::new(oauth),
        spotify: SpotifyClient::new(http, config.spotify.api_base_url.clone()),
        tokens: Arc::new(MemoryTokenStore::new()),
        sessions: SessionStore::new(config.session_ttl()),
        secure_cookies: config.secure_cookies(),
        expose_tokens: config.server.expose_tokens,
        requests_total: Arc::new(AtomicU64::new(0)),
        started_at: Instant::now(),
        prometheus,
    };

    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: notify the server to drain, then race it against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Count and log every routed request.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = request.method().clone();
    let started = Instant::now();
    state.requests_total.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    metrics::record_request(&route, status);
    info!(
        %method,
        route = %route,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

/// Liveness plus authentication status. Never includes token values.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let authenticated = state.tokens.current().await.is_some();

    axum::Json(serde_json::json!({
        "status": "ok",
        "authenticated": authenticated,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "requests_served": state.requests_total.load(Ordering::Relaxed),
    }))
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

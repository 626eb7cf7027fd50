//! Browser sessions for the login round trip
//!
//! `/login` mints an opaque session id, sets it as a cookie and records the
//! CSRF state issued for it. `/callback` takes that state back out; each
//! state can be checked exactly once. Entries older than the configured TTL
//! are treated as absent and swept lazily on the next login.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tokio::sync::Mutex;
use tracing::debug;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "spotify_gateway_session";

struct PendingLogin {
    state: String,
    created_at: Instant,
}

/// Server-side map from session id to the state issued at `/login`.
#[derive(Clone)]
pub struct SessionStore {
    pending: Arc<Mutex<HashMap<String, PendingLogin>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a new session holding `state` and return its id.
    pub async fn begin_login(&self, state: String) -> String {
        let session_id = uuid::Uuid::new_v4().as_simple().to_string();

        let mut pending = self.pending.lock().await;
        let ttl = self.ttl;
        pending.retain(|_, login| login.created_at.elapsed() < ttl);
        pending.insert(
            session_id.clone(),
            PendingLogin {
                state,
                created_at: Instant::now(),
            },
        );
        debug!(pending = pending.len(), "login state recorded");

        session_id
    }

    /// Remove and return the state issued to `session_id`, unless expired.
    pub async fn take_state(&self, session_id: &str) -> Option<String> {
        let login = self.pending.lock().await.remove(session_id)?;
        if login.created_at.elapsed() >= self.ttl {
            debug!("login state expired");
            return None;
        }
        Some(login.state)
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Session cookie for a freshly minted id. No Max-Age: it lives for the
/// browser session.
pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Session id presented by the browser, if any.
pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_is_returned_once() {
        let store = SessionStore::new(Duration::from_secs(600));
        let id = store.begin_login("state-1".into()).await;

        assert_eq!(store.take_state(&id).await.as_deref(), Some("state-1"));
        assert_eq!(store.take_state(&id).await, None, "state must be single use");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new(Duration::from_secs(600));
        let a = store.begin_login("state-a".into()).await;
        let b = store.begin_login("state-b".into()).await;

        assert_ne!(a, b);
        assert_eq!(store.take_state(&b).await.as_deref(), Some("state-b"));
        assert_eq!(store.take_state(&a).await.as_deref(), Some("state-a"));
    }

    #[tokio::test]
    async fn unknown_session_has_no_state() {
        let store = SessionStore::new(Duration::from_secs(600));
        assert_eq!(store.take_state("not-a-session").await, None);
    }

    #[tokio::test]
    async fn expired_state_is_rejected_and_swept() {
        let store = SessionStore::new(Duration::from_millis(1));
        let stale = store.begin_login("old".into()).await;
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(store.take_state(&stale).await, None);

        let _ = store.begin_login("a".into()).await;
        std::thread::sleep(Duration::from_millis(5));
        let _ = store.begin_login("b".into()).await;
        assert_eq!(store.len().await, 1, "expired entries are swept on login");
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc".into(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}

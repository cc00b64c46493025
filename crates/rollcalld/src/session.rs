//! Administrator sessions: server-side tokens carried in a cookie.

use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Cookie holding the session token.
pub const SESSION_COOKIE: &str = "rollcall_session";

/// The single administrator account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

/// Live sessions keyed by random token.
pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session for `username` and return its token.
    pub fn create(&self, username: &str) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.lock();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at,
            },
        );
        tracing::info!(username, %expires_at, "session started");
        token
    }

    /// The username bound to a live token. Expired tokens are dropped.
    pub fn lookup(&self, token: &str) -> Option<String> {
        let mut sessions = self.lock();
        let session = sessions.get(token)?;
        if session.expires_at <= Utc::now() {
            tracing::debug!(username = %session.username, "session expired");
            sessions.remove(token);
            return None;
        }
        Some(session.username.clone())
    }

    /// End a session. Returns false if the token was not live.
    pub fn revoke(&self, token: &str) -> bool {
        match self.lock().remove(token) {
            Some(session) => {
                tracing::info!(username = %session.username, "session ended");
                true
            }
            None => false,
        }
    }
}

/// Session cookie for a freshly issued token.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

/// Cookie that clears the session on the client.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// An authenticated administrator. Protected handlers take this as an
/// argument; requests without a live session are redirected to `/login`.
#[derive(Debug, Clone)]
pub struct Admin {
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let username = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| state.sessions.lookup(cookie.value()));

        match username {
            Some(username) => Ok(Admin { username }),
            None => {
                tracing::debug!(path = %parts.uri.path(), "unauthenticated request redirected");
                Err(Redirect::to("/login"))
            }
        }
    }
}

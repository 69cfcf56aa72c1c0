use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{FleetError, Result};
use crate::views::Flash;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session";

/// Role a signed-in user acts under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    Admin,
    Viewer,
}

impl AccessRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessRole::Admin => "admin",
            AccessRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for AccessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login form data
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

/// An authenticated user session
///
/// Created at login, destroyed at logout or expiry, and handed explicitly to
/// every page render.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub role: AccessRole,
    pub expires_at: SystemTime,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == AccessRole::Admin
    }

    /// Fail with [`FleetError::AccessDenied`] unless the session is an admin one
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(FleetError::AccessDenied)
        }
    }
}

/// Live sessions keyed by session id
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session for `username` acting as `role`
    pub fn create(&self, username: &str, role: AccessRole) -> Session {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            role,
            expires_at: SystemTime::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.id.clone(), session.clone());

        session
    }

    /// Look up a session, dropping it if it has expired
    pub fn validate(&self, session_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(session_id) {
            Some(session) if session.expires_at > SystemTime::now() => Some(session.clone()),
            Some(_) => {
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }

    /// End a session; returns whether it existed
    pub fn destroy(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Account {
    username: String,
    role: AccessRole,
    password_hash: String,
}

/// Checks logins against the configured accounts
///
/// Passwords are hashed with Argon2 when the authenticator is built, so the
/// plaintext is not kept around after start-up.
pub struct Authenticator {
    accounts: Vec<Account>,
}

impl Authenticator {
    pub fn new(accounts: &[(&str, &str, AccessRole)]) -> Result<Self> {
        let accounts = accounts
            .iter()
            .map(|(username, password, role)| {
                Ok(Account {
                    username: username.to_string(),
                    role: *role,
                    password_hash: hash_password(password)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Authenticator { accounts })
    }

    /// Role of the account matching the credentials
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AccessRole> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.username == username)
            .ok_or(FleetError::InvalidCredentials)?;

        if verify_password(password, &account.password_hash)? {
            Ok(account.role)
        } else {
            Err(FleetError::InvalidCredentials)
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| FleetError::CredentialSetup(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| FleetError::CredentialSetup(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

// Web handlers below

/// Serve the login page
pub async fn serve_login_page(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<Flash>,
) -> Response {
    state.views.login(&flash, "").into_response()
}

/// Handle a login form submission
///
/// On success a session cookie is set and the user lands on the overview.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    match state
        .auth
        .authenticate(&credentials.username, &credentials.password)
    {
        Ok(role) => {
            let session = state.sessions.create(&credentials.username, role);
            log::info!("{} logged in as {}", session.username, session.role);
            let cookie = Cookie::build((SESSION_COOKIE, session.id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/overview")).into_response()
        }
        Err(e) => {
            log::warn!("login rejected for {}: {}", credentials.username, e);
            let flash = Flash::error("Invalid credentials");
            let page = state.views.login(&flash, &credentials.username);
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
    }
}

/// Handle logout: end the session and clear the cookie
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.destroy(cookie.value()) {
            log::info!("session ended");
        }
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

/// Authentication middleware
///
/// Requests with a valid session continue with the [`Session`] attached as a
/// request extension. Others are redirected to the login page, or get a 401
/// for API endpoints.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        if let Some(session) = state.sessions.validate(session_cookie.value()) {
            request.extensions_mut().insert(session);
            return next.run(request).await;
        }
    }

    if request.uri().path().starts_with("/api/") {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    Redirect::to("/login").into_response()
}

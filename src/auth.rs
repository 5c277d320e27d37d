use std::collections::HashMap;
use std::ops::Add;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{HeaderMap, HeaderValue, InvalidHeaderValue, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand::{thread_rng, Rng};
use rand_core::OsRng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::err::Error;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "student_panel_sid";

type HmacSha256 = Hmac<Sha256>;

/// Decides whether a username/password pair may operate the panel.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// The single operator account, checked against a PBKDF2 PHC string.
pub struct Pbkdf2Verifier {
    username: String,
    password_hash: String,
}

impl Pbkdf2Verifier {
    pub fn new<U: Into<String>, H: Into<String>>(username: U, password_hash: H) -> Result<Self, Error> {
        let password_hash = password_hash.into();
        PasswordHash::new(&password_hash)
            .map_err(|e| Error::internal(format!("unusable password hash: {}", e)))?;
        Ok(Self {
            username: username.into(),
            password_hash,
        })
    }
}

impl CredentialVerifier for Pbkdf2Verifier {
    fn verify(&self, username: &str, password: &str) -> bool {
        if password.is_empty() || username != self.username {
            return false;
        }
        match PasswordHash::new(&self.password_hash) {
            Ok(hash) => Pbkdf2
                .verify_password(password.as_bytes(), &hash)
                .is_ok(),
            Err(err) => {
                log::error!("Stored password hash cannot be parsed: {}", err);
                false
            }
        }
    }
}

/// PHC string suitable for `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::internal(format!("could not hash password: {}", e)))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
            FlashKind::Info => "info",
        }
    }
}

/// One-shot notice shown on the next rendered page.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info<S: Into<String>>(message: S) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub authenticated: bool,
    pub username: Option<String>,
    pub flashes: Vec<Flash>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            username: None,
            flashes: Vec::new(),
            expires_at: Utc::now(),
        }
    }

    pub fn signed_in<S: Into<String>>(username: S) -> Self {
        Self {
            authenticated: true,
            username: Some(username.into()),
            ..Self::anonymous()
        }
    }
}

#[derive(Debug, Clone)]
pub enum Lookup {
    Active(SessionRecord),
    Expired,
    Unknown,
}

/// Server-side session records keyed by session id. Expiry slides: every
/// successful lookup pushes `expires_at` one TTL into the future.
pub struct SessionStore {
    ttl: Duration,
    records: RwLock<HashMap<String, SessionRecord>>,
}

fn new_ssid() -> String {
    let ssid_bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(&ssid_bytes);
    hex::encode(hasher.finalize())
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn issue(&self, mut record: SessionRecord) -> String {
        record.expires_at = Utc::now().add(self.ttl);
        let mut records = self.records.write().await;
        let mut ssid = new_ssid();
        while records.contains_key(&ssid) {
            ssid = new_ssid();
        }
        records.insert(ssid.clone(), record);
        ssid
    }

    pub async fn lookup(&self, ssid: &str) -> Lookup {
        self.lookup_at(ssid, Utc::now()).await
    }

    pub(crate) async fn lookup_at(&self, ssid: &str, now: DateTime<Utc>) -> Lookup {
        let mut records = self.records.write().await;
        match records.get_mut(ssid) {
            None => return Lookup::Unknown,
            Some(record) if now.gt(&record.expires_at) => {}
            Some(record) => {
                record.expires_at = now.add(self.ttl);
                return Lookup::Active(record.clone());
            }
        }
        records.remove(ssid);
        Lookup::Expired
    }

    pub async fn modify<F, R>(&self, ssid: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SessionRecord) -> R,
    {
        self.records.write().await.get_mut(ssid).map(f)
    }

    pub async fn invalidate(&self, ssid: &str) -> bool {
        self.records.write().await.remove(ssid).is_some()
    }

    pub async fn prune_expired(&self) -> usize {
        self.prune_at(Utc::now()).await
    }

    pub(crate) async fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| now.le(&record.expires_at));
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

/// Signs session ids so a forged cookie is rejected before any lookup.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Result<Self, Error> {
        HmacSha256::new_from_slice(secret)
            .map(|mac| Self { mac })
            .map_err(|_| Error::internal("session secret cannot key HMAC-SHA256"))
    }

    pub fn sign(&self, ssid: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(ssid.as_bytes());
        format!("{}.{}", ssid, hex::encode(mac.finalize().into_bytes()))
    }

    pub fn unsign(&self, value: &str) -> Option<String> {
        let (ssid, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(ssid.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(ssid.to_string())
    }
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// What a handler sees of the current session. `id` is `None` until the
/// visitor has something worth storing server-side.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Option<String>,
    pub authenticated: bool,
    pub username: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            authenticated: false,
            username: None,
        }
    }

    fn from_record(id: String, record: &SessionRecord) -> Self {
        Self {
            id: Some(id),
            authenticated: record.authenticated,
            username: record.username.clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

pub struct Gate {
    verifier: Arc<dyn CredentialVerifier>,
    sessions: SessionStore,
    signer: CookieSigner,
    secure_cookie: bool,
}

impl Gate {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        sessions: SessionStore,
        signer: CookieSigner,
        secure_cookie: bool,
    ) -> Self {
        Self {
            verifier,
            sessions,
            signer,
            secure_cookie,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Picks up the session named by a raw cookie value. Anything else is an
    /// anonymous session that has not been stored.
    pub async fn resume(&self, cookie: Option<&str>) -> Session {
        match cookie.map(|raw| self.signer.unsign(raw)) {
            Some(Some(ssid)) => match self.sessions.lookup(&ssid).await {
                Lookup::Active(record) => return Session::from_record(ssid, &record),
                Lookup::Expired => log::debug!("Session expired"),
                Lookup::Unknown => log::debug!("Unknown session presented"),
            },
            Some(None) => log::warn!("Rejected session cookie with a bad signature"),
            None => {}
        }
        Session::anonymous()
    }

    /// On success the caller's session is replaced by a new authenticated one.
    pub async fn authenticate(
        &self,
        current: &Session,
        username: &str,
        password: &str,
    ) -> Option<Session> {
        let verifier = Arc::clone(&self.verifier);
        let (user, pass) = (username.to_string(), password.to_string());
        let accepted = tokio::task::spawn_blocking(move || verifier.verify(&user, &pass))
            .await
            .unwrap_or_else(|err| {
                log::error!("Credential check aborted: {}", err);
                false
            });
        if !accepted {
            log::warn!("Failed login attempt for username: {}", username);
            return None;
        }

        if let Some(id) = &current.id {
            self.sessions.invalidate(id).await;
        }
        let record = SessionRecord::signed_in(username);
        let id = self.sessions.issue(record.clone()).await;
        log::info!("User {} logged in successfully", username);
        Some(Session::from_record(id, &record))
    }

    pub async fn logout(&self, current: &Session) -> Session {
        if let Some(id) = &current.id {
            self.sessions.invalidate(id).await;
        }
        if let Some(username) = &current.username {
            log::info!("User {} logged out", username);
        }
        Session::anonymous()
    }

    /// Queues a notice for the next page. An unsaved session gets a record
    /// here; send it back with [`Gate::redirect`] so the browser keeps it.
    pub async fn flash(&self, session: &mut Session, flash: Flash) {
        if let Some(id) = &session.id {
            self.sessions
                .modify(id, |record| record.flashes.push(flash))
                .await;
            return;
        }
        let mut record = SessionRecord::anonymous();
        record.flashes.push(flash);
        session.id = Some(self.sessions.issue(record).await);
    }

    /// Drains queued notices. An anonymous record exists only to carry them,
    /// so it goes away once they are read.
    pub async fn take_flashes(&self, session: &Session) -> Vec<Flash> {
        let Some(id) = &session.id else {
            return Vec::new();
        };
        let taken = self
            .sessions
            .modify(id, |record| {
                (std::mem::take(&mut record.flashes), record.authenticated)
            })
            .await;
        match taken {
            Some((flashes, false)) => {
                self.sessions.invalidate(id).await;
                flashes
            }
            Some((flashes, true)) => flashes,
            None => Vec::new(),
        }
    }

    pub fn set_cookie(&self, ssid: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let secure = if self.secure_cookie { "; Secure" } else { "" };
        HeaderValue::from_str(&format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/{}",
            SESSION_COOKIE,
            self.signer.sign(ssid),
            secure
        ))
    }

    /// Redirects the browser, pointing its cookie at `session` when that
    /// session is stored.
    pub fn redirect(&self, session: &Session, to: &str) -> Response {
        let Some(id) = &session.id else {
            return Redirect::to(to).into_response();
        };
        match self.set_cookie(id) {
            Ok(cookie) => ([(SET_COOKIE, cookie)], Redirect::to(to)).into_response(),
            Err(err) => Error::from(err).into_response(),
        }
    }
}

/// Attaches a [`Session`] to every request.
pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let cookie = cookie_value(req.headers(), SESSION_COOKIE);
    let session = state.gate.resume(cookie.as_deref()).await;
    req.extensions_mut().insert(session);
    next.run(req).await
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| Error::internal("session layer is not installed"))
    }
}

/// Session of an operator calling a JSON route; anyone else gets a 401.
pub struct ApiUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        if session.is_authenticated() {
            Ok(ApiUser(session))
        } else {
            Err(Error::Unauthorized)
        }
    }
}

/// Session of an operator opening a page; anyone else is sent to the login
/// page with a notice.
pub struct PageUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if session.is_authenticated() {
            return Ok(PageUser(session));
        }
        state
            .gate
            .flash(&mut session, Flash::error("Please login to access this page"))
            .await;
        Err(state.gate.redirect(&session, "/login"))
    }
}

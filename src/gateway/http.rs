//! Gateway implementation for a Supabase-style hosted backend.
//!
//! Auth goes through GoTrue (`/auth/v1/...`) using the PKCE
//! authorization-code flow: the system browser is opened on the authorize
//! URL and the redirect is caught on a localhost listener. Rows go through
//! PostgREST (`/rest/v1/bookmarks`). The change subscription is a polling
//! task that fingerprints the owner's rows and reports any difference.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::app::{Result, RibbonError};
use crate::config::Config;
use crate::domain::{Bookmark, NewBookmark, Session, User};
use crate::gateway::{AuthEvent, AuthListenerHandle, ChangeEvent, Gateway, SubscriptionHandle};

const BOOKMARKS_TABLE: &str = "bookmarks";

/// How long to wait for the browser redirect before giving up.
const REDIRECT_TIMEOUT: Duration = Duration::from_secs(180);

/// Token endpoint response (GoTrue).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: Uuid,
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(self.expires_in),
            user: User {
                id: self.user.id,
                email: self.user.email,
            },
        }
    }
}

struct Inner {
    client: Client,
    base: Url,
    anon_key: String,
    cache_path: Option<PathBuf>,
    session: Mutex<Option<Session>>,
    listeners: Mutex<Vec<(u64, mpsc::UnboundedSender<AuthEvent>)>>,
    next_handle_id: AtomicU64,
    refresh_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

pub struct HttpGateway {
    inner: Arc<Inner>,
    poll_interval: Duration,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self> {
        let base = parse_base_url(&config.backend.url)?;
        let cache_path = default_cache_path();

        Self::with_cache_path(config, base, cache_path)
    }

    fn with_cache_path(config: &Config, base: Url, cache_path: Option<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent("ribbon/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base,
                anon_key: config.backend.anon_key.clone(),
                cache_path,
                session: Mutex::new(None),
                listeners: Mutex::new(Vec::new()),
                next_handle_id: AtomicU64::new(1),
                refresh_task: Mutex::new(None),
            }),
            poll_interval: Duration::from_secs(config.sync.poll_interval_secs.max(1)),
        })
    }

    #[cfg(test)]
    pub fn for_tests(config: &Config, cache_path: PathBuf) -> Result<Self> {
        let base = parse_base_url(&config.backend.url)?;
        Self::with_cache_path(config, base, Some(cache_path))
    }

    /// Install a new session: remember it, persist it, (re)start the
    /// refresh timer, and optionally notify listeners.
    fn install_session(&self, session: Session, event: Option<AuthEvent>) {
        self.inner.set_session(Some(session.clone()));
        self.spawn_refresh_task(&session);
        if let Some(event) = event {
            self.inner.notify_auth(event);
        }
    }

    /// Background task that renews the access token before it expires and
    /// emits `TokenRefreshed` on each renewal.
    fn spawn_refresh_task(&self, session: &Session) {
        let inner = self.inner.clone();
        let mut delay = session.refresh_after_secs();

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(delay)).await;

                let refresh_token = match inner.current_session() {
                    Some(s) => s.refresh_token,
                    None => break,
                };

                match inner.refresh_session(&refresh_token).await {
                    Ok(session) => {
                        delay = session.refresh_after_secs();
                        inner.set_session(Some(session.clone()));
                        inner.notify_auth(AuthEvent::TokenRefreshed(session));
                        debug!("Access token refreshed");
                    }
                    Err(e) => {
                        warn!("Token refresh failed: {}", e);
                        break;
                    }
                }
            }
        });

        let mut slot = lock(&self.inner.refresh_task);
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
    }

    fn stop_refresh_task(&self) {
        if let Some(task) = lock(&self.inner.refresh_task).take() {
            task.abort();
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get_session(&self) -> Result<Option<Session>> {
        if let Some(session) = self.inner.current_session() {
            if !session.is_expired() {
                return Ok(Some(session));
            }
        }

        let Some(cached) = self.inner.load_cached_session() else {
            return Ok(None);
        };

        if !cached.is_expired() {
            self.install_session(cached.clone(), None);
            return Ok(Some(cached));
        }

        // Access token expired between runs; try the refresh token once.
        match self.inner.refresh_session(&cached.refresh_token).await {
            Ok(session) => {
                self.install_session(session.clone(), None);
                Ok(Some(session))
            }
            Err(e) => {
                warn!("Cached session could not be refreshed: {}", e);
                self.inner.set_session(None);
                Ok(None)
            }
        }
    }

    async fn sign_in_with_oauth(&self, provider: &str, redirect_url: &str) -> Result<()> {
        let verifier = pkce_verifier();
        let challenge = pkce_challenge(&verifier);
        let authorize = self.inner.authorize_url(provider, redirect_url, &challenge)?;

        info!("Opening browser for {} sign-in", provider);
        open::that(authorize.as_str())
            .map_err(|e| RibbonError::AuthInitiation(format!("could not open browser: {}", e)))?;

        let code = wait_for_redirect(redirect_url).await?;
        let session = self.inner.exchange_code(&code, &verifier).await?;

        info!(user = %session.user_id(), "Signed in");
        self.install_session(session.clone(), Some(AuthEvent::SignedIn(session)));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        let session = self.inner.current_session();

        let result = match &session {
            Some(s) => self.inner.logout(&s.access_token).await,
            None => Ok(()),
        };

        // Local state is cleared even when the backend call failed; the
        // session is gone from this client's point of view either way.
        self.stop_refresh_task();
        self.inner.set_session(None);
        self.inner.notify_auth(AuthEvent::SignedOut);

        result
    }

    async fn select_bookmarks(&self, owner: Uuid) -> Result<Vec<Bookmark>> {
        self.inner.select_bookmarks(owner).await
    }

    async fn insert_bookmark(&self, record: &NewBookmark) -> Result<()> {
        let session = self.inner.require_session()?;
        let url = self.inner.rest_url()?;

        self.inner
            .client
            .post(url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(&session.access_token)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RibbonError::RemoteWrite(e.to_string()))?;

        Ok(())
    }

    async fn delete_bookmark(&self, id: Uuid, owner: Uuid) -> Result<()> {
        let session = self.inner.require_session()?;
        let mut url = self.inner.rest_url()?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id))
            .append_pair("owner", &format!("eq.{}", owner));

        self.inner
            .client
            .delete(url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RibbonError::RemoteWrite(e.to_string()))?;

        Ok(())
    }

    fn on_auth_state_change(&self, events: mpsc::UnboundedSender<AuthEvent>) -> AuthListenerHandle {
        let id = self.inner.next_handle_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, events));
        AuthListenerHandle(id)
    }

    fn remove_auth_listener(&self, handle: AuthListenerHandle) {
        lock(&self.inner.listeners).retain(|(id, _)| *id != handle.0);
    }

    fn subscribe(
        &self,
        owner: Uuid,
        events: mpsc::UnboundedSender<ChangeEvent>,
    ) -> SubscriptionHandle {
        let id = self.inner.next_handle_id.fetch_add(1, Ordering::Relaxed);
        let inner = self.inner.clone();
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            let mut baseline: Option<Vec<Bookmark>> = None;

            loop {
                ticker.tick().await;

                let rows = match inner.select_bookmarks(owner).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        // Degraded feed: skip this tick, the next one polls again.
                        debug!("Change feed poll failed: {}", e);
                        continue;
                    }
                };

                // First poll only establishes the baseline.
                let change = baseline
                    .as_deref()
                    .and_then(|prev| classify_change(prev, &rows));
                baseline = Some(rows);

                if let Some(change) = change {
                    if events.send(change).is_err() {
                        break; // Receiver gone, feed no longer wanted.
                    }
                }
            }
        });

        SubscriptionHandle {
            owner,
            id,
            task: Some(task),
        }
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut handle = handle;
        handle.close();
    }
}

impl Inner {
    fn current_session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    fn require_session(&self) -> Result<Session> {
        self.current_session().ok_or(RibbonError::NotSignedIn)
    }

    fn set_session(&self, session: Option<Session>) {
        *lock(&self.session) = session.clone();
        self.persist_session(session.as_ref());
    }

    fn notify_auth(&self, event: AuthEvent) {
        let mut listeners = lock(&self.listeners);
        listeners.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn auth_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base.join(&format!("auth/v1/{}", endpoint))?)
    }

    fn rest_url(&self) -> Result<Url> {
        Ok(self.base.join(&format!("rest/v1/{}", BOOKMARKS_TABLE))?)
    }

    fn authorize_url(&self, provider: &str, redirect_url: &str, challenge: &str) -> Result<Url> {
        let mut url = self.auth_url("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_url)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        let response: TokenResponse = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "auth_code": code,
                "code_verifier": verifier,
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RibbonError::AuthInitiation(e.to_string()))?
            .json()
            .await
            .map_err(|e| RibbonError::AuthInitiation(e.to_string()))?;

        Ok(response.into_session())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response: TokenResponse = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RibbonError::AuthInitiation(e.to_string()))?
            .json()
            .await
            .map_err(|e| RibbonError::AuthInitiation(e.to_string()))?;

        Ok(response.into_session())
    }

    async fn logout(&self, access_token: &str) -> Result<()> {
        let url = self.auth_url("logout")?;

        self.client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RibbonError::AuthInitiation(e.to_string()))?;

        Ok(())
    }

    async fn select_bookmarks(&self, owner: Uuid) -> Result<Vec<Bookmark>> {
        let session = self.require_session()?;
        let mut url = self.rest_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("owner", &format!("eq.{}", owner))
            .append_pair("order", "created_at.desc");

        let rows: Vec<Bookmark> = self
            .client
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RibbonError::RemoteFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| RibbonError::RemoteFetch(e.to_string()))?;

        Ok(rows)
    }

    fn persist_session(&self, session: Option<&Session>) {
        let Some(path) = &self.cache_path else {
            return;
        };

        let result = match session {
            Some(session) => {
                let write = || -> std::io::Result<()> {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    let json = serde_json::to_vec_pretty(session)
                        .map_err(|e| std::io::Error::other(e.to_string()))?;
                    fs::write(path, json)
                };
                write()
            }
            None if path.exists() => fs::remove_file(path),
            None => Ok(()),
        };

        if let Err(e) = result {
            warn!("Failed to update session cache at {:?}: {}", path, e);
        }
    }

    fn load_cached_session(&self) -> Option<Session> {
        let path = self.cache_path.as_ref()?;
        let bytes = fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring unreadable session cache: {}", e);
                None
            }
        }
    }
}

/// Classify the difference between two successive polls of an owner's rows.
///
/// Whole rows are compared, not just identifiers, so an edit to a mutable
/// field (title, url) on an otherwise unchanged collection still registers
/// as an update. Identical polls produce nothing.
fn classify_change(prev: &[Bookmark], next: &[Bookmark]) -> Option<ChangeEvent> {
    if next.len() > prev.len() {
        Some(ChangeEvent::Insert)
    } else if next.len() < prev.len() {
        Some(ChangeEvent::Delete)
    } else if prev != next {
        Some(ChangeEvent::Update)
    } else {
        None
    }
}

/// Mutex access that survives a poisoned lock; the guarded state stays
/// usable even if a task panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn parse_base_url(url: &str) -> Result<Url> {
    // A trailing slash keeps Url::join from eating the last path segment.
    let normalized = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    };
    Ok(Url::parse(&normalized)?)
}

fn default_cache_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("ribbon").join("session.json"))
}

/// Random high-entropy PKCE verifier from the unreserved character set.
fn pkce_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// S256 code challenge: base64url(sha256(verifier)), unpadded.
fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Listen on the configured redirect URL for the OAuth callback and return
/// the authorization code it carries.
async fn wait_for_redirect(redirect_url: &str) -> Result<String> {
    let url = Url::parse(redirect_url)?;
    let host = url.host_str().unwrap_or("127.0.0.1").to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| RibbonError::Config("redirect URL has no port".into()))?;

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| RibbonError::AuthInitiation(format!("redirect listener: {}", e)))?;

    let (mut stream, _) = timeout(REDIRECT_TIMEOUT, listener.accept())
        .await
        .map_err(|_| RibbonError::AuthInitiation("timed out waiting for sign-in".into()))?
        .map_err(|e| RibbonError::AuthInitiation(format!("redirect listener: {}", e)))?;

    let mut buf = vec![0u8; 8192];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| RibbonError::AuthInitiation(format!("redirect read: {}", e)))?;
    let request = String::from_utf8_lossy(&buf[..n]).into_owned();

    let result = parse_redirect_code(&request);

    let body = match &result {
        Ok(_) => "<html><body><p>Signed in. You can return to the terminal.</p></body></html>",
        Err(_) => "<html><body><p>Sign-in failed. You can close this tab.</p></body></html>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;

    result
}

/// Pull the `code` query parameter out of the callback's request line.
fn parse_redirect_code(request: &str) -> Result<String> {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| RibbonError::AuthInitiation("malformed redirect request".into()))?;

    let url = Url::parse(&format!("http://localhost{}", path))?;

    if let Some((_, message)) = url
        .query_pairs()
        .find(|(k, _)| k == "error_description" || k == "error")
    {
        return Err(RibbonError::AuthInitiation(message.into_owned()));
    }

    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| RibbonError::AuthInitiation("redirect carried no code".into()))
}

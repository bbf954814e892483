//! Session synchronization controller.
//!
//! Single source of truth for "who is the current user" and sole owner of
//! the change-subscription lifecycle. Identity moves between exactly two
//! states, anonymous and authenticated, and only ever changes through
//! [`SessionController::initialize`] or the auth-event dispatch below.
//! Everything else (the TUI, the CLI commands) reads identity and the
//! bookmark collection through the controller.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{Bookmark, Session};
use crate::gateway::{AuthEvent, AuthListenerHandle, ChangeEvent, Gateway, SubscriptionHandle};
use crate::store::BookmarkStore;

/// A unit of work for the controller: either an auth transition or a row
/// change on the open feed. Both sources funnel through [`SessionController::dispatch`],
/// keeping the whole transition table in one place.
#[derive(Debug)]
pub enum Signal {
    Auth(AuthEvent),
    Change(ChangeEvent),
}

pub struct SessionController {
    gateway: Arc<dyn Gateway>,
    store: BookmarkStore,
    identity: Option<Uuid>,
    subscription: Option<SubscriptionHandle>,
    auth_listener: Option<AuthListenerHandle>,
    auth_rx: mpsc::UnboundedReceiver<AuthEvent>,
    change_rx: Option<mpsc::UnboundedReceiver<ChangeEvent>>,
    oauth_provider: String,
    redirect_url: String,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn Gateway>, oauth_provider: &str, redirect_url: &str) -> Self {
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        let auth_listener = Some(gateway.on_auth_state_change(auth_tx));

        Self {
            gateway,
            store: BookmarkStore::new(),
            identity: None,
            subscription: None,
            auth_listener,
            auth_rx,
            change_rx: None,
            oauth_provider: oauth_provider.to_string(),
            redirect_url: redirect_url.to_string(),
        }
    }

    pub fn identity(&self) -> Option<Uuid> {
        self.identity
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.store.bookmarks()
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    /// Look up an existing session at startup. When one is present the
    /// identity is adopted, the collection fetched, and exactly one change
    /// subscription opened; otherwise the controller stays anonymous.
    pub async fn initialize(&mut self) {
        match self.gateway.get_session().await {
            Ok(Some(session)) => self.establish(session).await,
            Ok(None) => debug!("No existing session; starting anonymous"),
            Err(e) => error!("Session lookup failed: {}", e),
        }
    }

    /// Kick off the OAuth flow in the background. Identity is not touched
    /// here; it changes only when the resulting `SignedIn` event arrives.
    pub fn sign_in(&self) {
        let gateway = self.gateway.clone();
        let provider = self.oauth_provider.clone();
        let redirect = self.redirect_url.clone();

        tokio::spawn(async move {
            if let Err(e) = gateway.sign_in_with_oauth(&provider, &redirect).await {
                error!("Sign-in failed: {}", e);
            }
        });
    }

    /// Request backend sign-out and clear local state eagerly, without
    /// waiting for the `SignedOut` event; the event's handling is
    /// idempotent with this clear.
    pub async fn sign_out(&mut self) {
        if let Err(e) = self.gateway.sign_out().await {
            error!("Sign-out request failed: {}", e);
        }
        self.clear_session();
    }

    /// Dispatch one signal. This is the only place auth state transitions
    /// happen after startup.
    pub async fn dispatch(&mut self, signal: Signal) {
        match signal {
            Signal::Auth(AuthEvent::SignedIn(session)) => {
                info!(user = %session.user_id(), "Auth event: signed in");
                self.establish(session).await;
            }
            Signal::Auth(AuthEvent::TokenRefreshed(session)) => {
                debug!("Auth event: token refreshed");
                self.establish(session).await;
            }
            Signal::Auth(AuthEvent::SignedOut) => {
                info!("Auth event: signed out");
                self.clear_session();
            }
            Signal::Change(change) => {
                debug!(?change, "Row change on subscription");
                if let Some(owner) = self.identity {
                    self.store.refresh(self.gateway.as_ref(), owner).await;
                }
            }
        }
    }

    /// Drain one pending signal without blocking; the TUI calls this each
    /// tick so remote changes surface between key presses.
    pub fn try_signal(&mut self) -> Option<Signal> {
        if let Ok(event) = self.auth_rx.try_recv() {
            return Some(Signal::Auth(event));
        }
        if let Some(rx) = &mut self.change_rx {
            if let Ok(change) = rx.try_recv() {
                return Some(Signal::Change(change));
            }
        }
        None
    }

    /// Wait for the next signal. Returns `None` once the auth-event stream
    /// is gone, which only happens when the gateway itself was dropped.
    pub async fn next_signal(&mut self) -> Option<Signal> {
        enum Polled {
            Auth(Option<AuthEvent>),
            Change(Option<ChangeEvent>),
        }

        loop {
            let polled = match &mut self.change_rx {
                Some(rx) => tokio::select! {
                    event = self.auth_rx.recv() => Polled::Auth(event),
                    change = rx.recv() => Polled::Change(change),
                },
                None => Polled::Auth(self.auth_rx.recv().await),
            };

            match polled {
                Polled::Auth(Some(event)) => return Some(Signal::Auth(event)),
                Polled::Auth(None) => return None,
                Polled::Change(Some(change)) => return Some(Signal::Change(change)),
                // Feed task ended; drop the dead receiver and keep waiting.
                Polled::Change(None) => self.change_rx = None,
            }
        }
    }

    /// Wait for the next auth transition, dispatching it first. Used by the
    /// one-shot CLI commands (`login` waits for `SignedIn` this way).
    pub async fn next_auth_event(&mut self) -> Option<AuthEvent> {
        loop {
            match self.next_signal().await? {
                Signal::Auth(event) => {
                    let out = event.clone();
                    self.dispatch(Signal::Auth(event)).await;
                    return Some(out);
                }
                signal => self.dispatch(signal).await,
            }
        }
    }

    pub async fn add_bookmark(&mut self, title: &str, url: &str) {
        let owner = self.identity;
        self.store
            .add(self.gateway.as_ref(), owner, title, url)
            .await;
        if let Some(owner) = owner {
            // The change feed would get there too; the direct refresh just
            // shortens the wait. Refresh is idempotent, so the duplicate is
            // harmless and deliberately not suppressed.
            self.store.refresh(self.gateway.as_ref(), owner).await;
        }
    }

    pub async fn remove_bookmark(&mut self, id: Uuid) {
        if let Some(owner) = self.identity {
            self.store.remove(self.gateway.as_ref(), id, owner).await;
        }
    }

    pub async fn refresh(&mut self) {
        if let Some(owner) = self.identity {
            self.store.refresh(self.gateway.as_ref(), owner).await;
        }
    }

    /// Close the subscription and detach the auth listener. Runs from
    /// `Drop` as well, so no exit path leaks either resource.
    pub fn teardown(&mut self) {
        self.close_subscription();
        if let Some(handle) = self.auth_listener.take() {
            self.gateway.remove_auth_listener(handle);
        }
    }

    /// Adopt a session: set identity (idempotent when unchanged), fetch the
    /// collection, and make sure exactly one subscription is open for this
    /// identity.
    async fn establish(&mut self, session: Session) {
        let user = session.user_id();
        self.identity = Some(user);
        self.store.set_owner(Some(user));
        self.store.refresh(self.gateway.as_ref(), user).await;
        self.ensure_subscription(user);
    }

    fn clear_session(&mut self) {
        self.identity = None;
        self.store.clear();
        self.close_subscription();
    }

    /// Open a subscription for `owner` unless one is already open for that
    /// same identity. A feed for a previous identity is closed first; at
    /// most one handle exists at any instant.
    fn ensure_subscription(&mut self, owner: Uuid) {
        if let Some(current) = &self.subscription {
            if current.owner == owner {
                return;
            }
            self.close_subscription();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.subscription = Some(self.gateway.subscribe(owner, tx));
        self.change_rx = Some(rx);
    }

    fn close_subscription(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.gateway.unsubscribe(handle);
        }
        self.change_rx = None;
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

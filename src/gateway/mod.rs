//! Remote data gateway.
//!
//! [`Gateway`] is the seam between the synchronization logic and the hosted
//! backend: authenticated row access for one bookmark table, OAuth sign-in
//! and sign-out, an auth-event stream, and a per-user change subscription.
//! [`HttpGateway`](http::HttpGateway) talks to a Supabase-style backend
//! (GoTrue auth, PostgREST rows).

pub mod http;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::app::Result;
use crate::domain::{Bookmark, NewBookmark, Session};

pub use http::HttpGateway;

/// Authentication state transitions reported by the backend.
///
/// Identity only ever changes in response to one of these events (or the
/// initial session lookup); nothing else in the crate sets the current user.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// A row change notification. The payload is deliberately absent: handlers
/// always respond with a wholesale refresh, never an incremental patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

/// One open live feed, scoped to a single owner.
///
/// Closing aborts the feed task; closing twice is a no-op. The controller
/// holds at most one of these at a time.
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub owner: Uuid,
    pub(crate) id: u64,
    pub(crate) task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub(crate) fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Registration of an auth-event listener; used to detach on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthListenerHandle(pub(crate) u64);

/// Everything the synchronization controller needs from the backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Look up an existing valid session, refreshing it if necessary.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Start the OAuth flow for the given provider. On success the gateway
    /// emits [`AuthEvent::SignedIn`]; this call never sets identity itself.
    async fn sign_in_with_oauth(&self, provider: &str, redirect_url: &str) -> Result<()>;

    /// End the current session on the backend and emit [`AuthEvent::SignedOut`].
    async fn sign_out(&self) -> Result<()>;

    /// All bookmarks with `owner == owner`, created_at descending.
    async fn select_bookmarks(&self, owner: Uuid) -> Result<Vec<Bookmark>>;

    async fn insert_bookmark(&self, record: &NewBookmark) -> Result<()>;

    /// Delete filtered by both id and owner. A record not owned by the
    /// caller is never deleted, independent of backend enforcement.
    async fn delete_bookmark(&self, id: Uuid, owner: Uuid) -> Result<()>;

    /// Register a listener for auth state changes.
    fn on_auth_state_change(&self, events: mpsc::UnboundedSender<AuthEvent>) -> AuthListenerHandle;

    fn remove_auth_listener(&self, handle: AuthListenerHandle);

    /// Open a live feed for row changes where `owner == owner`. Each change
    /// is delivered on `events`; the feed stays open until [`Gateway::unsubscribe`].
    fn subscribe(
        &self,
        owner: Uuid,
        events: mpsc::UnboundedSender<ChangeEvent>,
    ) -> SubscriptionHandle;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}

//! In-memory gateway for exercising the session controller and bookmark
//! store without a backend. Rows live in a vector, every operation can be
//! made to fail, and call counts are recorded so tests can assert which
//! round trips actually happened.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::app::{Result, RibbonError};
use crate::domain::{Bookmark, NewBookmark, Session, User};
use crate::gateway::{AuthEvent, AuthListenerHandle, ChangeEvent, Gateway, SubscriptionHandle};

#[derive(Default)]
pub struct MockGateway {
    rows: Mutex<Vec<Bookmark>>,
    session: Mutex<Option<Session>>,

    pub fail_select: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_sign_out: AtomicBool,

    /// When set, select ignores the owner filter and returns every row,
    /// simulating a misbehaving backend for the isolation tests.
    pub unfiltered_select: AtomicBool,

    pub select_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,

    next_handle_id: AtomicU64,
    open_subscriptions: Mutex<Vec<(u64, Uuid)>>,
    listeners: Mutex<Vec<(u64, mpsc::UnboundedSender<AuthEvent>)>>,
    change_senders: Mutex<Vec<(u64, mpsc::UnboundedSender<ChangeEvent>)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_session(user: Uuid) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: User {
                id: user,
                email: Some("user@example.com".to_string()),
            },
        }
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.locked(&self.session) = session;
    }

    pub fn push_row(&self, owner: Uuid, title: &str, url: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.locked(&self.rows).push(Bookmark {
            id,
            title: title.to_string(),
            url: url.to_string(),
            owner,
            created_at: Utc::now(),
        });
        id
    }

    pub fn rows_for(&self, owner: Uuid) -> Vec<Bookmark> {
        self.locked(&self.rows)
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect()
    }

    pub fn open_subscription_count(&self) -> usize {
        self.locked(&self.open_subscriptions).len()
    }

    pub fn subscribed_owners(&self) -> Vec<Uuid> {
        self.locked(&self.open_subscriptions)
            .iter()
            .map(|(_, owner)| *owner)
            .collect()
    }

    /// Deliver an auth event to every registered listener, as the backend
    /// would after an external state change.
    pub fn fire_auth(&self, event: AuthEvent) {
        let listeners = self.locked(&self.listeners);
        for (_, tx) in listeners.iter() {
            let _ = tx.send(event.clone());
        }
    }

    /// Deliver a change notification on every open feed, as a concurrent
    /// session's mutation would.
    pub fn fire_change(&self, event: ChangeEvent) {
        let senders = self.locked(&self.change_senders);
        for (_, tx) in senders.iter() {
            let _ = tx.send(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.locked(&self.listeners).len()
    }

    fn locked<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().expect("mock lock poisoned")
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.locked(&self.session).clone())
    }

    async fn sign_in_with_oauth(&self, _provider: &str, _redirect_url: &str) -> Result<()> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(RibbonError::AuthInitiation("mock sign-out failure".into()));
        }
        self.set_session(None);
        Ok(())
    }

    async fn select_bookmarks(&self, owner: Uuid) -> Result<Vec<Bookmark>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(RibbonError::RemoteFetch("mock fetch failure".into()));
        }

        let mut rows = if self.unfiltered_select.load(Ordering::SeqCst) {
            self.locked(&self.rows).clone()
        } else {
            self.rows_for(owner)
        };
        crate::domain::sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn insert_bookmark(&self, record: &NewBookmark) -> Result<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(RibbonError::RemoteWrite("mock insert failure".into()));
        }
        self.push_row(record.owner, &record.title, &record.url);
        Ok(())
    }

    async fn delete_bookmark(&self, id: Uuid, owner: Uuid) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RibbonError::RemoteWrite("mock delete failure".into()));
        }
        self.locked(&self.rows)
            .retain(|b| !(b.id == id && b.owner == owner));
        Ok(())
    }

    fn on_auth_state_change(&self, events: mpsc::UnboundedSender<AuthEvent>) -> AuthListenerHandle {
        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        self.locked(&self.listeners).push((id, events));
        AuthListenerHandle(id)
    }

    fn remove_auth_listener(&self, handle: AuthListenerHandle) {
        self.locked(&self.listeners)
            .retain(|(id, _)| *id != handle.0);
    }

    fn subscribe(
        &self,
        owner: Uuid,
        events: mpsc::UnboundedSender<ChangeEvent>,
    ) -> SubscriptionHandle {
        let id = self.next_handle_id.fetch_add(1, Ordering::SeqCst);
        self.locked(&self.open_subscriptions).push((id, owner));
        self.locked(&self.change_senders).push((id, events));
        SubscriptionHandle {
            owner,
            id,
            task: None,
        }
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.locked(&self.open_subscriptions)
            .retain(|(id, _)| *id != handle.id);
        self.locked(&self.change_senders)
            .retain(|(id, _)| *id != handle.id);
    }
}

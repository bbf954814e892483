//! In-memory bookmark collection for the current user.
//!
//! The collection is only ever replaced wholesale with a fresh full read,
//! never patched incrementally, so redundant refreshes converge on server
//! truth. Gateway failures are logged and leave the previous collection
//! untouched.

use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::{sort_newest_first, Bookmark, NewBookmark};
use crate::gateway::Gateway;

#[derive(Default)]
pub struct BookmarkStore {
    owner: Option<Uuid>,
    bookmarks: Vec<Bookmark>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    /// Bind the collection to a user. Changing the owner (or unsetting it)
    /// empties the collection; records never outlive the identity they
    /// belong to.
    pub fn set_owner(&mut self, owner: Option<Uuid>) {
        if self.owner != owner {
            self.owner = owner;
            self.bookmarks.clear();
        }
    }

    /// Replace the collection with the owner's current rows.
    ///
    /// The fetch result is applied only if `owner` still matches the
    /// store's owner once the call returns; a fetch that was in flight
    /// across a sign-out or user switch is discarded rather than allowed
    /// to resurrect stale data.
    pub async fn refresh(&mut self, gateway: &dyn Gateway, owner: Uuid) {
        match gateway.select_bookmarks(owner).await {
            Ok(rows) => {
                if self.owner != Some(owner) {
                    debug!("Discarding stale fetch for {}", owner);
                    return;
                }
                // The backend already filters and orders; re-apply both
                // here so a misbehaving response cannot leak foreign rows.
                let mut rows: Vec<Bookmark> =
                    rows.into_iter().filter(|b| b.owner == owner).collect();
                sort_newest_first(&mut rows);
                self.bookmarks = rows;
            }
            Err(e) => {
                // Stale view beats a broken one; keep what we had.
                error!("Bookmark refresh failed: {}", e);
            }
        }
    }

    /// Insert a bookmark for `owner`. Blank titles or URLs are rejected
    /// locally without a round trip. The caller follows up with a refresh;
    /// nothing is appended locally.
    pub async fn add(
        &mut self,
        gateway: &dyn Gateway,
        owner: Option<Uuid>,
        title: &str,
        url: &str,
    ) {
        let Some(owner) = owner else {
            debug!("Ignoring add without a signed-in user");
            return;
        };

        let record = NewBookmark::new(owner, title, url);
        if !record.is_valid() {
            debug!("Ignoring add with blank title or url");
            return;
        }

        if let Err(e) = gateway.insert_bookmark(&record).await {
            error!("Bookmark insert failed: {}", e);
        }
    }

    /// Delete by id, scoped to `owner`, then refresh. A failed delete
    /// leaves the collection unchanged.
    pub async fn remove(&mut self, gateway: &dyn Gateway, id: Uuid, owner: Uuid) {
        match gateway.delete_bookmark(id, owner).await {
            Ok(()) => self.refresh(gateway, owner).await,
            Err(e) => error!("Bookmark delete failed: {}", e),
        }
    }

    pub fn clear(&mut self) {
        self.owner = None;
        self.bookmarks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        gw.push_row(user, "A", "http://a");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks().len(), 1);

        gw.push_row(user, "B", "http://b");
        store.refresh(&gw, user).await;
        let titles: Vec<_> = store.bookmarks().iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"A") && titles.contains(&"B"));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        gw.push_row(user, "A", "http://a");
        gw.push_row(user, "B", "http://b");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;
        let first = store.bookmarks().to_vec();
        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks(), first.as_slice());
    }

    #[tokio::test]
    async fn test_refresh_orders_newest_first() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        gw.push_row(user, "older", "http://a");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        gw.push_row(user, "newer", "http://b");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks()[0].title, "newer");
        assert_eq!(store.bookmarks()[1].title, "older");
    }

    #[tokio::test]
    async fn test_refresh_filters_foreign_rows() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        gw.push_row(user, "mine", "http://a");
        gw.push_row(stranger, "theirs", "http://b");
        // Simulate a backend that ignores the owner filter entirely.
        gw.unfiltered_select.store(true, Ordering::SeqCst);

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;

        assert_eq!(store.bookmarks().len(), 1);
        assert!(store.bookmarks().iter().all(|b| b.owner == user));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_collection() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        gw.push_row(user, "A", "http://a");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks().len(), 1);

        gw.fail_select.store(true, Ordering::SeqCst);
        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let gw = MockGateway::new();
        let old_user = Uuid::new_v4();
        let new_user = Uuid::new_v4();
        gw.push_row(old_user, "old", "http://a");

        let mut store = BookmarkStore::new();
        // The store moved on to another identity; a refresh started for the
        // previous one must not write anything.
        store.set_owner(Some(new_user));
        store.refresh(&gw, old_user).await;
        assert!(store.bookmarks().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_completing_after_sign_out_is_discarded() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        gw.push_row(user, "A", "http://a");

        let mut store = BookmarkStore::new();
        store.clear();
        store.refresh(&gw, user).await;
        assert!(store.bookmarks().is_empty());
    }

    #[tokio::test]
    async fn test_add_with_blank_fields_issues_no_call() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));

        store.add(&gw, Some(user), "", "http://x").await;
        store.add(&gw, Some(user), "T", "").await;
        store.add(&gw, Some(user), "   ", "   ").await;

        assert_eq!(gw.insert_calls.load(Ordering::SeqCst), 0);
        assert!(store.bookmarks().is_empty());
    }

    #[tokio::test]
    async fn test_add_without_identity_issues_no_call() {
        let gw = MockGateway::new();
        let mut store = BookmarkStore::new();
        store.add(&gw, None, "T", "http://x").await;
        assert_eq!(gw.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_does_not_append_locally() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));

        store
            .add(&gw, Some(user), "Example", "http://example.com")
            .await;
        assert_eq!(gw.insert_calls.load(Ordering::SeqCst), 1);
        // The collection is only ever replaced by refresh.
        assert!(store.bookmarks().is_empty());

        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks().len(), 1);
        assert_eq!(store.bookmarks()[0].title, "Example");
    }

    #[tokio::test]
    async fn test_remove_deletes_and_refreshes() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        let a = gw.push_row(user, "A", "http://a");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        gw.push_row(user, "B", "http://b");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;
        assert_eq!(store.bookmarks().len(), 2);

        store.remove(&gw, a, user).await;
        assert_eq!(store.bookmarks().len(), 1);
        assert_eq!(store.bookmarks()[0].title, "B");
    }

    #[tokio::test]
    async fn test_remove_is_owner_scoped() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let foreign = gw.push_row(stranger, "theirs", "http://b");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.remove(&gw, foreign, user).await;

        // The foreign row survives a delete issued under the wrong owner.
        assert_eq!(gw.rows_for(stranger).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_failure_keeps_collection() {
        let gw = MockGateway::new();
        let user = Uuid::new_v4();
        let a = gw.push_row(user, "A", "http://a");

        let mut store = BookmarkStore::new();
        store.set_owner(Some(user));
        store.refresh(&gw, user).await;

        gw.fail_delete.store(true, Ordering::SeqCst);
        store.remove(&gw, a, user).await;
        assert_eq!(store.bookmarks().len(), 1);
        assert_eq!(gw.rows_for(user).len(), 1);
    }

    #[test]
    fn test_owner_change_empties_collection() {
        let mut store = BookmarkStore::new();
        let user = Uuid::new_v4();
        store.set_owner(Some(user));

        // Same owner: no-op.
        store.set_owner(Some(user));
        assert_eq!(store.owner(), Some(user));

        store.set_owner(None);
        assert_eq!(store.owner(), None);
        assert!(store.bookmarks().is_empty());
    }
}

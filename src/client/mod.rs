//! Follow-graph client
//!
//! Consumer side of the query boundary: keeps a normalized cache of the
//! viewer and the users they follow, pages the follow list in incrementally,
//! and applies follows optimistically before the server confirms them.
//!
//! # Concurrency
//!
//! The store sits behind one mutex. Every store change is made under the lock
//! and the lock is never held across a network call, so an optimistic insert
//! is in place before its request is even sent, and no merge can interleave
//! with another merge of the same list.

pub mod loader;
pub mod mutation;
pub mod remote;
pub mod store;

pub use loader::{IncrementalLoader, LoadOutcome, PageCursor};
pub use mutation::{
    FollowReducer, MutationKind, MutationRecord, MutationReducer, MutationState, OptimisticWrite,
};
pub use remote::HttpFollowApi;
pub use store::{
    AssociationKey, EntityKey, ListAssociation, NormalizedStore, RecordId, UserSnapshot,
    ViewerSnapshot,
};

use crate::config::check_login;
use crate::graph::{QueryBoundary, UserNode, ViewerNode};
use crate::{FollowGraphError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transient flags for the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    /// At least one load or mutation is in flight
    pub loading: bool,
    /// Message of the most recent failure, cleared by the next success
    pub error: Option<String>,
}

/// Everything the presentation layer renders: `{ self, loading, error }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientState {
    #[serde(rename = "self")]
    pub viewer: Option<ViewerSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Activity {
    in_flight: usize,
    error: Option<String>,
    next_mutation: u64,
    mutations: BTreeMap<u64, MutationRecord>,
}

/// Cache-backed client over any [`QueryBoundary`]
pub struct FollowClient<Q: QueryBoundary> {
    api: Q,
    store: Mutex<NormalizedStore>,
    activity: Mutex<Activity>,
}

impl<Q: QueryBoundary> FollowClient<Q> {
    pub fn new(api: Q) -> Self {
        Self {
            api,
            store: Mutex::new(NormalizedStore::new()),
            activity: Mutex::new(Activity::default()),
        }
    }

    pub fn api(&self) -> &Q {
        &self.api
    }

    /// Load the viewer with the first page of the follow list, replacing any cached list
    pub async fn load(&self, per_page: u32) -> Result<()> {
        self.begin();
        let result = self.api.viewer(Some(1), Some(per_page)).await;
        let result = result.map(|viewer| self.merge_viewer(viewer, per_page));
        self.finish(&result);
        result
    }

    /// Append the next page of the follow list if the cursor says one exists
    ///
    /// Makes no request when `currentPage * perPage >= totalCount`.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let loader = {
            let store = lock(&self.store);
            let root = store.root().cloned().ok_or_else(|| {
                FollowGraphError::Validation("viewer has not been loaded yet".to_string())
            })?;
            IncrementalLoader::new(AssociationKey::following(root))
        };

        self.begin();
        let result = loader.load_more(&self.store, &self.api).await;
        self.finish(&result);
        result
    }

    /// Follow `login`, showing it at the head of the list until the server answers
    ///
    /// On failure the provisional entry and count change are undone and the
    /// original error is returned.
    pub async fn follow(&self, login: &str) -> Result<UserNode> {
        check_login(login).map_err(FollowGraphError::Validation)?;

        let id = {
            let mut activity = lock(&self.activity);
            activity.next_mutation += 1;
            let id = activity.next_mutation;
            activity.mutations.insert(
                id,
                MutationRecord::dispatched(
                    id,
                    MutationKind::Follow {
                        login: login.to_string(),
                    },
                ),
            );
            id
        };

        // Root lookup and insert share one guard; a concurrent load may swap the root
        let (reducer, write) = {
            let mut store = lock(&self.store);
            let reducer = FollowReducer::new(store.root().cloned(), login);
            let write = reducer.apply_optimistic(&mut store);
            (reducer, write)
        };
        self.advance_mutation(id, MutationState::OptimisticallyApplied, Some(write.clone()));
        info!(login = %login, provisional = %write.provisional, "Applied optimistic follow");

        self.begin();
        let result = self.api.follow(login).await;

        match &result {
            Ok(user) => {
                reducer.confirm(&mut lock(&self.store), &write, user);
                self.advance_mutation(id, MutationState::Confirmed, None);
            }
            Err(e) => {
                reducer.roll_back(&mut lock(&self.store), &write);
                self.advance_mutation(id, MutationState::RolledBack, None);
                warn!(login = %login, error = %e, "Follow failed, rolled back");
            }
        }

        self.finish(&result);
        result
    }

    /// Current denormalized view plus transient flags
    pub fn state(&self) -> ClientState {
        let viewer = lock(&self.store).snapshot();
        let status = self.status();
        ClientState {
            viewer,
            loading: status.loading,
            error: status.error,
        }
    }

    pub fn status(&self) -> ClientStatus {
        let activity = lock(&self.activity);
        ClientStatus {
            loading: activity.in_flight > 0,
            error: activity.error.clone(),
        }
    }

    /// Page cursor of the viewer's follow list, once loaded
    pub fn cursor(&self) -> Option<PageCursor> {
        let store = lock(&self.store);
        let root = store.root()?.clone();
        store
            .list(&AssociationKey::following(root))
            .map(|list| list.cursor)
    }

    pub fn has_more(&self) -> bool {
        self.cursor().is_some_and(|cursor| cursor.has_more())
    }

    pub fn mutation(&self, id: u64) -> Option<MutationRecord> {
        lock(&self.activity).mutations.get(&id).cloned()
    }

    /// Every mutation dispatched by this client, oldest first
    pub fn mutations(&self) -> Vec<MutationRecord> {
        lock(&self.activity).mutations.values().cloned().collect()
    }

    /// Look up a cached user by backend id
    pub fn user(&self, id: u64) -> Option<UserSnapshot> {
        lock(&self.store).user_by_id(id).map(|record| UserSnapshot {
            id: record.key.id.to_string(),
            login: record.login.clone(),
            name: record.name.clone(),
            provisional: false,
        })
    }

    fn merge_viewer(&self, viewer: ViewerNode, per_page: u32) {
        let mut store = lock(&self.store);

        let root = store.write_user(&UserNode {
            id: viewer.id,
            login: viewer.login.clone(),
            name: viewer.name.clone(),
        });
        let items: Vec<EntityKey> = viewer
            .following
            .iter()
            .map(|user| store.write_user(user))
            .collect();

        let loaded = items.len() as u32;
        let total = viewer.following_total.unwrap_or(viewer.following_count).max(loaded);

        store.set_list(
            AssociationKey::following(root.clone()),
            ListAssociation::new(items, PageCursor::loaded(1, per_page, total)),
        );
        if let Some(record) = store.user_mut(&root) {
            record.following_count = Some(viewer.following_count);
        }
        store.set_root(root);
    }

    fn advance_mutation(&self, id: u64, next: MutationState, write: Option<OptimisticWrite>) {
        let mut activity = lock(&self.activity);
        if let Some(record) = activity.mutations.get_mut(&id) {
            if record.advance(next) && write.is_some() {
                record.optimistic = write;
            }
        }
    }

    fn begin(&self) {
        lock(&self.activity).in_flight += 1;
    }

    fn finish<T>(&self, result: &Result<T>) {
        let mut activity = lock(&self.activity);
        activity.in_flight = activity.in_flight.saturating_sub(1);
        activity.error = result.as_ref().err().map(|e| e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn node(id: u64, login: &str) -> UserNode {
        UserNode {
            id,
            login: login.to_string(),
            name: None,
        }
    }

    /// Boundary over a fixed list; `follow` waits for `release` before answering,
    /// and `following` waits for `page_release` while `hold_pages` is set
    struct FakeBoundary {
        list: Vec<UserNode>,
        total: Option<u32>,
        follow_ok: bool,
        release: Arc<Notify>,
        hold_pages: AtomicBool,
        page_release: Notify,
        calls: AtomicUsize,
    }

    impl FakeBoundary {
        fn new(list: Vec<UserNode>, follow_ok: bool) -> Self {
            Self {
                total: Some(list.len() as u32),
                list,
                follow_ok,
                release: Arc::new(Notify::new()),
                hold_pages: AtomicBool::new(false),
                page_release: Notify::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn page(&self, page: Option<u32>, per_page: Option<u32>) -> Vec<UserNode> {
            let page = page.unwrap_or(1).max(1) as usize;
            let per_page = per_page.unwrap_or(10) as usize;
            self.list
                .iter()
                .skip((page - 1) * per_page)
                .take(per_page)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl QueryBoundary for FakeBoundary {
        async fn viewer(&self, page: Option<u32>, per_page: Option<u32>) -> Result<ViewerNode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let following = self.page(page, per_page);
            Ok(ViewerNode {
                id: 1,
                login: "me".to_string(),
                name: None,
                following_count: following.len() as u32,
                following_total: self.total,
                following,
            })
        }

        async fn following(
            &self,
            page: Option<u32>,
            per_page: Option<u32>,
        ) -> Result<Vec<UserNode>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hold_pages.load(Ordering::SeqCst) {
                self.page_release.notified().await;
            }
            Ok(self.page(page, per_page))
        }

        async fn follow(&self, login: &str) -> Result<UserNode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            if self.follow_ok {
                Ok(node(99, login))
            } else {
                Err(FollowGraphError::Transport("HTTP 502".to_string()))
            }
        }
    }

    fn logins(client: &FollowClient<FakeBoundary>) -> Vec<String> {
        client
            .state()
            .viewer
            .map(|v| v.following.into_iter().map(|u| u.login).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_load_sets_cursor_from_total() {
        let list = (0..5).map(|i| node(10 + i, &format!("u{}", i))).collect();
        let client = FollowClient::new(FakeBoundary::new(list, true));

        client.load(2).await.unwrap();

        assert_eq!(logins(&client), vec!["u0", "u1"]);
        assert_eq!(client.cursor(), Some(PageCursor::loaded(1, 2, 5)));
        assert!(client.has_more());
        assert_eq!(client.state().viewer.unwrap().following_count, 2);
    }

    #[tokio::test]
    async fn test_load_more_appends_until_exhausted() {
        let list = (0..5).map(|i| node(10 + i, &format!("u{}", i))).collect();
        let client = FollowClient::new(FakeBoundary::new(list, true));
        client.load(2).await.unwrap();

        assert_eq!(
            client.load_more().await.unwrap(),
            LoadOutcome::Appended { page: 2, added: 2 }
        );
        assert_eq!(
            client.load_more().await.unwrap(),
            LoadOutcome::Appended { page: 3, added: 1 }
        );
        let calls = client.api().calls.load(Ordering::SeqCst);
        assert_eq!(client.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(client.api().calls.load(Ordering::SeqCst), calls);

        assert_eq!(logins(&client), vec!["u0", "u1", "u2", "u3", "u4"]);
        assert_eq!(client.state().viewer.unwrap().following_count, 5);
    }

    #[tokio::test]
    async fn test_page_landing_after_reload_is_dropped() {
        let list = (0..6).map(|i| node(10 + i, &format!("u{}", i))).collect();
        let client = Arc::new(FollowClient::new(FakeBoundary::new(list, true)));
        client.load(2).await.unwrap();
        client.load_more().await.unwrap();

        client.api().hold_pages.store(true, Ordering::SeqCst);
        let calls = client.api().calls.load(Ordering::SeqCst);
        let pending = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.load_more().await })
        };
        while client.api().calls.load(Ordering::SeqCst) == calls {
            tokio::task::yield_now().await;
        }

        client.load(2).await.unwrap();
        client.api().page_release.notify_one();
        assert_eq!(
            pending.await.unwrap().unwrap(),
            LoadOutcome::Superseded { page: 3 }
        );

        assert_eq!(logins(&client), vec!["u0", "u1"]);
        assert_eq!(client.cursor(), Some(PageCursor::loaded(1, 2, 6)));
        assert!(client.has_more());

        client.api().hold_pages.store(false, Ordering::SeqCst);
        assert_eq!(
            client.load_more().await.unwrap(),
            LoadOutcome::Appended { page: 2, added: 2 }
        );
        assert_eq!(logins(&client), vec!["u0", "u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn test_load_more_before_load_is_rejected() {
        let client = FollowClient::new(FakeBoundary::new(vec![], true));
        let err = client.load_more().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_blank_follow_touches_nothing() {
        let client = FollowClient::new(FakeBoundary::new(vec![node(10, "x")], true));
        client.load(10).await.unwrap();
        let before = client.state();

        let err = client.follow("").await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(client.state(), before);
        assert!(client.mutations().is_empty());
        assert_eq!(client.api().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_follow_is_visible_before_server_answers() {
        let client = Arc::new(FollowClient::new(FakeBoundary::new(
            vec![node(10, "x"), node(11, "y")],
            true,
        )));
        client.load(10).await.unwrap();

        let pending = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.follow("zed").await })
        };
        while client.api().calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        let state = client.state();
        assert!(state.loading);
        let viewer = state.viewer.unwrap();
        assert_eq!(viewer.following_count, 3);
        assert_eq!(viewer.following[0].login, "zed");
        assert!(viewer.following[0].provisional);
        let record = client.mutation(1).unwrap();
        assert_eq!(record.state, MutationState::OptimisticallyApplied);
        assert_eq!(
            record.optimistic.unwrap().inserted,
            Some(AssociationKey::following(EntityKey::user(1)))
        );

        client.api().release.notify_one();
        let confirmed = pending.await.unwrap().unwrap();
        assert_eq!(confirmed.id, 99);

        let viewer = client.state().viewer.unwrap();
        assert_eq!(logins(&client), vec!["zed", "x", "y"]);
        assert_eq!(viewer.following_count, 3);
        assert!(!viewer.following[0].provisional);
        assert_eq!(client.mutation(1).unwrap().state, MutationState::Confirmed);
        assert!(!client.status().loading);
    }

    #[tokio::test]
    async fn test_failed_follow_rolls_back_and_reports() {
        let client = Arc::new(FollowClient::new(FakeBoundary::new(
            vec![node(10, "x"), node(11, "y")],
            false,
        )));
        client.load(10).await.unwrap();

        let pending = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.follow("zed").await })
        };
        while client.api().calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(logins(&client), vec!["zed", "x", "y"]);

        client.api().release.notify_one();
        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, FollowGraphError::Transport(_)));

        let state = client.state();
        assert_eq!(logins(&client), vec!["x", "y"]);
        assert_eq!(state.viewer.unwrap().following_count, 2);
        assert!(state.error.unwrap().contains("HTTP 502"));
        assert_eq!(client.mutation(1).unwrap().state, MutationState::RolledBack);
        assert_eq!(client.cursor(), Some(PageCursor::loaded(1, 10, 2)));
    }

    #[test]
    fn test_state_serializes_with_self_key() {
        let client = FollowClient::new(FakeBoundary::new(vec![], true));
        let json = serde_json::to_value(client.state()).unwrap();
        assert!(json.get("self").is_some());
        assert_eq!(json["loading"], false);
    }
}

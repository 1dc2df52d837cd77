//! Optimistic mutations
//!
//! Each dispatched mutation gets a [`MutationRecord`] that moves through
//! `Dispatched → OptimisticallyApplied → (Confirmed | RolledBack)`. The store
//! changes for each step come from a reducer specific to the mutation kind;
//! rollback is one of its operations, not a fallback.

use super::store::{AssociationKey, EntityKey, NormalizedStore};
use crate::graph::UserNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Dispatched,
    OptimisticallyApplied,
    Confirmed,
    RolledBack,
}

impl MutationState {
    pub fn can_transition_to(self, next: MutationState) -> bool {
        matches!(
            (self, next),
            (MutationState::Dispatched, MutationState::OptimisticallyApplied)
                | (MutationState::OptimisticallyApplied, MutationState::Confirmed)
                | (MutationState::OptimisticallyApplied, MutationState::RolledBack)
        )
    }

    pub fn is_settled(self) -> bool {
        matches!(self, MutationState::Confirmed | MutationState::RolledBack)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Follow { login: String },
}

/// Store changes made by an optimistic apply, needed to undo or replace them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticWrite {
    pub provisional: EntityKey,
    /// List the provisional record was prepended to, if the list was loaded
    pub inserted: Option<AssociationKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub id: u64,
    pub kind: MutationKind,
    pub state: MutationState,
    pub optimistic: Option<OptimisticWrite>,
}

impl MutationRecord {
    pub fn dispatched(id: u64, kind: MutationKind) -> Self {
        Self {
            id,
            kind,
            state: MutationState::Dispatched,
            optimistic: None,
        }
    }

    /// Move to `next`; returns false and stays put on an illegal transition
    pub fn advance(&mut self, next: MutationState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

/// Store effects of one mutation kind
pub trait MutationReducer {
    /// Server result that replaces the optimistic write
    type Confirmed;

    fn apply_optimistic(&self, store: &mut NormalizedStore) -> OptimisticWrite;

    fn confirm(&self, store: &mut NormalizedStore, write: &OptimisticWrite, result: &Self::Confirmed);

    fn roll_back(&self, store: &mut NormalizedStore, write: &OptimisticWrite);
}

/// Follow: most-recent-first insert at the head of the owner's follow list
#[derive(Debug, Clone)]
pub struct FollowReducer {
    owner: Option<EntityKey>,
    login: String,
}

impl FollowReducer {
    pub fn new(owner: Option<EntityKey>, login: impl Into<String>) -> Self {
        Self {
            owner,
            login: login.into(),
        }
    }

    fn adjust_count(store: &mut NormalizedStore, owner: &EntityKey, delta: i64) {
        if let Some(record) = store.user_mut(owner) {
            let count = i64::from(record.following_count.unwrap_or(0)) + delta;
            record.following_count = Some(count.max(0) as u32);
        }
    }

    /// Drop the provisional entry and undo the count and total it added
    fn remove_provisional(store: &mut NormalizedStore, assoc: &AssociationKey, provisional: &EntityKey) {
        let removed = match store.list_mut(assoc) {
            Some(list) => match list.position(provisional) {
                Some(pos) => {
                    list.items.remove(pos);
                    list.cursor.total_count = list.cursor.total_count.saturating_sub(1);
                    true
                }
                None => false,
            },
            None => false,
        };
        if removed {
            Self::adjust_count(store, &assoc.owner, -1);
        }
    }
}

impl MutationReducer for FollowReducer {
    type Confirmed = UserNode;

    fn apply_optimistic(&self, store: &mut NormalizedStore) -> OptimisticWrite {
        let provisional = store.write_provisional_user(&self.login);

        let inserted = self.owner.as_ref().and_then(|owner| {
            let assoc = AssociationKey::following(owner.clone());
            let list = store.list_mut(&assoc)?;
            list.items.insert(0, provisional.clone());
            list.cursor.total_count += 1;
            Self::adjust_count(store, owner, 1);
            Some(assoc)
        });

        OptimisticWrite {
            provisional,
            inserted,
        }
    }

    fn confirm(&self, store: &mut NormalizedStore, write: &OptimisticWrite, result: &UserNode) {
        let confirmed = store.write_user(result);

        if let Some(assoc) = &write.inserted {
            let already_listed = store
                .list(assoc)
                .is_some_and(|list| list.items.contains(&confirmed));

            if already_listed {
                // Following someone already in the list adds no new entry
                Self::remove_provisional(store, assoc, &write.provisional);
            } else if let Some(list) = store.list_mut(assoc) {
                if let Some(pos) = list.position(&write.provisional) {
                    list.items[pos] = confirmed;
                }
            }
        }

        store.remove_user(&write.provisional);
    }

    fn roll_back(&self, store: &mut NormalizedStore, write: &OptimisticWrite) {
        if let Some(assoc) = &write.inserted {
            Self::remove_provisional(store, assoc, &write.provisional);
        }
        store.remove_user(&write.provisional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::loader::PageCursor;
    use crate::client::store::ListAssociation;

    fn node(id: u64, login: &str) -> UserNode {
        UserNode {
            id,
            login: login.to_string(),
            name: None,
        }
    }

    /// Viewer `me` following [x, y]
    fn seeded() -> (NormalizedStore, EntityKey, AssociationKey) {
        let mut store = NormalizedStore::new();
        let root = store.write_user(&node(1, "me"));
        store.set_root(root.clone());
        let x = store.write_user(&node(10, "x"));
        let y = store.write_user(&node(11, "y"));
        let assoc = AssociationKey::following(root.clone());
        store.set_list(
            assoc.clone(),
            ListAssociation::new(vec![x, y], PageCursor::loaded(1, 10, 2)),
        );
        store.user_mut(&root).unwrap().following_count = Some(2);
        (store, root, assoc)
    }

    fn logins(store: &NormalizedStore) -> Vec<String> {
        store
            .snapshot()
            .unwrap()
            .following
            .into_iter()
            .map(|u| u.login)
            .collect()
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut record = MutationRecord::dispatched(1, MutationKind::Follow { login: "zed".into() });
        assert!(!record.advance(MutationState::Confirmed));
        assert!(record.advance(MutationState::OptimisticallyApplied));
        assert!(record.advance(MutationState::RolledBack));
        assert!(record.state.is_settled());
        assert!(!record.advance(MutationState::Confirmed));
        assert_eq!(record.state, MutationState::RolledBack);
    }

    #[test]
    fn test_optimistic_apply_prepends_and_counts() {
        let (mut store, _root, assoc) = seeded();
        let reducer = FollowReducer::new(store.root().cloned(), "zed");

        let write = reducer.apply_optimistic(&mut store);

        assert_eq!(logins(&store), vec!["zed", "x", "y"]);
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.following_count, 3);
        assert!(snapshot.following[0].provisional);
        assert_eq!(snapshot.following[0].id, "temp-1");
        assert_eq!(write.inserted.as_ref(), Some(&assoc));
        assert_eq!(store.list(&assoc).unwrap().cursor.total_count, 3);
    }

    #[test]
    fn test_confirm_replaces_provisional_in_place() {
        let (mut store, _root, _assoc) = seeded();
        let reducer = FollowReducer::new(store.root().cloned(), "zed");
        let write = reducer.apply_optimistic(&mut store);

        reducer.confirm(&mut store, &write, &node(99, "zed"));

        assert_eq!(logins(&store), vec!["zed", "x", "y"]);
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.following_count, 3);
        assert_eq!(snapshot.following[0].id, "99");
        assert!(!snapshot.following[0].provisional);
        assert_eq!(store.provisional_count(), 0);
    }

    #[test]
    fn test_confirm_of_already_listed_user_leaves_no_duplicate() {
        let (mut store, _root, assoc) = seeded();
        let reducer = FollowReducer::new(store.root().cloned(), "y");
        let write = reducer.apply_optimistic(&mut store);

        reducer.confirm(&mut store, &write, &node(11, "y"));

        assert_eq!(logins(&store), vec!["x", "y"]);
        assert_eq!(store.snapshot().unwrap().following_count, 2);
        assert_eq!(store.list(&assoc).unwrap().cursor.total_count, 2);
    }

    #[test]
    fn test_roll_back_restores_list_and_count() {
        let (mut store, _root, assoc) = seeded();
        let before = store.list(&assoc).cloned();
        let reducer = FollowReducer::new(store.root().cloned(), "zed");
        let write = reducer.apply_optimistic(&mut store);

        reducer.roll_back(&mut store, &write);

        assert_eq!(logins(&store), vec!["x", "y"]);
        assert_eq!(store.snapshot().unwrap().following_count, 2);
        assert_eq!(store.list(&assoc).cloned(), before);
        assert_eq!(store.provisional_count(), 0);
    }

    #[test]
    fn test_apply_without_loaded_list_touches_no_count() {
        let mut store = NormalizedStore::new();
        let reducer = FollowReducer::new(None, "zed");
        let write = reducer.apply_optimistic(&mut store);
        assert!(write.inserted.is_none());

        reducer.roll_back(&mut store, &write);
        assert_eq!(store.provisional_count(), 0);
    }
}

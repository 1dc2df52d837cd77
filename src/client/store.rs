//! Normalized, identity-keyed object store
//!
//! Every user record is held once, under `User:<id>`, however many lists
//! reference it. Lists hold keys, not copies, so a write through one path is
//! visible through every other.
//!
//! Provisional records created by optimistic mutations live under a separate
//! [`RecordId::Provisional`] id space. Lookups by real identifier build a
//! [`RecordId::Confirmed`] key and can never land on a provisional record.

use super::loader::PageCursor;
use crate::graph::UserNode;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub const USER_TYPENAME: &str = "User";

/// Identifier half of an [`EntityKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Backend-assigned identifier
    Confirmed(u64),
    /// Locally synthesized, awaiting server confirmation
    Provisional(u64),
}

impl RecordId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, RecordId::Provisional(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Confirmed(id) => write!(f, "{}", id),
            RecordId::Provisional(n) => write!(f, "temp-{}", n),
        }
    }
}

/// Composite key: declared type name plus identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub typename: &'static str,
    pub id: RecordId,
}

impl EntityKey {
    pub fn user(id: u64) -> Self {
        Self {
            typename: USER_TYPENAME,
            id: RecordId::Confirmed(id),
        }
    }

    fn provisional_user(n: u64) -> Self {
        Self {
            typename: USER_TYPENAME,
            id: RecordId::Provisional(n),
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.typename, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub key: EntityKey,
    pub login: String,
    pub name: Option<String>,
    /// Derived count of the owner's `following` association
    pub following_count: Option<u32>,
}

/// Names one list-valued field on one record, e.g. the follow list of the viewer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssociationKey {
    pub owner: EntityKey,
    pub field: &'static str,
}

impl AssociationKey {
    pub fn following(owner: EntityKey) -> Self {
        Self {
            owner,
            field: "following",
        }
    }
}

/// Ordered keys of one list association plus its page bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAssociation {
    pub items: Vec<EntityKey>,
    pub cursor: PageCursor,
    /// Page currently being fetched by the incremental loader
    pub pending_page: Option<u32>,
    /// Bumped each time the store replaces this association wholesale
    pub generation: u64,
}

impl ListAssociation {
    pub fn new(items: Vec<EntityKey>, cursor: PageCursor) -> Self {
        Self {
            items,
            cursor,
            pending_page: None,
            generation: 0,
        }
    }

    pub fn position(&self, key: &EntityKey) -> Option<usize> {
        self.items.iter().position(|k| k == key)
    }
}

/// User as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub provisional: bool,
}

/// The `self` subtree as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub following_count: u32,
    pub following: Vec<UserSnapshot>,
}

#[derive(Debug, Default)]
pub struct NormalizedStore {
    records: HashMap<EntityKey, UserRecord>,
    lists: HashMap<AssociationKey, ListAssociation>,
    root: Option<EntityKey>,
    next_provisional: u64,
    next_generation: u64,
}

impl NormalizedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a confirmed user into its record, creating it if needed
    ///
    /// Fields from the node overwrite; the derived count is left alone.
    pub fn write_user(&mut self, node: &UserNode) -> EntityKey {
        let key = EntityKey::user(node.id);
        let record = self.records.entry(key.clone()).or_insert_with(|| UserRecord {
            key: key.clone(),
            login: String::new(),
            name: None,
            following_count: None,
        });
        record.login = node.login.clone();
        record.name = node.name.clone();
        key
    }

    /// Insert a provisional user under a fresh `temp-<n>` id
    pub fn write_provisional_user(&mut self, login: &str) -> EntityKey {
        self.next_provisional += 1;
        let key = EntityKey::provisional_user(self.next_provisional);
        self.records.insert(
            key.clone(),
            UserRecord {
                key: key.clone(),
                login: login.to_string(),
                name: None,
                following_count: None,
            },
        );
        key
    }

    pub fn user(&self, key: &EntityKey) -> Option<&UserRecord> {
        self.records.get(key)
    }

    pub fn user_mut(&mut self, key: &EntityKey) -> Option<&mut UserRecord> {
        self.records.get_mut(key)
    }

    /// Look up a user by backend identifier; provisional records never match
    pub fn user_by_id(&self, id: u64) -> Option<&UserRecord> {
        self.records.get(&EntityKey::user(id))
    }

    pub fn remove_user(&mut self, key: &EntityKey) -> Option<UserRecord> {
        self.records.remove(key)
    }

    pub fn set_root(&mut self, key: EntityKey) {
        self.root = Some(key);
    }

    pub fn root(&self) -> Option<&EntityKey> {
        self.root.as_ref()
    }

    pub fn list(&self, key: &AssociationKey) -> Option<&ListAssociation> {
        self.lists.get(key)
    }

    pub fn list_mut(&mut self, key: &AssociationKey) -> Option<&mut ListAssociation> {
        self.lists.get_mut(key)
    }

    /// Install `list` under `key`, replacing any earlier one
    ///
    /// The installed list gets a fresh generation, so work started against
    /// the replaced list can tell it is stale.
    pub fn set_list(&mut self, key: AssociationKey, mut list: ListAssociation) {
        self.next_generation += 1;
        list.generation = self.next_generation;
        self.lists.insert(key, list);
    }

    /// Append keys to the end of a list, skipping ones already present
    ///
    /// Returns how many keys were added.
    pub fn append_to_list(&mut self, key: &AssociationKey, items: Vec<EntityKey>) -> usize {
        let Some(list) = self.lists.get_mut(key) else {
            return 0;
        };
        let before = list.items.len();
        for item in items {
            if !list.items.contains(&item) {
                list.items.push(item);
            }
        }
        list.items.len() - before
    }

    /// Number of provisional records currently held
    pub fn provisional_count(&self) -> usize {
        self.records.keys().filter(|k| k.is_provisional()).count()
    }

    /// Denormalize the root and its follow list for presentation
    pub fn snapshot(&self) -> Option<ViewerSnapshot> {
        let root_key = self.root.as_ref()?;
        let root = self.records.get(root_key)?;

        let following = self
            .lists
            .get(&AssociationKey::following(root_key.clone()))
            .map(|list| {
                list.items
                    .iter()
                    .filter_map(|key| self.records.get(key))
                    .map(|record| UserSnapshot {
                        id: record.key.id.to_string(),
                        login: record.login.clone(),
                        name: record.name.clone(),
                        provisional: record.key.is_provisional(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(ViewerSnapshot {
            id: root.key.id.to_string(),
            login: root.login.clone(),
            name: root.name.clone(),
            following_count: root.following_count.unwrap_or(0),
            following,
        })
    }
}

//! Page cursors and the incremental "load more" driver

use super::store::{AssociationKey, NormalizedStore};
use crate::graph::QueryBoundary;
use crate::{FollowGraphError, Result};
use std::sync::Mutex;
use tracing::{debug, info};

/// Client-held pagination state for one list association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Last page merged into the list; 0 before the first load
    pub current_page: u32,
    pub per_page: u32,
    /// Total number of items the backend reports for the list
    pub total_count: u32,
}

impl PageCursor {
    /// Cursor after `current_page` pages have been merged
    pub fn loaded(current_page: u32, per_page: u32, total_count: u32) -> Self {
        Self {
            current_page,
            per_page,
            total_count,
        }
    }

    /// Whether a further page can exist: `currentPage * perPage < totalCount`
    pub fn has_more(&self) -> bool {
        u64::from(self.current_page) * u64::from(self.per_page) < u64::from(self.total_count)
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_more().then(|| self.current_page + 1)
    }
}

/// What a `load_more` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Page fetched and merged; `added` new items appended
    Appended { page: u32, added: usize },
    /// Cursor says every page is loaded; no request made
    Exhausted,
    /// Another `load_more` for the same list is still running; no request made
    AlreadyLoading,
    /// The list was reloaded while the page was in flight; the page was dropped
    Superseded { page: u32 },
}

/// Drives next-page requests for one list association
#[derive(Debug, Clone)]
pub struct IncrementalLoader {
    association: AssociationKey,
}

impl IncrementalLoader {
    pub fn new(association: AssociationKey) -> Self {
        Self { association }
    }

    pub fn association(&self) -> &AssociationKey {
        &self.association
    }

    /// Fetch and append the next page, or do nothing when there is none
    ///
    /// The store lock is never held across the network call.
    pub async fn load_more(
        &self,
        store: &Mutex<NormalizedStore>,
        api: &dyn QueryBoundary,
    ) -> Result<LoadOutcome> {
        let (page, per_page, generation) = {
            let mut store = super::lock(store);
            let list = store.list_mut(&self.association).ok_or_else(|| {
                FollowGraphError::Validation(format!(
                    "{} has not been loaded yet",
                    self.association.field
                ))
            })?;

            if list.pending_page.is_some() {
                return Ok(LoadOutcome::AlreadyLoading);
            }
            let Some(page) = list.cursor.next_page() else {
                debug!(cursor = ?list.cursor, "No more pages");
                return Ok(LoadOutcome::Exhausted);
            };
            list.pending_page = Some(page);
            (page, list.cursor.per_page, list.generation)
        };

        let fetched = api.following(Some(page), Some(per_page)).await;

        let mut store = super::lock(store);
        let current = match store.list_mut(&self.association) {
            Some(list) if list.generation == generation => {
                list.pending_page = None;
                true
            }
            _ => false,
        };
        if !current {
            // Page offsets belong to the replaced list; merging would skip pages
            debug!(page, "List replaced while page was in flight, dropping page");
            return fetched.map(|_| LoadOutcome::Superseded { page });
        }
        let users = fetched?;

        let keys = users.iter().map(|user| store.write_user(user)).collect();
        let added = store.append_to_list(&self.association, keys);

        let owner = self.association.owner.clone();
        let length = match store.list_mut(&self.association) {
            Some(list) => {
                list.cursor.current_page = page;
                list.cursor.total_count = list.cursor.total_count.max(list.items.len() as u32);
                list.items.len() as u32
            }
            None => 0,
        };
        if let Some(record) = store.user_mut(&owner) {
            record.following_count = Some(length);
        }

        info!(page, added, "Merged page");
        Ok(LoadOutcome::Appended { page, added })
    }
}

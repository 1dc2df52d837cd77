//! GitHub connector
//!
//! Builds backend addresses for the follow graph and routes every read through
//! the [`BatchingCache`], so concurrent reads of one address cost one request.
//! Writes bypass coalescing and invalidate it.

mod batch;

pub use batch::BatchingCache;

use crate::github::{paginate, Address, GitHubUser, ResourceFetcher, UserSummary};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Address of the single-user resource for `login`
pub fn user_address(login: &str) -> Address {
    paginate(&format!("/users/{}", urlencoding::encode(login)), None, None)
}

/// Address of one page of the users `login` follows
pub fn following_address(login: &str, page: Option<u32>, per_page: Option<u32>) -> Address {
    paginate(
        &format!("/users/{}/following", urlencoding::encode(login)),
        page,
        per_page,
    )
}

/// Address of the caller's follow edge to `login`
pub fn follow_address(login: &str) -> Address {
    Address::new(format!("/user/following/{}", urlencoding::encode(login)))
}

/// Follow-graph reads and writes over one shared ticket table
pub struct GitHubConnector {
    cache: BatchingCache,
}

impl GitHubConnector {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            cache: BatchingCache::new(fetcher),
        }
    }

    pub async fn user_for_login(&self, login: &str) -> Result<GitHubUser> {
        let address = user_address(login);
        self.cache.load(&address).await?.into_user(&address)
    }

    pub async fn following_for_login(
        &self,
        login: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Vec<UserSummary>> {
        let address = following_address(login, page, per_page);
        self.cache.load(&address).await?.into_summaries(&address)
    }

    /// Follow `login` as the configured caller, then invalidate coalesced reads
    pub async fn follow(&self, login: &str) -> Result<()> {
        let address = follow_address(login);
        info!(login = %login, "Following user");
        self.cache.write(&address).await
    }

    pub fn cache(&self) -> &BatchingCache {
        &self.cache
    }
}

//! Field resolvers for `self`, `self.following` and `follow`

use super::view::ViewerNode;
use crate::config::check_login;
use crate::connector::GitHubConnector;
use crate::github::GitHubUser;
use crate::{FollowGraphError, Result};
use futures::future::try_join_all;
use tracing::{debug, warn};

/// Resolves the follow graph over a [`GitHubConnector`]
///
/// No resolver retries; any failure aborts the whole operation.
pub struct GraphResolver {
    connector: GitHubConnector,
    default_per_page: u32,
}

impl GraphResolver {
    pub fn new(connector: GitHubConnector, default_per_page: u32) -> Self {
        Self {
            connector,
            default_per_page,
        }
    }

    pub fn connector(&self) -> &GitHubConnector {
        &self.connector
    }

    /// Load the full resource for `identity`
    pub async fn resolve_self(&self, identity: &str) -> Result<GitHubUser> {
        validate_login(identity)?;
        self.connector.user_for_login(identity).await
    }

    /// One page of the users `login` follows, each resolved to its full resource
    ///
    /// One list read, then one item read per summary, issued concurrently.
    /// Output order is the order of the summary list. If any item read fails
    /// the whole list fails; items still in flight are discarded.
    pub async fn resolve_following(
        &self,
        login: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Vec<GitHubUser>> {
        validate_login(login)?;
        let (page, per_page) = self.page_args(page, per_page)?;

        let summaries = self
            .connector
            .following_for_login(login, page, Some(per_page))
            .await?;

        debug!(login = %login, items = summaries.len(), "Fanning out following list");

        try_join_all(summaries.into_iter().map(|summary| async move {
            self.connector
                .user_for_login(&summary.login)
                .await
                .map_err(|source| {
                    warn!(login = %summary.login, error = %source, "Fan-out item failed");
                    FollowGraphError::PartialFanout {
                        login: summary.login.clone(),
                        source: Box::new(source),
                    }
                })
        }))
        .await
    }

    /// Resolve `self` in one pass: the root, its following page, and the count
    /// derived from that same page
    pub async fn resolve_viewer(
        &self,
        identity: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<ViewerNode> {
        let root = self.resolve_self(identity).await?;
        let following = self.resolve_following(&root.login, page, per_page).await?;
        Ok(ViewerNode::assemble(root, following))
    }

    /// Follow `login`, then return its freshly loaded resource
    ///
    /// A blank login is rejected before any network call.
    pub async fn follow(&self, login: &str) -> Result<GitHubUser> {
        validate_login(login)?;
        self.connector.follow(login).await?;
        self.connector.user_for_login(login).await
    }

    /// Apply schema defaults: page 0 means "backend default", absent perPage
    /// means the configured default
    fn page_args(&self, page: Option<u32>, per_page: Option<u32>) -> Result<(Option<u32>, u32)> {
        let per_page = per_page.unwrap_or(self.default_per_page);
        if per_page == 0 {
            return Err(FollowGraphError::Validation(
                "perPage must be greater than 0".to_string(),
            ));
        }
        Ok((page.filter(|p| *p > 0), per_page))
    }
}

fn validate_login(login: &str) -> Result<()> {
    check_login(login).map_err(FollowGraphError::Validation)
}

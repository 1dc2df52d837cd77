//! The query boundary between the follow-graph client and its server
//!
//! Fields: `self`, `self.followingCount`, `self.following(page, perPage)` and
//! the `follow(login)` mutation. The caller identity is bound when the
//! boundary is built, never passed per call.

use super::resolver::GraphResolver;
use super::view::{UserNode, ViewerNode};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait QueryBoundary: Send + Sync {
    /// `self` with `following(page, perPage)` and `followingCount`
    async fn viewer(&self, page: Option<u32>, per_page: Option<u32>) -> Result<ViewerNode>;

    /// `self.following(page, perPage)` alone
    async fn following(&self, page: Option<u32>, per_page: Option<u32>) -> Result<Vec<UserNode>>;

    /// `follow(login)`
    async fn follow(&self, login: &str) -> Result<UserNode>;
}

/// In-process boundary: a resolver bound to the configured identity
#[derive(Clone)]
pub struct BoundResolver {
    resolver: Arc<GraphResolver>,
    identity: String,
}

impl BoundResolver {
    pub fn new(resolver: Arc<GraphResolver>, identity: impl Into<String>) -> Self {
        Self {
            resolver,
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn resolver(&self) -> &GraphResolver {
        &self.resolver
    }
}

#[async_trait]
impl QueryBoundary for BoundResolver {
    async fn viewer(&self, page: Option<u32>, per_page: Option<u32>) -> Result<ViewerNode> {
        self.resolver
            .resolve_viewer(&self.identity, page, per_page)
            .await
    }

    async fn following(&self, page: Option<u32>, per_page: Option<u32>) -> Result<Vec<UserNode>> {
        let users = self
            .resolver
            .resolve_following(&self.identity, page, per_page)
            .await?;
        Ok(users.into_iter().map(UserNode::from).collect())
    }

    async fn follow(&self, login: &str) -> Result<UserNode> {
        self.resolver.follow(login).await.map(UserNode::from)
    }
}

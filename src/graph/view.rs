//! Query boundary shapes
//!
//! What the `self` field and the `follow` mutation return to callers.

use crate::github::GitHubUser;
use serde::{Deserialize, Serialize};

/// A user as exposed on the query boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNode {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<GitHubUser> for UserNode {
    fn from(user: GitHubUser) -> Self {
        Self {
            id: user.id,
            login: user.login,
            name: user.name,
        }
    }
}

/// The `self` field: the caller plus one page of the users they follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerNode {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Length of `following` as resolved in the same pass
    pub following_count: u32,
    /// Backend-reported total of followed users, from the root read
    #[serde(default)]
    pub following_total: Option<u32>,
    pub following: Vec<UserNode>,
}

impl ViewerNode {
    /// Assemble the root and its resolved list; the count is taken from that list
    pub fn assemble(root: GitHubUser, following: Vec<GitHubUser>) -> Self {
        let following: Vec<UserNode> = following.into_iter().map(UserNode::from).collect();
        Self {
            id: root.id,
            login: root.login,
            name: root.name,
            following_count: following.len() as u32,
            following_total: root.following,
            following,
        }
    }
}

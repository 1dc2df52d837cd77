//! HTTP implementation of the query boundary
//!
//! Talks to a running `followgraph serve` instance. Error bodies of the form
//! `{"error": ..., "kind": ...}` are turned back into the matching
//! [`FollowGraphError`] variant.

use crate::graph::{QueryBoundary, UserNode, ViewerNode};
use crate::{FollowGraphError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Error body rendered by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
struct FollowRequest<'a> {
    login: &'a str,
}

/// Remote query boundary over the follow-graph HTTP surface
#[derive(Debug, Clone)]
pub struct HttpFollowApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFollowApi {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:3001`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FollowGraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, page: Option<u32>, per_page: Option<u32>) -> String {
        let mut params = Vec::new();
        if let Some(page) = page {
            params.push(format!("page={}", page));
        }
        if let Some(per_page) = per_page {
            params.push(format!("perPage={}", per_page));
        }

        if params.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, params.join("&"))
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => FollowGraphError::from_kind(&err.kind, err.error),
                Err(_) => FollowGraphError::Transport(format!("Server returned HTTP {}", status)),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl QueryBoundary for HttpFollowApi {
    async fn viewer(&self, page: Option<u32>, per_page: Option<u32>) -> Result<ViewerNode> {
        let url = self.url("/graphql/self", page, per_page);
        debug!(url = %url, "GET viewer");
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn following(&self, page: Option<u32>, per_page: Option<u32>) -> Result<Vec<UserNode>> {
        let url = self.url("/graphql/self/following", page, per_page);
        debug!(url = %url, "GET following");
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn follow(&self, login: &str) -> Result<UserNode> {
        let url = self.url("/graphql/follow", None, None);
        debug!(url = %url, login = %login, "POST follow");
        let response = self
            .client
            .post(&url)
            .json(&FollowRequest { login })
            .send()
            .await?;
        Self::decode(response).await
    }
}

//! Single-read and single-write access to the GitHub REST API
//!
//! Every call here is exactly one outbound request. Deduplication lives one
//! layer up in [`crate::connector::BatchingCache`].

use super::types::{Address, ResourceEnvelope};
use crate::config::{CredentialPlacement, FollowGraphConfig};
use crate::{FollowGraphError, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout for create/update operations
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// One network read or write against the backend
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Read and decode the resource at `address`
    async fn fetch(&self, address: &Address) -> Result<ResourceEnvelope>;

    /// Issue a zero-length `PUT` to `address`
    async fn put(&self, address: &Address) -> Result<()>;
}

/// reqwest-backed fetcher for github.com or a compatible API root
pub struct HttpFetcher {
    client: Client,
    rest_base_url: String,
    auth_token: Option<String>,
    placement: CredentialPlacement,
    read_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from configuration
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &FollowGraphConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("followgraph/0.1"),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github.v3+json"),
                );
                headers
            })
            .build()?;

        let base_url = config.api_url.trim_end_matches('/');
        let rest_base_url =
            if base_url.contains("github.com") && !base_url.contains("api.github.com") {
                "https://api.github.com".to_string()
            } else {
                base_url.to_string()
            };

        Ok(Self {
            client,
            rest_base_url,
            auth_token: config.resolve_token(),
            placement: config.credential_placement,
            read_timeout: config.request_timeout(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Full request URL for an address
    ///
    /// With query placement the credential goes first, ahead of any
    /// pagination parameters: `<base><path>?access_token=..&page=..`.
    fn url_for(&self, address: &Address) -> String {
        let path = address.path();
        let query = address.query();

        match (self.placement, self.auth_token.as_deref()) {
            (CredentialPlacement::Query, Some(token)) => {
                let mut url = format!(
                    "{}{}?access_token={}",
                    self.rest_base_url,
                    path,
                    urlencoding::encode(token)
                );
                if let Some(query) = query {
                    url.push('&');
                    url.push_str(query);
                }
                url
            }
            _ => format!("{}{}", self.rest_base_url, address),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (self.placement, self.auth_token.as_deref()) {
            (CredentialPlacement::Header, Some(token)) => request.bearer_auth(token),
            _ => request,
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, address: &Address) -> Result<ResourceEnvelope> {
        debug!(address = %address, "Fetching resource");

        let request = self.authorize(self.client.get(self.url_for(address)));
        let response = request
            .timeout(self.read_timeout)
            .send()
            .await
            .map_err(|e| request_failed(address, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(FollowGraphError::Transport(format!(
                "GitHub API error: HTTP {} for {}: {}",
                status, address, error_body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| request_failed(address, e))?;
        ResourceEnvelope::from_slice(&body)
    }

    async fn put(&self, address: &Address) -> Result<()> {
        info!(address = %address, "Writing resource");

        let request = self
            .authorize(self.client.put(self.url_for(address)))
            .header(header::CONTENT_LENGTH, 0)
            .body(Vec::<u8>::new());
        let response = request
            .timeout(WRITE_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_failed(address, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_body = response.text().await.unwrap_or_default();
            Err(FollowGraphError::Transport(format!(
                "GitHub write failed: HTTP {} for {}: {}",
                status, address, error_body
            )))
        }
    }
}

/// Name the failed address, never the full URL
fn request_failed(address: &Address, e: reqwest::Error) -> FollowGraphError {
    match FollowGraphError::from(e) {
        FollowGraphError::Transport(msg) => {
            FollowGraphError::Transport(format!("{} for {}", msg, address))
        }
        other => other,
    }
}

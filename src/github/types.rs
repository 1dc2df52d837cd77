//! Backend resource shapes
//!
//! Decoded forms of the REST bodies the connector reads: full user objects,
//! lightweight list summaries, and the envelope that holds either.

use crate::{FollowGraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-relative path plus pagination query, e.g. `/users/x/following?page=2&per_page=10`
///
/// Two reads with equal addresses are the same logical read. The host and
/// the access credential are not part of the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path without any query string
    pub fn path(&self) -> &str {
        self.0.split_once('?').map_or(self.0.as_str(), |(path, _)| path)
    }

    /// Query string without the leading `?`, if any
    pub fn query(&self) -> Option<&str> {
        self.0.split_once('?').map(|(_, query)| query)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// GitHub user (REST API format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Backend-reported number of users this user follows
    #[serde(default)]
    pub following: Option<u32>,
}

/// Entry of a list response; carries at least the login handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub login: String,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Decoded backend response for one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEnvelope {
    Object(GitHubUser),
    List(Vec<UserSummary>),
}

impl ResourceEnvelope {
    /// Decode a response body: arrays become lists, objects become single resources
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        match value {
            serde_json::Value::Array(_) => Ok(Self::List(serde_json::from_value(value)?)),
            serde_json::Value::Object(_) => Ok(Self::Object(serde_json::from_value(value)?)),
            other => Err(FollowGraphError::Decode(format!(
                "expected JSON object or array, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Unwrap a single resource, failing with a decode error for lists
    pub fn into_user(self, address: &Address) -> Result<GitHubUser> {
        match self {
            Self::Object(user) => Ok(user),
            Self::List(_) => Err(FollowGraphError::Decode(format!(
                "expected a single resource at {}, got a list",
                address
            ))),
        }
    }

    /// Unwrap a list of summaries, failing with a decode error for single resources
    pub fn into_summaries(self, address: &Address) -> Result<Vec<UserSummary>> {
        match self {
            Self::List(items) => Ok(items),
            Self::Object(_) => Err(FollowGraphError::Decode(format!(
                "expected a list at {}, got a single resource",
                address
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

//! FollowGraph - a batched, paginated follow graph over the GitHub REST API
//!
//! FollowGraph resolves "who am I, and whom do I follow" for one configured
//! identity. Server side, every backend read goes through a batching cache so
//! concurrent reads of the same address cost a single request. Client side, a
//! normalized store pages the follow list in incrementally and applies follows
//! optimistically, rolling them back when the server refuses.
//!
//! # Architecture
//!
//! - **github**: Addresses, pagination, response shapes, and the HTTP fetcher
//! - **connector**: Ticket-table batching cache and follow-graph addresses
//! - **graph**: Resolvers and the query boundary (`self`, `following`, `follow`)
//! - **server**: axum HTTP surface for the query boundary
//! - **client**: Normalized store, incremental loader, optimistic mutations
//! - **config**: YAML configuration and validation
//! - **logging**: tracing subscriber setup

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Server side
pub mod connector;
pub mod github;
pub mod graph;
pub mod server;

// Client side
pub mod client;

// Re-exports
pub use error::{FollowGraphError, Result};

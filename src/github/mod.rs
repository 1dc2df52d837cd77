//! GitHub REST backend
//!
//! Leaves of the request pipeline:
//!
//! - **paginate**: page/per-page to query-string translation (pure)
//! - **types**: addresses and decoded response shapes
//! - **fetcher**: one network call per invocation, no deduplication

pub mod fetcher;
pub mod paginate;
pub mod types;

pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use paginate::paginate;
pub use types::{Address, GitHubUser, ResourceEnvelope, UserSummary};

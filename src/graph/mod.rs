//! Follow graph resolution
//!
//! Server-side implementation of the query boundary.
//!
//! - **resolver**: `self`, `self.following` fan-out, and `follow` over the connector
//! - **view**: serialized shapes returned across the boundary
//! - **boundary**: the [`QueryBoundary`] trait and its in-process implementation

mod boundary;
mod resolver;
mod view;

pub use boundary::{BoundResolver, QueryBoundary};
pub use resolver::GraphResolver;
pub use view::{UserNode, ViewerNode};

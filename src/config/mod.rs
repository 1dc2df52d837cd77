//! Configuration system
//!
//! Loads ~/.config/followgraph/config.yaml with:
//! - The fixed caller identity and its access credential
//! - Backend API root and credential placement
//! - HTTP surface settings

mod followgraph_config;
pub mod validation;

pub use followgraph_config::{CredentialPlacement, FollowGraphConfig, ServerConfig};
pub use validation::{check_login, validate_config, validate_config_result, ValidationError};

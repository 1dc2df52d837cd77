//! HTTP surface for the follow graph
//!
//! Exposes the query boundary over REST so remote clients can use it.
//!
//! # Routes
//!
//! - `GET /health` - Liveness check
//! - `GET /graphql/self?page=&perPage=` - The caller with one page of follows
//! - `GET /graphql/self/following?page=&perPage=` - One page of follows alone
//! - `POST /graphql/follow` - Follow a user (body: `{"login": "..."}`)
//!
//! Failures render as `{"error": "...", "kind": "..."}`: 400 for validation
//! errors, 502 when the backend could not be reached or answered badly, 500
//! otherwise.
//!
//! # Example
//!
//! ```no_run
//! use followgraph::config::FollowGraphConfig;
//! use followgraph::server::FollowServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = FollowGraphConfig::new("octocat");
//!     let server = FollowServer::new(&config).expect("Failed to create server");
//!     server.run("127.0.0.1:3001").await.expect("Server failed");
//! }
//! ```

use crate::client::remote::ErrorBody;
use crate::config::FollowGraphConfig;
use crate::connector::GitHubConnector;
use crate::github::HttpFetcher;
use crate::graph::{BoundResolver, GraphResolver, QueryBoundary, UserNode, ViewerNode};
use crate::{FollowGraphError, Result};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared server state
pub struct AppState {
    boundary: BoundResolver,
}

/// HTTP server bound to one caller identity
pub struct FollowServer {
    state: Arc<AppState>,
}

impl FollowServer {
    /// Build the full stack (fetcher, batching connector, resolver) from config
    pub fn new(config: &FollowGraphConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config)?;
        let connector = GitHubConnector::new(Arc::new(fetcher));
        let resolver = GraphResolver::new(connector, config.server.default_per_page);
        Ok(Self::with_boundary(BoundResolver::new(
            Arc::new(resolver),
            config.login.clone(),
        )))
    }

    pub fn with_boundary(boundary: BoundResolver) -> Self {
        Self {
            state: Arc::new(AppState { boundary }),
        }
    }

    pub fn router(&self) -> Router {
        Self::build_router(self.state.clone())
    }

    fn build_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/graphql/self", get(get_viewer))
            .route("/graphql/self/following", get(get_following))
            .route("/graphql/follow", post(follow))
            .with_state(state)
    }

    /// Run the server on the given address
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FollowGraphError::Server(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(
            addr = addr,
            identity = self.state.boundary.identity(),
            "Follow graph server listening"
        );

        axum::serve(listener, Self::build_router(self.state))
            .await
            .map_err(|e| FollowGraphError::Server(e.to_string()))
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Page arguments of the list fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    /// Missing login reads as blank and fails validation
    #[serde(default)]
    pub login: String,
}

fn status_for(err: &FollowGraphError) -> StatusCode {
    match err {
        FollowGraphError::Validation(_) => StatusCode::BAD_REQUEST,
        FollowGraphError::Transport(_)
        | FollowGraphError::Decode(_)
        | FollowGraphError::PartialFanout { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for FollowGraphError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::warn!(kind = self.kind(), error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
                kind: self.kind().to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_viewer(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ViewerNode>> {
    let viewer = state.boundary.viewer(query.page, query.per_page).await?;
    Ok(Json(viewer))
}

async fn get_following(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<UserNode>>> {
    let users = state.boundary.following(query.page, query.per_page).await?;
    Ok(Json(users))
}

async fn follow(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<FollowRequest>, JsonRejection>,
) -> Result<Json<UserNode>> {
    let Json(req) = payload.map_err(|e| FollowGraphError::Validation(e.body_text()))?;
    let user = state.boundary.follow(&req.login).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{Address, ResourceEnvelope, ResourceFetcher};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    /// Serves canned bodies by address; unknown addresses fail with HTTP 404
    struct CannedFetcher {
        bodies: HashMap<String, Value>,
    }

    #[async_trait]
    impl ResourceFetcher for CannedFetcher {
        async fn fetch(&self, address: &Address) -> Result<ResourceEnvelope> {
            match self.bodies.get(address.as_str()) {
                Some(body) => ResourceEnvelope::from_slice(body.to_string().as_bytes()),
                None => Err(FollowGraphError::Transport(format!(
                    "GitHub API error: HTTP 404 for {}",
                    address
                ))),
            }
        }

        async fn put(&self, _address: &Address) -> Result<()> {
            Ok(())
        }
    }

    fn create_test_server() -> FollowServer {
        let mut bodies = HashMap::new();
        bodies.insert(
            "/users/me".to_string(),
            json!({ "id": 1, "login": "me", "name": "Me", "following": 2 }),
        );
        bodies.insert(
            "/users/me/following?per_page=10".to_string(),
            json!([{ "login": "a" }, { "login": "b" }]),
        );
        bodies.insert(
            "/users/me/following?page=2&per_page=1".to_string(),
            json!([{ "login": "b" }]),
        );
        bodies.insert("/users/a".to_string(), json!({ "id": 2, "login": "a" }));
        bodies.insert("/users/b".to_string(), json!({ "id": 3, "login": "b" }));
        bodies.insert("/users/zed".to_string(), json!({ "id": 4, "login": "zed" }));

        let connector = GitHubConnector::new(Arc::new(CannedFetcher { bodies }));
        let resolver = GraphResolver::new(connector, 10);
        FollowServer::with_boundary(BoundResolver::new(Arc::new(resolver), "me"))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_viewer_endpoint() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/graphql/self")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["login"], "me");
        assert_eq!(json["followingCount"], 2);
        assert_eq!(json["followingTotal"], 2);
        assert_eq!(json["following"][0]["login"], "a");
        assert_eq!(json["following"][1]["id"], 3);
    }

    #[tokio::test]
    async fn test_following_endpoint_pages() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/graphql/self/following?page=2&perPage=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, json!([{ "id": 3, "login": "b", "name": null }]));
    }

    #[tokio::test]
    async fn test_follow_endpoint() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql/follow")
                    .header("Content-Type", "application/json")
                    .body(Body::from(json!({ "login": "zed" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], 4);
    }

    #[tokio::test]
    async fn test_blank_follow_is_bad_request() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql/follow")
                    .header("Content-Type", "application/json")
                    .body(Body::from(json!({ "login": "" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "validation");
    }

    #[tokio::test]
    async fn test_follow_without_login_is_bad_request() {
        for body in ["{}", "not json"] {
            let app = create_test_server().router();

            let response = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/graphql/follow")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(body_json(response).await["kind"], "validation");
        }
    }

    #[tokio::test]
    async fn test_backend_failure_is_bad_gateway() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql/follow")
                    .header("Content-Type", "application/json")
                    .body(Body::from(json!({ "login": "ghost" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["kind"], "transport");
    }

    #[test]
    fn test_status_mapping() {
        let fanout = FollowGraphError::PartialFanout {
            login: "b".to_string(),
            source: Box::new(FollowGraphError::Decode("bad".to_string())),
        };
        assert_eq!(status_for(&fanout), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&FollowGraphError::Config("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use super::{compare, dashboard, events, exceptions, rules};
use crate::config::ServerConfig;
use crate::middleware::request_logging;
use crate::store::MockStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MockStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = MockStore::seeded(&config, Utc::now());
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

/// Create the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route(
            "/api/exceptions",
            get(exceptions::list_exceptions).post(exceptions::post_exception_action),
        )
        .route(
            "/api/events",
            get(events::list_events).post(events::post_event_action),
        )
        .route(
            "/api/rules",
            get(rules::list_rules).post(rules::post_rule_action),
        )
        .route(
            "/api/compare",
            get(compare::get_compare).post(compare::post_compare_action),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

// ===== Action envelope =====

/// `{success, message, data}` returned by every accepted action.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ActionResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Acknowledgement payload for single-record status changes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAck<S> {
    pub id: i64,
    pub status: S,
    pub updated_at: DateTime<Utc>,
}

/// JSON body holding an `action`-tagged request.
///
/// Every rejection (unreadable body, malformed JSON, unknown action, missing
/// or mistyped fields) collapses into [`ApiError::InvalidAction`].
#[derive(Debug)]
pub struct ActionBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ActionBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            debug!(error = %err, "Unreadable action body");
            ApiError::InvalidAction
        })?;

        serde_json::from_slice(&bytes).map(ActionBody).map_err(|err| {
            debug!(error = %err, "Rejected action body");
            ApiError::InvalidAction
        })
    }
}

/// Query-string filters for the list endpoints.
///
/// A repeated key keeps its first value, so filter parameters never fail a
/// request the way a strict `Query<T>` would.
#[derive(Debug)]
pub struct FilterQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for FilterQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|err| {
                debug!(error = %err, "Unreadable query string");
                ApiError::InvalidAction
            })?;

        let mut first = Map::new();
        for (key, value) in pairs {
            first.entry(key).or_insert(Value::String(value));
        }

        serde_json::from_value(Value::Object(first))
            .map(FilterQuery)
            .map_err(|err| {
                debug!(error = %err, "Rejected query parameters");
                ApiError::InvalidAction
            })
    }
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    /// Unknown action, malformed body, or a transition the record cannot make.
    InvalidAction,
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidAction => (StatusCode::BAD_REQUEST, "Invalid action".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(ServerConfig {
            seed: Some(17),
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[derive(Debug, Default, serde::Deserialize)]
    struct StatusFilter {
        status: Option<String>,
        kind: Option<String>,
    }

    async fn filter_from(uri: &str) -> StatusFilter {
        let (mut parts, _) = Request::builder().uri(uri).body(Body::empty()).unwrap().into_parts();
        let FilterQuery(filter) = FilterQuery::<StatusFilter>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        filter
    }

    #[tokio::test]
    async fn test_repeated_query_key_keeps_first_value() {
        let filter = filter_from("/api/exceptions?status=pending&status=resolved&kind=a").await;
        assert_eq!(filter.status.as_deref(), Some("pending"));
        assert_eq!(filter.kind.as_deref(), Some("a"));

        let empty = filter_from("/api/exceptions").await;
        assert!(empty.status.is_none() && empty.kind.is_none());
    }

    #[tokio::test]
    async fn test_invalid_action_body() {
        let response = ApiError::InvalidAction.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"error": "Invalid action"}));
    }
}

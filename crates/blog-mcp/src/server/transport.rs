//! HTTP transport.
//!
//! Streamable HTTP for MCP: `POST /mcp` answers with one JSON document, an
//! SSE stream framed by `begin`/`end` events when several replies are due,
//! or `202 Accepted` when nothing needs a reply. `GET /mcp` is refused.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use futures::stream::Stream;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::auth::{Authenticated, McpPreconditions};
use super::jsonrpc::{self, Inbound, JsonRpcResponse};
use super::oauth::handlers;
use crate::config::protocol::SERVER_NAME;
use crate::error::{AuthError, AuthRejection, TransportError};
use crate::models::Identity;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // OAuth 2.1 endpoints
        .route(
            "/.well-known/oauth-protected-resource",
            get(handlers::handle_protected_resource),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::handle_auth_server_metadata),
        )
        .route("/oauth/authorize", get(handlers::handle_authorize))
        .route("/oauth/login", post(handlers::handle_login))
        .route("/oauth/token", post(handlers::handle_token))
        // Protected resources
        .route("/users/me", get(handle_me))
        .route("/mcp", post(handle_mcp_post).get(handle_mcp_get))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Profile of the authenticated caller.
async fn handle_me(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
) -> Response {
    match state.users.find_by_id(identity.user_id).await {
        Ok(Some(user)) => Json(user.profile()).into_response(),
        Ok(None) => AuthRejection {
            error: AuthError::UnknownSubject,
            resource_metadata: state.config.resource_metadata_url(),
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user profile");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handle POST requests to /mcp.
async fn handle_mcp_post(
    _: McpPreconditions,
    Authenticated(identity): Authenticated,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let messages = match jsonrpc::parse_payload(&body) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable MCP payload");
            return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::error(Value::Null, e)))
                .into_response();
        }
    };

    let expected = messages.iter().filter(|m| m.expects_response()).count();
    tracing::debug!(
        user_id = identity.user_id,
        elements = messages.len(),
        expected,
        "Handling MCP POST request"
    );

    match expected {
        0 => {
            state.processor.process_all(&identity, messages).await;
            StatusCode::ACCEPTED.into_response()
        }
        1 => match state.processor.process_all(&identity, messages).await.pop() {
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
        _ => Sse::new(batch_stream(state, identity, messages, expected)).into_response(),
    }
}

/// Replies to a batch as SSE events, flushed as each element completes.
fn batch_stream(
    state: Arc<AppState>,
    identity: Identity,
    messages: Vec<Inbound>,
    expected: usize,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    async_stream::stream! {
        yield Ok(Event::default().event("begin").data(json!({ "count": expected }).to_string()));

        let mut sent = 0usize;
        for message in messages {
            if let Some(response) = state.processor.process(&identity, message).await {
                sent += 1;
                yield Event::default().event("message").id(sent.to_string()).json_data(&response);
            }
        }

        yield Ok(Event::default().event("end").data(json!({ "count": sent }).to_string()));
    }
}

/// Server-initiated streams are not offered.
async fn handle_mcp_get(
    _: McpPreconditions,
    Authenticated(identity): Authenticated,
) -> Result<Response, TransportError> {
    tracing::debug!(user_id = identity.user_id, "Refusing server-initiated stream");
    Err(TransportError::StreamNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::McpServer;
    use crate::store::{MemoryPostStore, MemoryUserStore};
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    async fn app() -> (Router, String) {
        let users = Arc::new(MemoryUserStore::new());
        users.add_user("alice", "wonderland", None, None).await.unwrap();
        let server = McpServer::new(Config::for_testing(), users, Arc::new(MemoryPostStore::new()));
        let token =
            server.state().auth.token_issuer().mint("alice", &["read".to_string()]).unwrap();
        (server.router(), token)
    }

    fn mcp_post(token: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app().await;
        let resp = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_single_request_is_plain_json() {
        let (router, token) = app().await;
        let resp = router
            .oneshot(mcp_post(&token, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("application/json"));
    }

    #[tokio::test]
    async fn test_notification_only_is_accepted() {
        let (router, token) = app().await;
        let resp = router
            .oneshot(mcp_post(&token, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_parse_error_is_bad_request() {
        let (router, token) = app().await;
        let resp = router.oneshot(mcp_post(&token, "{oops")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let (router, token) = app().await;
        let req = Request::builder()
            .uri("/mcp")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ALLOW], "POST");
    }
}

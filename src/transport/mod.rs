// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Transport Module
 * SSE streams, JSON-RPC envelopes and request dispatch
 * © 2026 Bountyy Oy
 */

pub mod dispatch;
pub mod envelope;
pub mod sse;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::context::AppContext;
use crate::health;
use crate::monitoring::metrics_handler;

pub use dispatch::{submit, Submission};
pub use envelope::{RpcError, RpcRequest, RpcResponse};

/// Full bridge router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/sse", get(sse::open_stream).post(sse::submit_message))
        .route(sse::MESSAGES_PATH, post(sse::submit_message))
        .route("/tools", get(sse::list_tools))
        .route("/status", get(health::status_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::readiness_handler))
        .route("/health/live", get(health::liveness_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(ctx.clone(), cors))
        .with_state(ctx)
}

/// CORS headers per `ALLOWED_ORIGINS`; preflights are answered here
async fn cors(State(ctx): State<AppContext>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let allowed = if ctx.config.allows_any_origin() {
        Some("*".to_string())
    } else {
        origin.filter(|o| ctx.config.server.allowed_origins.iter().any(|a| a == o))
    };

    if let Some(value) = allowed.and_then(|o| HeaderValue::from_str(&o).ok()) {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization, Mcp-Session-Id"),
        );
    }

    response
}

// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SSE Transport
 * Stream endpoint (one session per connection) and message submission
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::errors::ErrorKind;
use crate::session::{CloseReason, SessionManager};
use crate::transport::dispatch::{self, Submission};
use crate::transport::envelope::RpcRequest;

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const MESSAGES_PATH: &str = "/mcp/messages";

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Session stream; closes its session when the client goes away
pub struct SessionStream {
    inner: EventStream,
    session_id: String,
    sessions: Arc<SessionManager>,
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.sessions.close(&self.session_id, CloseReason::Disconnect);
    }
}

/// GET /sse
pub async fn open_stream(State(ctx): State<AppContext>) -> Sse<SessionStream> {
    let handle = ctx.sessions.create();
    let endpoint = format!("{}?session_id={}", MESSAGES_PATH, handle.id);
    debug!(session_id = %handle.id, "Stream opened");

    let announce = stream::once(async move {
        Ok::<Event, Infallible>(Event::default().event("endpoint").data(endpoint))
    });
    let messages = ReceiverStream::new(handle.receiver)
        .map(|frame| Ok::<Event, Infallible>(Event::default().event("message").data(frame)));

    let stream = SessionStream {
        inner: Box::pin(announce.chain(messages)),
        session_id: handle.id,
        sessions: Arc::clone(&ctx.sessions),
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(ctx.config.session.keepalive())
            .event(Event::default().event("ping").data("{}")),
    )
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// POST /mcp/messages (and POST /sse)
pub async fn submit_message(
    State(ctx): State<AppContext>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        });

    let Some(session_id) = session_id else {
        return rejection(
            StatusCode::BAD_REQUEST,
            "session_id is required",
            ErrorKind::InvalidRequest,
        );
    };

    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(session_id = %session_id, "Malformed request body: {}", e);
            return rejection(
                StatusCode::BAD_REQUEST,
                &format!("Invalid JSON-RPC request: {}", e),
                ErrorKind::InvalidRequest,
            );
        }
    };

    match dispatch::submit(&ctx, &session_id, request).await {
        Ok(Submission::Accepted { .. }) => {
            (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response()
        }
        Ok(Submission::Rejected { status, body }) => (status, Json(body)).into_response(),
        Err(e) => {
            debug!(session_id = %session_id, "Submit for unusable session: {}", e);
            rejection(StatusCode::NOT_FOUND, &e.to_string(), e.kind())
        }
    }
}

fn rejection(status: StatusCode, message: &str, kind: ErrorKind) -> Response {
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
}

/// GET /tools
pub async fn list_tools(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(json!({
        "tools": ctx.catalog.names(),
        "count": ctx.catalog.count(),
    }))
}

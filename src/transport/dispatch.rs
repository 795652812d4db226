// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Request Dispatch
 * Routes JSON-RPC requests to protocol handlers and tools; every
 * response goes back on the session's stream
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use axum::http::StatusCode;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::errors::{rpc_codes, BridgeError, ErrorKind, SessionError};
use crate::recovery::{self, Recovery, FREE_TEXT_FIELD};
use crate::registry::RegisteredTool;
use crate::transport::envelope::{RpcRequest, RpcResponse};

/// What the submit endpoint answers with; the real response goes on the stream
#[derive(Debug)]
pub enum Submission {
    Accepted { task: Option<JoinHandle<()>> },
    Rejected { status: StatusCode, body: Value },
}

/// Handle one inbound request for `session_id`.
///
/// Fails only when the session is unknown or closed.
pub async fn submit(
    ctx: &AppContext,
    session_id: &str,
    request: RpcRequest,
) -> Result<Submission, SessionError> {
    ctx.sessions.touch(session_id)?;

    if let Some(text) = recovery::context_from_messages(request.params()) {
        ctx.sessions.record_context(session_id, &text);
    }

    let method = match request.method.as_deref() {
        Some(method) => method,
        None => {
            if !request.is_notification() {
                let error = BridgeError::InvalidRequest("missing method".to_string());
                respond(ctx, session_id, RpcResponse::from_error(request.response_id(), &error)).await;
            }
            return Ok(Submission::Accepted { task: None });
        }
    };

    debug!(session_id = %session_id, method = %method, request_id = %request.response_id(), "Request received");

    let response = match method {
        "initialize" => Some(RpcResponse::success(request.response_id(), initialize_result(&request))),
        "ping" => Some(RpcResponse::success(request.response_id(), json!({}))),
        "tools/list" | "mcp/listTools" => Some(RpcResponse::success(
            request.response_id(),
            json!({ "tools": ctx.catalog.listings() }),
        )),
        "mcp/listOfferings" => Some(RpcResponse::success(
            request.response_id(),
            json!({
                "tools": ctx.catalog.listings(),
                "resources": [],
                "prompts": [],
            }),
        )),
        "tools/call" | "mcp/callTool" => return call_tool(ctx, session_id, &request).await,
        m if m.starts_with("notifications/") => {
            debug!(session_id = %session_id, method = %m, "Notification acknowledged");
            None
        }
        m => {
            let error = BridgeError::MethodNotFound(m.to_string());
            Some(RpcResponse::from_error(request.response_id(), &error))
        }
    };

    if let Some(response) = response {
        if !request.is_notification() {
            respond(ctx, session_id, response).await;
        }
    }

    Ok(Submission::Accepted { task: None })
}

fn initialize_result(request: &RpcRequest) -> Value {
    let params = request.params();
    let protocol_version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or(crate::PROTOCOL_VERSION);
    let client = params
        .pointer("/clientInfo/name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    info!(protocol_version, client, "Client initializing");

    json!({
        "protocolVersion": crate::PROTOCOL_VERSION,
        "name": crate::SERVER_NAME,
        "instructions": "MCP server exposing OWASP ZAP security scanning as tools",
        "serverInfo": {
            "name": crate::SERVER_NAME,
            "version": crate::VERSION,
        },
        "capabilities": {
            "tools": { "supportsStreaming": false, "supportsProgress": false },
            "resources": { "supportsStreaming": false },
            "prompts": { "supported": false },
        },
    })
}

async fn call_tool(
    ctx: &AppContext,
    session_id: &str,
    request: &RpcRequest,
) -> Result<Submission, SessionError> {
    let id = request.response_id();
    let params = request.params();

    let name = match params.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => {
            let mut response = RpcResponse::error(
                id,
                rpc_codes::INVALID_PARAMS,
                "Invalid params: tool name is required",
            );
            if let Some(err) = response.error.as_mut() {
                err.data = Some(json!({ "kind": ErrorKind::InvalidRequest }));
            }
            respond(ctx, session_id, response).await;
            return Ok(Submission::Accepted { task: None });
        }
    };

    let tool = match ctx.catalog.resolve(name) {
        Ok(tool) => tool,
        Err(e) => {
            warn!(session_id = %session_id, tool = %name, "Unknown tool requested");
            ctx.metrics.record_tool_invocation(name, "not_found", std::time::Duration::ZERO);
            let error: BridgeError = e.into();
            let response = RpcResponse::from_error(id, &error);
            let body = serde_json::to_value(&response).unwrap_or(Value::Null);
            respond(ctx, session_id, response).await;
            return Ok(Submission::Rejected {
                status: StatusCode::NOT_FOUND,
                body,
            });
        }
    };

    let raw = raw_arguments(params.get("arguments"));

    // Context from earlier requests; this request's own text is recorded after.
    let recent_context = ctx.sessions.recent_context(session_id);
    if let Some(text) = recovery::free_text(&raw, tool.handler.category()) {
        ctx.sessions.record_context(session_id, &text);
    }

    let pending = ctx.sessions.begin_request(session_id)?;
    let task_ctx = ctx.clone();
    let session = session_id.to_string();

    let task = tokio::spawn(async move {
        let _pending = pending;
        let tool_name = tool.descriptor.name.clone();
        let worker = tokio::spawn(execute_tool(
            task_ctx.clone(),
            Arc::clone(&tool),
            id.clone(),
            raw,
            recent_context,
        ));

        let response = match worker.await {
            Ok(response) => response,
            Err(join_error) => {
                error!(
                    session_id = %session,
                    tool = %tool_name,
                    request_id = %id,
                    "Tool handler crashed: {}",
                    join_error
                );
                task_ctx.metrics.record_tool_invocation(&tool_name, "crashed", std::time::Duration::ZERO);
                let error = BridgeError::ToolExecutionFailed(join_error.to_string());
                RpcResponse::from_error(id, &error)
            }
        };

        respond(&task_ctx, &session, response).await;
    });

    Ok(Submission::Accepted { task: Some(task) })
}

/// Recover arguments, run the handler and frame the outcome
async fn execute_tool(
    ctx: AppContext,
    tool: Arc<RegisteredTool>,
    id: Value,
    raw: Map<String, Value>,
    recent_context: Option<String>,
) -> RpcResponse {
    let name = tool.descriptor.name.as_str();
    let start = Instant::now();

    let args = match recovery::recover(name, tool.handler.category(), &raw, recent_context.as_deref()) {
        Recovery::Recovered(args) => args,
        Recovery::Unrecoverable { parameter } => {
            ctx.metrics.record_recovery(&parameter, "unrecoverable", None);
            ctx.metrics.record_tool_invocation(name, "unrecoverable", start.elapsed());
            let error = BridgeError::ArgumentUnrecoverable {
                tool: name.to_string(),
                parameter,
            };
            info!(tool = name, request_id = %id, "{}", error);
            return RpcResponse::from_error(id, &error);
        }
    };

    for (parameter, provenance) in &args.provenance {
        ctx.metrics
            .record_recovery(parameter, provenance.label(), provenance.rule());
    }

    let result = tool.handler.invoke(&ctx.client, &args).await;
    let outcome = if result.success { "success" } else { "failure" };
    ctx.metrics.record_tool_invocation(name, outcome, start.elapsed());
    info!(
        tool = name,
        request_id = %id,
        outcome = outcome,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Tool call finished"
    );

    RpcResponse::success(id, result.into_call_result())
}

/// Normalize `arguments`: objects pass through, a bare string becomes free text
fn raw_arguments(arguments: Option<&Value>) -> Map<String, Value> {
    match arguments {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) => {
            let mut map = Map::new();
            map.insert(FREE_TEXT_FIELD.to_string(), Value::String(text.clone()));
            map
        }
        _ => Map::new(),
    }
}

/// Push a response; a vanished session only costs a warning
async fn respond(ctx: &AppContext, session_id: &str, response: RpcResponse) {
    if let Err(e) = ctx.sessions.push(session_id, response.to_frame()).await {
        warn!(session_id = %session_id, request_id = %response.id, "Response dropped: {}", e);
        ctx.metrics.record_envelope_dropped();
    }
}

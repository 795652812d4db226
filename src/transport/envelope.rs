// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! JSON-RPC 2.0 envelopes carried on the stream.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::BridgeError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Inbound request. A missing `id` makes it a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.as_ref().map_or(true, Value::is_null)
    }

    /// Request id echoed in the response; `null` for notifications
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    pub fn params(&self) -> &Value {
        static EMPTY: Value = Value::Null;
        self.params.as_ref().unwrap_or(&EMPTY)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outbound envelope: exactly one of `result` or `error` is set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Error envelope carrying the error kind (and parameter, if any) in `data`
    pub fn from_error(id: Value, error: &BridgeError) -> Self {
        let mut data = json!({ "kind": error.kind() });
        if let Some(parameter) = error.parameter() {
            data["parameter"] = json!(parameter);
        }

        let mut response = Self::error(id, error.rpc_code(), error.to_string());
        if let Some(err) = response.error.as_mut() {
            err.data = Some(data);
        }
        response
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// One complete serialized envelope, ready for a single stream write
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":-32000,"message":"Failed to serialize response: {}"}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Bridge Error Types
 * Error taxonomy for the ZAP MCP bridge, built on thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// JSON-RPC error codes used on the stream.
pub mod rpc_codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const SERVER_ERROR: i64 = -32000;
}

/// Machine-checkable error kind carried in every error envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BackendUnreachable,
    BackendProtocolError,
    BackendRejected,
    ArgumentUnrecoverable,
    ToolNotFound,
    DuplicateTool,
    SessionNotFound,
    SessionClosed,
    ToolExecutionFailed,
    InvalidRequest,
    MethodNotFound,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BackendUnreachable => "BackendUnreachable",
            ErrorKind::BackendProtocolError => "BackendProtocolError",
            ErrorKind::BackendRejected => "BackendRejected",
            ErrorKind::ArgumentUnrecoverable => "ArgumentUnrecoverable",
            ErrorKind::ToolNotFound => "ToolNotFound",
            ErrorKind::DuplicateTool => "DuplicateTool",
            ErrorKind::SessionNotFound => "SessionNotFound",
            ErrorKind::SessionClosed => "SessionClosed",
            ErrorKind::ToolExecutionFailed => "ToolExecutionFailed",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::Configuration => "Configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by the ZAP API client. Every call is single-attempt.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("ZAP unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("ZAP request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Unexpected response from ZAP {endpoint}: {reason}")]
    Protocol { endpoint: String, reason: String },

    #[error("ZAP rejected {endpoint}: {message} ({code})")]
    Rejected {
        endpoint: String,
        code: String,
        message: String,
    },
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Unreachable { .. } | BackendError::Timeout { .. } => {
                ErrorKind::BackendUnreachable
            }
            BackendError::Protocol { .. } => ErrorKind::BackendProtocolError,
            BackendError::Rejected { .. } => ErrorKind::BackendRejected,
        }
    }

    pub fn protocol(endpoint: &str, reason: impl Into<String>) -> Self {
        BackendError::Protocol {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify a transport-level reqwest failure for `endpoint`.
    pub fn from_reqwest(endpoint: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            }
        } else if err.is_connect() || err.is_request() {
            BackendError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        } else if err.is_decode() || err.is_body() {
            BackendError::Protocol {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        } else {
            BackendError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Tool catalog errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            CatalogError::DuplicateTool(_) => ErrorKind::DuplicateTool,
        }
    }
}

/// Session manager errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session '{0}' not found")]
    NotFound(String),

    #[error("Session '{0}' is closed")]
    Closed(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound(_) => ErrorKind::SessionNotFound,
            SessionError::Closed(_) => ErrorKind::SessionClosed,
        }
    }
}

/// Umbrella error crossing the dispatch boundary
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Could not determine '{parameter}' for {tool}; pass it explicitly (e.g. {{\"{parameter}\": ...}}) or mention it in the request text")]
    ArgumentUnrecoverable { tool: String, parameter: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Backend(e) => e.kind(),
            BridgeError::Catalog(e) => e.kind(),
            BridgeError::Session(e) => e.kind(),
            BridgeError::ArgumentUnrecoverable { .. } => ErrorKind::ArgumentUnrecoverable,
            BridgeError::ToolExecutionFailed(_) => ErrorKind::ToolExecutionFailed,
            BridgeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BridgeError::MethodNotFound(_) => ErrorKind::MethodNotFound,
            BridgeError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// JSON-RPC error code for this failure
    pub fn rpc_code(&self) -> i64 {
        match self.kind() {
            ErrorKind::InvalidRequest => rpc_codes::INVALID_REQUEST,
            ErrorKind::MethodNotFound => rpc_codes::METHOD_NOT_FOUND,
            ErrorKind::ToolNotFound | ErrorKind::ArgumentUnrecoverable => {
                rpc_codes::INVALID_PARAMS
            }
            _ => rpc_codes::SERVER_ERROR,
        }
    }

    /// Parameter that recovery failed on, if any
    pub fn parameter(&self) -> Option<&str> {
        match self {
            BridgeError::ArgumentUnrecoverable { parameter, .. } => Some(parameter),
            _ => None,
        }
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_kinds() {
        let timeout = BackendError::Timeout {
            endpoint: "/JSON/core/view/version/".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.kind(), ErrorKind::BackendUnreachable);

        let rejected = BackendError::Rejected {
            endpoint: "/JSON/spider/action/scan/".to_string(),
            code: "url_not_found".to_string(),
            message: "URL Not Found in the Scan Tree".to_string(),
        };
        assert_eq!(rejected.kind(), ErrorKind::BackendRejected);
        assert!(rejected.to_string().contains("url_not_found"));

        let protocol = BackendError::protocol("/JSON/spider/view/status/", "missing field 'status'");
        assert_eq!(protocol.kind(), ErrorKind::BackendProtocolError);
    }

    #[test]
    fn test_bridge_error_codes() {
        let not_found: BridgeError = CatalogError::ToolNotFound("nope".to_string()).into();
        assert_eq!(not_found.kind(), ErrorKind::ToolNotFound);
        assert_eq!(not_found.rpc_code(), rpc_codes::INVALID_PARAMS);

        let method = BridgeError::MethodNotFound("resources/list".to_string());
        assert_eq!(method.rpc_code(), rpc_codes::METHOD_NOT_FOUND);

        let failed = BridgeError::ToolExecutionFailed("panicked".to_string());
        assert_eq!(failed.rpc_code(), rpc_codes::SERVER_ERROR);
    }

    #[test]
    fn test_unrecoverable_names_parameter() {
        let err = BridgeError::ArgumentUnrecoverable {
            tool: "zap_spider_scan".to_string(),
            parameter: "url".to_string(),
        };
        assert_eq!(err.parameter(), Some("url"));
        assert!(err.to_string().contains("'url'"));
        assert_eq!(err.kind().as_str(), "ArgumentUnrecoverable");
    }

    #[test]
    fn test_error_kind_serializes_pascal_case() {
        let json = serde_json::to_string(&ErrorKind::SessionNotFound).unwrap();
        assert_eq!(json, "\"SessionNotFound\"");
    }
}

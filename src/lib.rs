// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - ZAP MCP Bridge Library
 * Exposes the OWASP ZAP REST API as MCP tools over SSE
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod config;
pub mod context;
pub mod errors;
pub mod health;
pub mod http_client;
pub mod monitoring;
pub mod recovery;
pub mod registry;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use context::AppContext;
pub use transport::create_router;

/// Name reported in `initialize` and `/status`
pub const SERVER_NAME: &str = "owasp-zap-mcp";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol revision spoken on the stream
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - ZAP Tool Handlers
 * Closed set of tool handlers driving the ZAP API
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::errors::{BridgeError, ErrorKind};
use crate::http_client::ZapClient;
use crate::recovery::{RecoveredArguments, TargetUrl, ToolCategory, DEFAULT_MAX_DEPTH};
use crate::types::{truncate_chars, Alert, RiskLevel};

/// Alerts shown per `zap_get_alerts` call
pub const MAX_DISPLAYED_ALERTS: usize = 10;
/// Characters kept from alert descriptions and solutions
pub const ALERT_TEXT_LIMIT: usize = 200;
/// Characters of the HTML report echoed back
pub const REPORT_PREVIEW_LIMIT: usize = 500;

/// Every tool the bridge exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolHandler {
    HealthCheck,
    SpiderScan,
    ActiveScan,
    SpiderStatus,
    ActiveScanStatus,
    GetAlerts,
    HtmlReport,
    JsonReport,
    ClearSession,
    ScanSummary,
}

impl ToolHandler {
    pub const ALL: [ToolHandler; 10] = [
        ToolHandler::HealthCheck,
        ToolHandler::SpiderScan,
        ToolHandler::ActiveScan,
        ToolHandler::SpiderStatus,
        ToolHandler::ActiveScanStatus,
        ToolHandler::GetAlerts,
        ToolHandler::HtmlReport,
        ToolHandler::JsonReport,
        ToolHandler::ClearSession,
        ToolHandler::ScanSummary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolHandler::HealthCheck => "zap_health_check",
            ToolHandler::SpiderScan => "zap_spider_scan",
            ToolHandler::ActiveScan => "zap_active_scan",
            ToolHandler::SpiderStatus => "zap_spider_status",
            ToolHandler::ActiveScanStatus => "zap_active_scan_status",
            ToolHandler::GetAlerts => "zap_get_alerts",
            ToolHandler::HtmlReport => "zap_generate_html_report",
            ToolHandler::JsonReport => "zap_generate_json_report",
            ToolHandler::ClearSession => "zap_clear_session",
            ToolHandler::ScanSummary => "zap_scan_summary",
        }
    }

    /// Which arguments recovery must produce for this handler
    pub fn category(&self) -> ToolCategory {
        match self {
            ToolHandler::SpiderScan => ToolCategory::Target {
                depth: true,
                policy: false,
            },
            ToolHandler::ActiveScan => ToolCategory::Target {
                depth: false,
                policy: true,
            },
            ToolHandler::ScanSummary => ToolCategory::Target {
                depth: false,
                policy: false,
            },
            ToolHandler::SpiderStatus | ToolHandler::ActiveScanStatus => ToolCategory::ScanId,
            ToolHandler::GetAlerts => ToolCategory::RiskFilter,
            ToolHandler::HealthCheck
            | ToolHandler::HtmlReport
            | ToolHandler::JsonReport
            | ToolHandler::ClearSession => ToolCategory::NoArguments,
        }
    }

    /// Run the tool. Backend and argument failures come back as `success: false`.
    pub async fn invoke(&self, client: &ZapClient, args: &RecoveredArguments) -> BackendOperationResult {
        let result = match self {
            ToolHandler::HealthCheck => health_check(client).await,
            ToolHandler::SpiderScan => spider_scan(client, args).await,
            ToolHandler::ActiveScan => active_scan(client, args).await,
            ToolHandler::SpiderStatus => spider_status(client, args).await,
            ToolHandler::ActiveScanStatus => active_scan_status(client, args).await,
            ToolHandler::GetAlerts => get_alerts(client, args).await,
            ToolHandler::HtmlReport => html_report(client).await,
            ToolHandler::JsonReport => json_report(client).await,
            ToolHandler::ClearSession => clear_session(client).await,
            ToolHandler::ScanSummary => scan_summary(client, args).await,
        };

        match result {
            Ok(payload) => BackendOperationResult::success(payload),
            Err(failure) => {
                warn!(tool = self.name(), kind = %failure.error.kind(), "{}", failure.error);
                BackendOperationResult::failure(&failure.error, &failure.context, failure.extra)
            }
        }
    }
}

/// Result of one tool call, before it is framed for the protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendOperationResult {
    pub success: bool,
    pub payload: Value,
}

impl BackendOperationResult {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    /// `{"success": false, "error": .., "kind": ..}` plus any `extra` fields
    pub fn failure(error: &BridgeError, context: &str, extra: Option<Value>) -> Self {
        let mut payload = json!({
            "success": false,
            "error": format!("{}: {}", context, error),
            "kind": error.kind(),
        });
        if let Some(parameter) = error.parameter() {
            payload["parameter"] = json!(parameter);
        }
        if let (Some(Value::Object(extra)), Some(map)) = (extra, payload.as_object_mut()) {
            for (key, value) in extra {
                map.entry(key).or_insert(value);
            }
        }
        Self {
            success: false,
            payload,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.payload
            .get("kind")
            .and_then(|k| serde_json::from_value(k.clone()).ok())
    }

    /// MCP `tools/call` result: the payload as JSON text content
    pub fn into_call_result(self) -> Value {
        let text = serde_json::to_string(&self.payload).unwrap_or_else(|_| "{}".to_string());
        json!({
            "content": [{ "type": "text", "text": text }],
            "isError": !self.success,
        })
    }
}

struct ToolFailure {
    context: String,
    error: BridgeError,
    extra: Option<Value>,
}

type ToolOutcome = Result<Value, ToolFailure>;

fn fail(context: &str, error: impl Into<BridgeError>) -> ToolFailure {
    ToolFailure {
        context: context.to_string(),
        error: error.into(),
        extra: None,
    }
}

fn missing(tool: ToolHandler, parameter: &str) -> ToolFailure {
    fail(
        "Missing argument",
        BridgeError::ArgumentUnrecoverable {
            tool: tool.name().to_string(),
            parameter: parameter.to_string(),
        },
    )
}

fn target(tool: ToolHandler, args: &RecoveredArguments) -> Result<&TargetUrl, ToolFailure> {
    args.url.as_ref().ok_or_else(|| missing(tool, "url"))
}

fn scan_id(tool: ToolHandler, args: &RecoveredArguments) -> Result<&str, ToolFailure> {
    args.scan_id.as_deref().ok_or_else(|| missing(tool, "scan_id"))
}

async fn health_check(client: &ZapClient) -> ToolOutcome {
    match client.health_check().await {
        Ok(version) => Ok(json!({
            "success": true,
            "message": "ZAP is running and accessible",
            "status": "healthy",
            "version": version,
        })),
        Err(e) => Err(ToolFailure {
            context: "ZAP health check failed".to_string(),
            error: e.into(),
            extra: Some(json!({ "status": "unhealthy" })),
        }),
    }
}

async fn spider_scan(client: &ZapClient, args: &RecoveredArguments) -> ToolOutcome {
    let target = target(ToolHandler::SpiderScan, args)?;
    let max_depth = args.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);

    let scan_id = client
        .start_spider(&target.url, max_depth)
        .await
        .map_err(|e| fail("Failed to start spider scan", e))?;

    info!(url = %target.url, scan_id = %scan_id, max_depth, "Spider scan started");
    Ok(json!({
        "success": true,
        "message": format!("Spider scan started for {}", target.url),
        "scan_id": scan_id,
        "url": target.url,
        "original_url": target.original,
        "max_depth": max_depth,
    }))
}

async fn active_scan(client: &ZapClient, args: &RecoveredArguments) -> ToolOutcome {
    let target = target(ToolHandler::ActiveScan, args)?;

    let scan_id = client
        .start_active_scan(&target.url, args.scan_policy.as_deref())
        .await
        .map_err(|e| fail("Failed to start active scan", e))?;

    info!(url = %target.url, scan_id = %scan_id, "Active scan started");
    Ok(json!({
        "success": true,
        "message": format!("Active scan started for {}", target.url),
        "scan_id": scan_id,
        "url": target.url,
        "original_url": target.original,
        "scan_policy": args.scan_policy,
    }))
}

async fn spider_status(client: &ZapClient, args: &RecoveredArguments) -> ToolOutcome {
    let id = scan_id(ToolHandler::SpiderStatus, args)?;
    let progress = client
        .spider_status(id)
        .await
        .map_err(|e| fail("Failed to get spider scan status", e))?;

    Ok(json!({
        "success": true,
        "scan_id": id,
        "status": progress.status,
        "progress": progress.progress,
        "message": format!("Spider scan {}: {} ({}% complete)", id, progress.status, progress.progress),
    }))
}

async fn active_scan_status(client: &ZapClient, args: &RecoveredArguments) -> ToolOutcome {
    let id = scan_id(ToolHandler::ActiveScanStatus, args)?;
    let progress = client
        .active_scan_status(id)
        .await
        .map_err(|e| fail("Failed to get active scan status", e))?;

    Ok(json!({
        "success": true,
        "scan_id": id,
        "status": progress.status,
        "progress": progress.progress,
        "message": format!("Active scan {}: {} ({}% complete)", id, progress.status, progress.progress),
    }))
}

fn alert_summary(alert: &Alert) -> Value {
    json!({
        "name": alert.name,
        "risk": alert.risk,
        "confidence": alert.confidence,
        "url": alert.url,
        "description": truncate_chars(&alert.description, ALERT_TEXT_LIMIT),
        "solution": truncate_chars(&alert.solution, ALERT_TEXT_LIMIT),
    })
}

async fn get_alerts(client: &ZapClient, args: &RecoveredArguments) -> ToolOutcome {
    let alerts = client
        .alerts(args.risk_level)
        .await
        .map_err(|e| fail("Failed to get alerts", e))?;
    let risk_filter = args.risk_level.map(|r| r.as_str());

    if alerts.is_empty() {
        return Ok(json!({
            "success": true,
            "message": "No security alerts found",
            "total_alerts": 0,
            "displayed_alerts": 0,
            "risk_filter": risk_filter,
            "alerts": [],
        }));
    }

    let displayed: Vec<Value> = alerts
        .iter()
        .take(MAX_DISPLAYED_ALERTS)
        .map(alert_summary)
        .collect();

    let mut message = format!("Found {} security alerts", alerts.len());
    if alerts.len() > MAX_DISPLAYED_ALERTS {
        message.push_str(&format!(" (showing first {})", MAX_DISPLAYED_ALERTS));
    }

    Ok(json!({
        "success": true,
        "total_alerts": alerts.len(),
        "displayed_alerts": displayed.len(),
        "risk_filter": risk_filter,
        "alerts": displayed,
        "message": message,
    }))
}

async fn html_report(client: &ZapClient) -> ToolOutcome {
    let report = client
        .html_report()
        .await
        .map_err(|e| fail("Failed to generate HTML report", e))?;

    Ok(json!({
        "success": true,
        "message": "HTML report generated successfully",
        "report_length": report.chars().count(),
        "report_preview": truncate_chars(&report, REPORT_PREVIEW_LIMIT),
    }))
}

async fn json_report(client: &ZapClient) -> ToolOutcome {
    let report = client
        .json_report()
        .await
        .map_err(|e| fail("Failed to generate JSON report", e))?;

    Ok(json!({
        "success": true,
        "message": format!("JSON report generated with {} alerts", report.total_alerts),
        "report": report,
    }))
}

async fn clear_session(client: &ZapClient) -> ToolOutcome {
    client
        .clear_session()
        .await
        .map_err(|e| fail("Failed to clear session", e))?;

    Ok(json!({
        "success": true,
        "message": "ZAP session cleared successfully",
    }))
}

async fn scan_summary(client: &ZapClient, args: &RecoveredArguments) -> ToolOutcome {
    let target = target(ToolHandler::ScanSummary, args)?;
    let alerts = client
        .alerts(None)
        .await
        .map_err(|e| fail("Failed to get scan summary", e))?;

    let matching: Vec<&Alert> = alerts
        .iter()
        .filter(|a| {
            a.url.contains(&target.url)
                || target
                    .original
                    .as_deref()
                    .is_some_and(|original| a.url.contains(original))
        })
        .collect();

    let mut risk_summary: BTreeMap<&'static str, usize> =
        RiskLevel::ALL.iter().map(|r| (r.as_str(), 0)).collect();
    for alert in &matching {
        if let Some(level) = RiskLevel::ALL.iter().find(|r| r.matches(&alert.risk)) {
            *risk_summary.entry(level.as_str()).or_insert(0) += 1;
        }
    }

    let message = if matching.is_empty() {
        format!("No security issues found for {}", target.url)
    } else {
        format!("Security summary for {}: {} total issues", target.url, matching.len())
    };

    Ok(json!({
        "success": true,
        "url": target.url,
        "original_url": target.original,
        "total_issues": matching.len(),
        "risk_summary": risk_summary,
        "message": message,
    }))
}

// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::config::BackendConfig;
use crate::errors::{BackendError, BackendResult};
use crate::monitoring::MetricsCollector;
use crate::types::{count_by_risk, Alert, JsonReport, ReportScanInfo, RiskLevel, ScanProgress};

/// HTML reports of large sites run well past an alert list
const REPORT_BODY_MULTIPLIER: usize = 5;

const DEFAULT_POOL_MAX_IDLE_TIMEOUT: u64 = 90;

/// Worker threads ZAP is told to use for spider and active scans
const SCAN_THREADS: u32 = 10;

const API_KEY_HEADER: &str = "X-ZAP-API-Key";

mod endpoints {
    pub const VERSION: &str = "/JSON/core/view/version/";
    pub const SPIDER_MAX_DEPTH: &str = "/JSON/spider/action/setOptionMaxDepth/";
    pub const SPIDER_THREADS: &str = "/JSON/spider/action/setOptionThreadCount/";
    pub const SPIDER_SCAN: &str = "/JSON/spider/action/scan/";
    pub const SPIDER_STATUS: &str = "/JSON/spider/view/status/";
    pub const ASCAN_THREADS: &str = "/JSON/ascan/action/setOptionThreadPerHost/";
    pub const ASCAN_SCAN: &str = "/JSON/ascan/action/scan/";
    pub const ASCAN_STATUS: &str = "/JSON/ascan/view/status/";
    pub const ALERTS: &str = "/JSON/core/view/alerts/";
    pub const HTML_REPORT: &str = "/OTHER/core/other/htmlreport/";
    pub const NEW_SESSION: &str = "/JSON/core/action/newSession/";
}

/// Which timeout budget a call runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Status,
    Scan,
    Report,
}

/// Single-attempt client for the ZAP REST API.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct ZapClient {
    client: Arc<Client>,
    base_url: Url,
    api_key: Option<String>,
    status_timeout: Duration,
    scan_timeout: Duration,
    report_timeout: Duration,
    max_body_size: usize,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ZapClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid ZAP base URL: {}", config.base_url))?;
        // Endpoints join relative to the base, so a gateway prefix like /zap must end in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        // No client-wide timeout: every request sets its own
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(DEFAULT_POOL_MAX_IDLE_TIMEOUT))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .user_agent(concat!("zap-mcp-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key: config.api_key.clone(),
            status_timeout: config.status_timeout(),
            scan_timeout: config.scan_timeout(),
            report_timeout: config.report_timeout(),
            max_body_size: config.max_body_bytes,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn body_limit_for(&self, class: TimeoutClass) -> usize {
        match class {
            TimeoutClass::Report => self.max_body_size.saturating_mul(REPORT_BODY_MULTIPLIER),
            TimeoutClass::Status | TimeoutClass::Scan => self.max_body_size,
        }
    }

    fn timeout_for(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Status => self.status_timeout,
            TimeoutClass::Scan => self.scan_timeout,
            TimeoutClass::Report => self.report_timeout,
        }
    }

    /// ZAP version string; doubles as the backend health check
    pub async fn version(&self) -> BackendResult<String> {
        let body = self
            .get_json(endpoints::VERSION, &[], TimeoutClass::Status)
            .await?;
        field_string(&body, endpoints::VERSION, "version")
    }

    pub async fn health_check(&self) -> BackendResult<String> {
        let version = self.version().await?;
        debug!(version = %version, "ZAP health check passed");
        Ok(version)
    }

    /// Configure the spider and start it. Returns the scan id.
    pub async fn start_spider(&self, target: &str, max_depth: u32) -> BackendResult<String> {
        self.get_json(
            endpoints::SPIDER_MAX_DEPTH,
            &[("Integer", max_depth.to_string())],
            TimeoutClass::Scan,
        )
        .await?;
        self.get_json(
            endpoints::SPIDER_THREADS,
            &[("Integer", SCAN_THREADS.to_string())],
            TimeoutClass::Scan,
        )
        .await?;

        let body = self
            .get_json(
                endpoints::SPIDER_SCAN,
                &[("url", target.to_string())],
                TimeoutClass::Scan,
            )
            .await?;
        field_string(&body, endpoints::SPIDER_SCAN, "scan")
    }

    pub async fn spider_status(&self, scan_id: &str) -> BackendResult<ScanProgress> {
        self.scan_status(endpoints::SPIDER_STATUS, scan_id).await
    }

    /// Start an active scan, optionally under a named scan policy. Returns the scan id.
    pub async fn start_active_scan(
        &self,
        target: &str,
        scan_policy: Option<&str>,
    ) -> BackendResult<String> {
        self.get_json(
            endpoints::ASCAN_THREADS,
            &[("Integer", SCAN_THREADS.to_string())],
            TimeoutClass::Scan,
        )
        .await?;

        let mut query = vec![
            ("url", target.to_string()),
            ("recurse", "true".to_string()),
        ];
        if let Some(policy) = scan_policy.filter(|p| !p.trim().is_empty()) {
            query.push(("scanPolicyName", policy.to_string()));
        }

        let body = self
            .get_json(endpoints::ASCAN_SCAN, &query, TimeoutClass::Scan)
            .await?;
        field_string(&body, endpoints::ASCAN_SCAN, "scan")
    }

    pub async fn active_scan_status(&self, scan_id: &str) -> BackendResult<ScanProgress> {
        self.scan_status(endpoints::ASCAN_STATUS, scan_id).await
    }

    async fn scan_status(&self, endpoint: &str, scan_id: &str) -> BackendResult<ScanProgress> {
        let body = self
            .get_json(
                endpoint,
                &[("scanId", scan_id.to_string())],
                TimeoutClass::Status,
            )
            .await?;
        let raw = field_string(&body, endpoint, "status")?;
        let percent: u32 = raw.trim().parse().map_err(|_| {
            BackendError::protocol(endpoint, format!("status '{}' is not an integer", raw))
        })?;
        Ok(ScanProgress::from_percent(percent.min(100) as u8))
    }

    /// All alerts, optionally filtered to one risk level (case-insensitive)
    pub async fn alerts(&self, risk: Option<RiskLevel>) -> BackendResult<Vec<Alert>> {
        let body = self
            .get_json(endpoints::ALERTS, &[], TimeoutClass::Status)
            .await?;

        let raw_alerts = body
            .get("alerts")
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::protocol(endpoints::ALERTS, "missing field 'alerts'"))?;

        let mut alerts = Vec::with_capacity(raw_alerts.len());
        let mut filtered = 0usize;
        for raw in raw_alerts {
            match serde_json::from_value::<Alert>(raw.clone()) {
                Ok(alert) => {
                    if risk.map_or(true, |level| level.matches(&alert.risk)) {
                        alerts.push(alert);
                    } else {
                        filtered += 1;
                    }
                }
                Err(e) => warn!("Skipping malformed ZAP alert: {}", e),
            }
        }

        debug!(
            returned = alerts.len(),
            filtered,
            risk = risk.map(|r| r.as_str()).unwrap_or("all"),
            "Retrieved ZAP alerts"
        );
        Ok(alerts)
    }

    pub async fn html_report(&self) -> BackendResult<String> {
        let (status, body) = self
            .get_raw(endpoints::HTML_REPORT, &[], TimeoutClass::Report)
            .await?;
        if !status.is_success() {
            return Err(classify_failure(endpoints::HTML_REPORT, status, &body));
        }
        Ok(body)
    }

    /// Structured report assembled from the alert list and ZAP version
    pub async fn json_report(&self) -> BackendResult<JsonReport> {
        let alerts = self.alerts(None).await?;
        let zap_version = self.version().await?;

        Ok(JsonReport {
            scan_info: ReportScanInfo {
                timestamp: chrono::Utc::now().to_rfc3339(),
                zap_version,
            },
            total_alerts: alerts.len(),
            alert_counts: count_by_risk(&alerts),
            alerts,
        })
    }

    /// Start a fresh ZAP session, discarding scan history and alerts
    pub async fn clear_session(&self) -> BackendResult<()> {
        let body = self
            .get_json(
                endpoints::NEW_SESSION,
                &[("overwrite", "true".to_string())],
                TimeoutClass::Scan,
            )
            .await?;
        field_string(&body, endpoints::NEW_SESSION, "Result")?;
        Ok(())
    }

    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        class: TimeoutClass,
    ) -> BackendResult<Value> {
        let (status, body) = self.get_raw(endpoint, query, class).await?;

        if !status.is_success() {
            return Err(classify_failure(endpoint, status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| BackendError::protocol(endpoint, format!("invalid JSON: {}", e)))?;

        if let Some(rejected) = rejection(endpoint, &value) {
            return Err(rejected);
        }

        Ok(value)
    }

    async fn get_raw(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        class: TimeoutClass,
    ) -> BackendResult<(StatusCode, String)> {
        let url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| BackendError::protocol(endpoint, format!("bad endpoint URL: {}", e)))?;
        let timeout = self.timeout_for(class);
        let limit = self.body_limit_for(class);

        let mut request = self.client.get(url).query(query).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let started = Instant::now();
        let result = async {
            let mut response = request
                .send()
                .await
                .map_err(|e| BackendError::from_reqwest(endpoint, timeout, e))?;
            let status = response.status();

            let too_large =
                || BackendError::protocol(endpoint, format!("response exceeds {} bytes", limit));
            if response.content_length().map_or(false, |len| len > limit as u64) {
                return Err(too_large());
            }

            let mut body = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| BackendError::from_reqwest(endpoint, timeout, e))?
            {
                if body.len() + chunk.len() > limit {
                    return Err(too_large());
                }
                body.extend_from_slice(&chunk);
            }
            Ok((status, String::from_utf8_lossy(&body).into_owned()))
        }
        .await;

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.observe_backend_call(endpoint, elapsed, result.is_ok());
        }

        match &result {
            Ok((status, _)) => debug!(
                operation = endpoint,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "ZAP call completed"
            ),
            Err(e) => warn!(
                operation = endpoint,
                elapsed_ms = elapsed.as_millis() as u64,
                "ZAP call failed: {}",
                e
            ),
        }

        result
    }
}

/// `{"code": .., "message": ..}` is how ZAP reports a refused action
fn rejection(endpoint: &str, value: &Value) -> Option<BackendError> {
    let code = value.get("code")?;
    let message = value.get("message").and_then(Value::as_str)?;
    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(BackendError::Rejected {
        endpoint: endpoint.to_string(),
        code,
        message: message.to_string(),
    })
}

fn classify_failure(endpoint: &str, status: StatusCode, body: &str) -> BackendError {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| rejection(endpoint, &value))
        .unwrap_or_else(|| BackendError::protocol(endpoint, format!("HTTP {}", status.as_u16())))
}

/// ZAP encodes most scalars as strings; accept numbers too
fn field_string(body: &Value, endpoint: &str, field: &str) -> BackendResult<String> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(BackendError::protocol(
            endpoint,
            format!("field '{}' has unexpected type: {}", field, other),
        )),
        None => Err(BackendError::protocol(
            endpoint,
            format!("missing field '{}'", field),
        )),
    }
}

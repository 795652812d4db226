// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Health Check & Monitoring
 * Bridge health endpoints; ZAP reachability is probed in the background
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::http_client::ZapClient;

pub const CATALOG_COMPONENT: &str = "tool_catalog";
pub const BACKEND_COMPONENT: &str = "zap_backend";

/// Health status levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub last_check: String,
    pub response_time_ms: Option<u64>,
}

/// Overall health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub components: Vec<ComponentHealth>,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessCheckResponse {
    pub ready: bool,
    pub timestamp: String,
    pub checks: Vec<ComponentHealth>,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessCheckResponse {
    pub alive: bool,
    pub timestamp: String,
    pub tools: Vec<String>,
}

/// Health checker state
#[derive(Clone)]
pub struct HealthChecker {
    start_time: Instant,
    version: String,
    component_checks: Arc<RwLock<Vec<ComponentHealth>>>,
    tools: Arc<Vec<String>>,
}

impl HealthChecker {
    pub fn new(version: String) -> Self {
        Self {
            start_time: Instant::now(),
            version,
            component_checks: Arc::new(RwLock::new(Vec::new())),
            tools: Arc::new(Vec::new()),
        }
    }

    /// Tool names reported by every health response
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub async fn update_component_health(
        &self,
        name: String,
        status: HealthStatus,
        message: Option<String>,
        response_time_ms: Option<u64>,
    ) {
        let health = ComponentHealth {
            name: name.clone(),
            status,
            message,
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        };

        let mut checks = self.component_checks.write().await;
        if let Some(existing) = checks.iter_mut().find(|c| c.name == name) {
            *existing = health;
        } else {
            checks.push(health);
        }

        debug!(component = %name, status = ?status, "Component health updated");
    }

    /// Probe ZAP with a version call. An unreachable ZAP degrades the
    /// bridge; it never makes the bridge itself unhealthy.
    pub async fn check_backend_health(&self, client: &ZapClient) -> ComponentHealth {
        let start = Instant::now();
        let (status, message, response_time_ms) = match client.version().await {
            Ok(version) => (
                HealthStatus::Healthy,
                Some(format!("ZAP {}", version)),
                Some(start.elapsed().as_millis() as u64),
            ),
            Err(e) => (HealthStatus::Degraded, Some(e.to_string()), None),
        };

        ComponentHealth {
            name: BACKEND_COMPONENT.to_string(),
            status,
            message,
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }

    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.component_checks
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub async fn get_health(&self) -> HealthCheckResponse {
        let components = self.component_checks.read().await.clone();

        let overall_status = if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if components.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthCheckResponse {
            status: overall_status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: self.version.clone(),
            components,
            tools: self.tools.to_vec(),
        }
    }

    pub async fn is_ready(&self) -> ReadinessCheckResponse {
        let checks = self.component_checks.read().await.clone();
        let ready = checks.iter().all(|c| c.status != HealthStatus::Unhealthy);

        ReadinessCheckResponse {
            ready,
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
            tools: self.tools.to_vec(),
        }
    }

    pub fn is_alive(&self) -> LivenessCheckResponse {
        LivenessCheckResponse {
            alive: true,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tools: self.tools.to_vec(),
        }
    }

    /// Start periodic backend probes
    pub fn start_periodic_checks(self: Arc<Self>, interval: Duration, client: ZapClient) -> JoinHandle<()> {
        info!(interval_secs = interval.as_secs(), "Starting periodic ZAP probes");

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut last_status = None;

            loop {
                interval_timer.tick().await;

                let health = self.check_backend_health(&client).await;
                if last_status != Some(health.status) {
                    match health.status {
                        HealthStatus::Healthy => info!(base_url = client.base_url(), "ZAP reachable"),
                        _ => warn!(
                            base_url = client.base_url(),
                            reason = health.message.as_deref().unwrap_or(""),
                            "ZAP unreachable"
                        ),
                    }
                    last_status = Some(health.status);
                }

                self.update_component_health(
                    health.name,
                    health.status,
                    health.message,
                    health.response_time_ms,
                )
                .await;
            }
        })
    }
}

pub async fn health_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    let health = ctx.health.get_health().await;
    let status_code = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

pub async fn readiness_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    let readiness = ctx.health.is_ready().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

pub async fn liveness_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    (StatusCode::OK, Json(ctx.health.is_alive()))
}

/// Bridge status: connected clients and registered tools
pub async fn status_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    let backend = ctx
        .health
        .component(BACKEND_COMPONENT)
        .await
        .map(|c| c.status);

    Json(json!({
        "status": "running",
        "name": crate::SERVER_NAME,
        "version": crate::VERSION,
        "mode": "mcp_sse",
        "clients": ctx.sessions.len(),
        "tools": ctx.catalog.names(),
        "tool_count": ctx.catalog.count(),
        "backend": backend,
        "zap_base_url": ctx.client.base_url(),
    }))
}

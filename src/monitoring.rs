// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Prometheus Metrics Export for the ZAP MCP Bridge
 * Per-application registry, exposed on /metrics
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::AppContext;

const NAMESPACE: &str = "zap_mcp";

/// Metrics collector owning its own registry
#[derive(Clone)]
pub struct MetricsCollector {
    enabled: bool,
    registry: Registry,
    sessions_opened: IntCounter,
    sessions_closed: IntCounterVec,
    sessions_active: IntGauge,
    tool_invocations: IntCounterVec,
    tool_duration: HistogramVec,
    backend_call_duration: HistogramVec,
    recovery_outcomes: IntCounterVec,
    envelopes_dropped: IntCounter,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sessions_opened = IntCounter::with_opts(
            Opts::new("sessions_opened_total", "Streams opened").namespace(NAMESPACE),
        )?;
        let sessions_closed = IntCounterVec::new(
            Opts::new("sessions_closed_total", "Sessions closed, by reason").namespace(NAMESPACE),
            &["reason"],
        )?;
        let sessions_active = IntGauge::with_opts(
            Opts::new("sessions_active", "Sessions currently tracked").namespace(NAMESPACE),
        )?;
        let tool_invocations = IntCounterVec::new(
            Opts::new("tool_invocations_total", "Tool invocations, by tool and outcome")
                .namespace(NAMESPACE),
            &["tool", "outcome"],
        )?;
        let tool_duration = HistogramVec::new(
            HistogramOpts::new("tool_duration_seconds", "Tool execution time")
                .namespace(NAMESPACE)
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["tool"],
        )?;
        let backend_call_duration = HistogramVec::new(
            HistogramOpts::new("backend_call_duration_seconds", "ZAP API call latency")
                .namespace(NAMESPACE)
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 60.0]),
            &["operation", "outcome"],
        )?;
        let recovery_outcomes = IntCounterVec::new(
            Opts::new(
                "argument_recovery_total",
                "Recovered arguments, by parameter, source and extraction rule",
            )
            .namespace(NAMESPACE),
            &["parameter", "source", "rule"],
        )?;
        let envelopes_dropped = IntCounter::with_opts(
            Opts::new(
                "envelopes_dropped_total",
                "Responses discarded because the session was gone",
            )
            .namespace(NAMESPACE),
        )?;

        if enabled {
            registry.register(Box::new(sessions_opened.clone()))?;
            registry.register(Box::new(sessions_closed.clone()))?;
            registry.register(Box::new(sessions_active.clone()))?;
            registry.register(Box::new(tool_invocations.clone()))?;
            registry.register(Box::new(tool_duration.clone()))?;
            registry.register(Box::new(backend_call_duration.clone()))?;
            registry.register(Box::new(recovery_outcomes.clone()))?;
            registry.register(Box::new(envelopes_dropped.clone()))?;
            info!("Prometheus metrics initialized");
        }

        Ok(Self {
            enabled,
            registry,
            sessions_opened,
            sessions_closed,
            sessions_active,
            tool_invocations,
            tool_duration,
            backend_call_duration,
            recovery_outcomes,
            envelopes_dropped,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_session_opened(&self) {
        if !self.enabled {
            return;
        }

        self.sessions_opened.inc();
        self.sessions_active.inc();
    }

    pub fn record_session_closed(&self, reason: &str) {
        if !self.enabled {
            return;
        }

        self.sessions_closed.with_label_values(&[reason]).inc();
        self.sessions_active.dec();
    }

    pub fn record_tool_invocation(&self, tool: &str, outcome: &str, duration: Duration) {
        if !self.enabled {
            return;
        }

        self.tool_invocations
            .with_label_values(&[tool, outcome])
            .inc();
        self.tool_duration
            .with_label_values(&[tool])
            .observe(duration.as_secs_f64());

        debug!(
            tool = tool,
            outcome = outcome,
            duration_ms = duration.as_millis() as u64,
            "Tool invocation recorded"
        );
    }

    pub fn observe_backend_call(&self, operation: &str, duration: Duration, ok: bool) {
        if !self.enabled {
            return;
        }

        let outcome = if ok { "ok" } else { "error" };
        self.backend_call_duration
            .with_label_values(&[operation, outcome])
            .observe(duration.as_secs_f64());
    }

    /// `rule` is `None` for direct, default and unrecoverable outcomes
    pub fn record_recovery(&self, parameter: &str, source: &str, rule: Option<&str>) {
        if !self.enabled {
            return;
        }

        self.recovery_outcomes
            .with_label_values(&[parameter, source, rule.unwrap_or("none")])
            .inc();
    }

    pub fn record_envelope_dropped(&self) {
        if !self.enabled {
            return;
        }

        self.envelopes_dropped.inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(ctx): State<AppContext>) -> Response {
    if !ctx.metrics.is_enabled() {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    }

    match ctx.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::health::{HealthChecker, HealthStatus, CATALOG_COMPONENT};
use crate::http_client::ZapClient;
use crate::monitoring::MetricsCollector;
use crate::registry::ToolCatalog;
use crate::session::SessionManager;

/// Shared state behind every route
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<ToolCatalog>,
    pub sessions: Arc<SessionManager>,
    pub client: ZapClient,
    pub health: Arc<HealthChecker>,
    pub metrics: Arc<MetricsCollector>,
}

impl AppContext {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let metrics = Arc::new(
            MetricsCollector::new(config.observability.metrics_enabled)
                .context("Failed to register metrics")?,
        );

        let catalog = ToolCatalog::zap_default().context("Failed to build tool catalog")?;
        info!(tools = catalog.count(), "Tool catalog loaded");

        let client = ZapClient::new(&config.backend)?.with_metrics(Arc::clone(&metrics));
        let sessions = Arc::new(SessionManager::new(config.session.clone(), Arc::clone(&metrics)));

        let health = Arc::new(
            HealthChecker::new(crate::VERSION.to_string()).with_tools(catalog.names()),
        );
        health
            .update_component_health(
                CATALOG_COMPONENT.to_string(),
                HealthStatus::Healthy,
                Some(format!("{} tools registered", catalog.count())),
                None,
            )
            .await;

        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            sessions,
            client,
            health,
            metrics,
        })
    }
}

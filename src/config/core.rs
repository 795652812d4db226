// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,

    pub backend: BackendConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,

    /// Origins allowed by CORS; `*` allows any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BackendConfig {
    #[validate(url)]
    pub base_url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Health, status and alert views
    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,

    /// Scan start and session clear actions
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_report_timeout")]
    pub report_timeout_secs: u64,

    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_pool_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Largest accepted response body; HTML reports get five times this
    #[validate(range(min = 1024))]
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    #[validate(range(min = 1))]
    #[serde(default = "default_idle_after")]
    pub idle_after_secs: u64,

    #[validate(range(min = 1))]
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[validate(range(min = 1))]
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[validate(range(min = 1))]
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_context_max_age")]
    pub context_max_age_secs: u64,

    /// Deadline for queueing one envelope on a session stream
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl BackendConfig {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }
}

impl SessionConfig {
    pub fn idle_after(&self) -> Duration {
        Duration::from_secs(self.idle_after_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn context_max_age(&self) -> Duration {
        Duration::from_secs(self.context_max_age_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://zap:8080".to_string(),
            api_key: None,
            status_timeout_secs: default_status_timeout(),
            scan_timeout_secs: default_scan_timeout(),
            report_timeout_secs: default_report_timeout(),
            pool_max_idle_per_host: default_pool_idle_per_host(),
            probe_interval_secs: default_probe_interval(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_after_secs: default_idle_after(),
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            keepalive_secs: default_keepalive(),
            queue_capacity: default_queue_capacity(),
            context_max_age_secs: default_context_max_age(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: true,
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_status_timeout() -> u64 {
    10
}

fn default_scan_timeout() -> u64 {
    60
}

fn default_report_timeout() -> u64 {
    120
}

fn default_pool_idle_per_host() -> usize {
    16
}

fn default_probe_interval() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_idle_after() -> u64 {
    60
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_keepalive() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    64
}

fn default_context_max_age() -> u64 {
    300
}

fn default_write_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_true() -> bool {
    true
}

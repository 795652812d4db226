// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;

pub use core::{
    AppConfig, BackendConfig, LogFormat, ObservabilityConfig, ServerConfig, SessionConfig,
};

use crate::errors::BridgeError;
use std::str::FromStr;
use validator::Validate;

pub fn create_default_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        backend: BackendConfig::default(),
        session: SessionConfig::default(),
        observability: ObservabilityConfig::default(),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults
    ///
    /// Supports the following environment variables:
    /// - ZAP_BASE_URL / ZAP_API_KEY: backend location and key
    /// - SERVER_HOST / SERVER_PORT: listener address
    /// - LOG_LEVEL / LOG_FORMAT: logging
    /// - ZAP_*_TIMEOUT_SECS, ZAP_MAX_BODY_BYTES, SESSION_*, BACKEND_PROBE_INTERVAL_SECS: tuning
    /// - ALLOWED_ORIGINS, METRICS_ENABLED
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = create_default_config();

        if let Some(base_url) = lookup("ZAP_BASE_URL") {
            config.backend.base_url = base_url.trim().trim_end_matches('/').to_string();
        }

        if let Some(api_key) = lookup("ZAP_API_KEY") {
            let api_key = api_key.trim().to_string();
            config.backend.api_key = if api_key.is_empty() { None } else { Some(api_key) };
        }

        if let Some(host) = lookup("SERVER_HOST") {
            config.server.host = host;
        }

        apply_parsed(&lookup, "SERVER_PORT", &mut config.server.port)?;

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.observability.log_level = log_level.to_lowercase();
        }

        apply_parsed(&lookup, "LOG_FORMAT", &mut config.observability.log_format)?;
        apply_parsed(&lookup, "METRICS_ENABLED", &mut config.observability.metrics_enabled)?;

        apply_parsed(&lookup, "ZAP_STATUS_TIMEOUT_SECS", &mut config.backend.status_timeout_secs)?;
        apply_parsed(&lookup, "ZAP_SCAN_TIMEOUT_SECS", &mut config.backend.scan_timeout_secs)?;
        apply_parsed(&lookup, "ZAP_REPORT_TIMEOUT_SECS", &mut config.backend.report_timeout_secs)?;
        apply_parsed(&lookup, "ZAP_MAX_BODY_BYTES", &mut config.backend.max_body_bytes)?;
        apply_parsed(
            &lookup,
            "BACKEND_PROBE_INTERVAL_SECS",
            &mut config.backend.probe_interval_secs,
        )?;

        apply_parsed(&lookup, "SESSION_IDLE_AFTER_SECS", &mut config.session.idle_after_secs)?;
        apply_parsed(&lookup, "SESSION_IDLE_TIMEOUT_SECS", &mut config.session.idle_timeout_secs)?;
        apply_parsed(
            &lookup,
            "SESSION_SWEEP_INTERVAL_SECS",
            &mut config.session.sweep_interval_secs,
        )?;
        apply_parsed(&lookup, "SESSION_KEEPALIVE_SECS", &mut config.session.keepalive_secs)?;
        apply_parsed(&lookup, "SESSION_QUEUE_CAPACITY", &mut config.session.queue_capacity)?;
        apply_parsed(
            &lookup,
            "SESSION_CONTEXT_MAX_AGE_SECS",
            &mut config.session.context_max_age_secs,
        )?;
        apply_parsed(
            &lookup,
            "SESSION_WRITE_TIMEOUT_SECS",
            &mut config.session.write_timeout_secs,
        )?;

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if !origins.is_empty() {
                config.server.allowed_origins = origins;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.server
            .validate()
            .map_err(|e| BridgeError::Configuration(format!("server: {}", e)))?;
        self.backend
            .validate()
            .map_err(|e| BridgeError::Configuration(format!("backend: {}", e)))?;
        self.session
            .validate()
            .map_err(|e| BridgeError::Configuration(format!("session: {}", e)))?;

        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(BridgeError::Configuration(
                "ZAP_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        if self.session.idle_timeout_secs < self.session.idle_after_secs {
            return Err(BridgeError::Configuration(
                "SESSION_IDLE_TIMEOUT_SECS must not be shorter than SESSION_IDLE_AFTER_SECS"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// True when every origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.server.allowed_origins.iter().any(|o| o == "*")
    }
}

fn apply_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), BridgeError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| BridgeError::Configuration(format!("Invalid {} value: {}", key, raw)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.backend.base_url, "http://zap:8080");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.session.idle_timeout_secs, 300);
        assert_eq!(config.observability.log_format, LogFormat::Text);
        assert!(config.backend.api_key.is_none());
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("ZAP_BASE_URL", "http://localhost:8090/"),
            ("ZAP_API_KEY", "secret"),
            ("SERVER_PORT", "3100"),
            ("LOG_FORMAT", "json"),
            ("SESSION_IDLE_TIMEOUT_SECS", "900"),
            ("SESSION_WRITE_TIMEOUT_SECS", "2"),
            ("ZAP_MAX_BODY_BYTES", "2048"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:8090");
        assert_eq!(config.backend.api_key.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 3100);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.session.idle_timeout_secs, 900);
        assert_eq!(config.session.write_timeout_secs, 2);
        assert_eq!(config.backend.max_body_bytes, 2048);
        assert_eq!(config.server.allowed_origins.len(), 2);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }

    #[test]
    fn test_rejects_non_http_backend() {
        let err = AppConfig::from_lookup(lookup_from(&[("ZAP_BASE_URL", "ftp://zap:21")])).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_rejects_inverted_idle_windows() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("SESSION_IDLE_AFTER_SECS", "600"),
            ("SESSION_IDLE_TIMEOUT_SECS", "300"),
        ]));
        assert!(result.is_err());
    }
}

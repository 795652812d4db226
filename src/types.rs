// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// ZAP alert risk levels, in the spelling ZAP uses on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Informational,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
        RiskLevel::Informational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
            RiskLevel::Informational => "Informational",
        }
    }

    /// Case-insensitive match against the risk string on an alert
    pub fn matches(&self, risk: &str) -> bool {
        risk.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            "informational" | "info" => Ok(RiskLevel::Informational),
            other => Err(format!("Unknown risk level: {}", other)),
        }
    }
}

/// Coarse state of a spider or active scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Running,
    Completed,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Running => write!(f, "running"),
            ScanState::Completed => write!(f, "completed"),
        }
    }
}

/// Progress of a scan as reported by ZAP (0..=100)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanProgress {
    pub status: ScanState,
    pub progress: u8,
}

impl ScanProgress {
    pub fn from_percent(percent: u8) -> Self {
        let progress = percent.min(100);
        let status = if progress < 100 {
            ScanState::Running
        } else {
            ScanState::Completed
        };
        Self { status, progress }
    }
}

/// A single ZAP alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "alert", alias = "name", default)]
    pub name: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub reference: String,
    #[serde(rename = "pluginId", default)]
    pub plugin_id: String,
}

/// Alert counts keyed by risk string
pub fn count_by_risk(alerts: &[Alert]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for alert in alerts {
        let risk = if alert.risk.is_empty() {
            "Unknown".to_string()
        } else {
            alert.risk.clone()
        };
        *counts.entry(risk).or_insert(0) += 1;
    }
    counts
}

/// Structured report assembled from the alert list and ZAP version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub scan_info: ReportScanInfo,
    pub total_alerts: usize,
    pub alert_counts: BTreeMap<String, usize>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportScanInfo {
    pub timestamp: String,
    pub zap_version: String,
}

/// Truncate to `max` characters, appending "..." when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_parsing() {
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!(" medium ".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert_eq!("info".parse::<RiskLevel>().unwrap(), RiskLevel::Informational);
        assert!("critical".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_scan_progress_from_percent() {
        assert_eq!(ScanProgress::from_percent(45).status, ScanState::Running);
        assert_eq!(ScanProgress::from_percent(100).status, ScanState::Completed);
        assert_eq!(ScanProgress::from_percent(250).progress, 100);
    }

    #[test]
    fn test_alert_deserializes_zap_shape() {
        let alert: Alert = serde_json::from_value(serde_json::json!({
            "id": "7",
            "alert": "X-Frame-Options Header Not Set",
            "risk": "Medium",
            "confidence": "Medium",
            "url": "https://example.com/",
            "pluginId": "10020",
            "other": "ignored"
        }))
        .unwrap();
        assert_eq!(alert.name, "X-Frame-Options Header Not Set");
        assert_eq!(alert.plugin_id, "10020");
        assert!(alert.solution.is_empty());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }
}

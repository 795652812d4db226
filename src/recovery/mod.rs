// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Argument Recovery
 * Rebuilds structured tool arguments from degenerate, free-text bundles
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

pub mod rules;

use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

use crate::types::RiskLevel;

/// Catch-all free-text field most agent clients send
pub const FREE_TEXT_FIELD: &str = "random_string";

pub const DEFAULT_MAX_DEPTH: u32 = 5;
pub const MIN_MAX_DEPTH: u32 = 1;
pub const MAX_MAX_DEPTH: u32 = 20;

/// What a tool needs recovered from its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    /// No parameters beyond the free-text field
    NoArguments,
    /// Target URL; optionally crawl depth and scan policy
    Target { depth: bool, policy: bool },
    /// Numeric scan identifier
    ScanId,
    /// Optional risk-level filter
    RiskFilter,
}

impl ToolCategory {
    /// Parameter names the category's schema declares
    pub fn known_keys(&self) -> Vec<&'static str> {
        let mut keys = match self {
            ToolCategory::NoArguments => vec![],
            ToolCategory::Target { depth, policy } => {
                let mut keys = vec!["url"];
                if *depth {
                    keys.push("max_depth");
                }
                if *policy {
                    keys.push("scan_policy");
                }
                keys
            }
            ToolCategory::ScanId => vec!["scan_id"],
            ToolCategory::RiskFilter => vec!["risk_level"],
        };
        keys.push(FREE_TEXT_FIELD);
        keys
    }

    /// The parameter the tool cannot run without, if any
    pub fn required_parameter(&self) -> Option<&'static str> {
        match self {
            ToolCategory::Target { .. } => Some("url"),
            ToolCategory::ScanId => Some("scan_id"),
            ToolCategory::NoArguments | ToolCategory::RiskFilter => None,
        }
    }
}

/// Where a recovered value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    Direct,
    FreeText { rule: &'static str },
    RecentContext { rule: &'static str },
    Default,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Direct => "direct",
            Provenance::FreeText { .. } => "free_text",
            Provenance::RecentContext { .. } => "recent_context",
            Provenance::Default => "default",
        }
    }

    /// Extraction rule that produced the value, if any
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Provenance::FreeText { rule } | Provenance::RecentContext { rule } => Some(*rule),
            Provenance::Direct | Provenance::Default => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetUrl {
    pub url: String,
    /// What the caller wrote, when it differs from `url`
    pub original: Option<String>,
}

/// Structured arguments handed to a tool handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveredArguments {
    pub tool: String,
    pub url: Option<TargetUrl>,
    pub scan_id: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub max_depth: Option<u32>,
    pub scan_policy: Option<String>,
    pub provenance: Vec<(&'static str, Provenance)>,
}

impl RecoveredArguments {
    fn empty(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            url: None,
            scan_id: None,
            risk_level: None,
            max_depth: None,
            scan_policy: None,
            provenance: Vec::new(),
        }
    }

    pub fn provenance_of(&self, parameter: &str) -> Option<&Provenance> {
        self.provenance
            .iter()
            .find(|(name, _)| *name == parameter)
            .map(|(_, p)| p)
    }
}

/// Outcome of recovery; never an error
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    Recovered(RecoveredArguments),
    Unrecoverable { parameter: String },
}

/// Recover the arguments `category` needs from `raw`, falling back to
/// `recent_context` when the bundle carries nothing usable.
///
/// Pure and panic-free: an internal failure yields `Unrecoverable`.
pub fn recover(
    tool: &str,
    category: ToolCategory,
    raw: &Map<String, Value>,
    recent_context: Option<&str>,
) -> Recovery {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        recover_inner(tool, category, raw, recent_context)
    }));

    match outcome {
        Ok(recovery) => recovery,
        Err(_) => {
            error!(tool = tool, "Argument recovery panicked; treating as unrecoverable");
            Recovery::Unrecoverable {
                parameter: category
                    .required_parameter()
                    .unwrap_or("arguments")
                    .to_string(),
            }
        }
    }
}

fn recover_inner(
    tool: &str,
    category: ToolCategory,
    raw: &Map<String, Value>,
    recent_context: Option<&str>,
) -> Recovery {
    let free_text = free_text(raw, category);
    let context = recent_context
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let mut args = RecoveredArguments::empty(tool);

    match category {
        ToolCategory::NoArguments => {}
        ToolCategory::Target { depth, policy } => {
            match recover_url(raw, free_text.as_deref(), context) {
                Some((target, provenance)) => {
                    args.url = Some(target);
                    args.provenance.push(("url", provenance));
                }
                None => return unrecoverable(tool, "url", free_text.as_deref()),
            }

            if depth {
                let (value, provenance) = recover_depth(raw, free_text.as_deref());
                args.max_depth = Some(value);
                args.provenance.push(("max_depth", provenance));
            }

            if policy {
                if let Some(p) = direct_string(raw, "scan_policy") {
                    args.scan_policy = Some(p);
                    args.provenance.push(("scan_policy", Provenance::Direct));
                }
            }
        }
        ToolCategory::ScanId => match recover_scan_id(raw, free_text.as_deref(), context) {
            Some((id, provenance)) => {
                args.scan_id = Some(id);
                args.provenance.push(("scan_id", provenance));
            }
            None => return unrecoverable(tool, "scan_id", free_text.as_deref()),
        },
        ToolCategory::RiskFilter => {
            if let Some((level, provenance)) = recover_risk(raw, free_text.as_deref(), context) {
                args.risk_level = Some(level);
                args.provenance.push(("risk_level", provenance));
            }
        }
    }

    debug!(
        tool = tool,
        provenance = ?args.provenance,
        "Recovered tool arguments"
    );
    Recovery::Recovered(args)
}

fn unrecoverable(tool: &str, parameter: &str, free_text: Option<&str>) -> Recovery {
    debug!(
        tool = tool,
        parameter = parameter,
        free_text = free_text.unwrap_or(""),
        "Argument could not be recovered"
    );
    Recovery::Unrecoverable {
        parameter: parameter.to_string(),
    }
}

/// `random_string` when non-empty, else the one string value the schema does not declare
pub fn free_text(raw: &Map<String, Value>, category: ToolCategory) -> Option<String> {
    if let Some(Value::String(text)) = raw.get(FREE_TEXT_FIELD) {
        let text = text.trim();
        return if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    let known = category.known_keys();
    let mut strays = raw
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .filter_map(|(_, value)| value.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty());

    match (strays.next(), strays.next()) {
        (Some(text), None) => Some(text.to_string()),
        _ => None,
    }
}

fn direct_string(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn recover_url(
    raw: &Map<String, Value>,
    free_text: Option<&str>,
    context: Option<&str>,
) -> Option<(TargetUrl, Provenance)> {
    if let Some(direct) = direct_string(raw, "url") {
        if !direct.contains(char::is_whitespace) {
            let normalized = rules::normalize_url(&direct);
            let original = (normalized != direct).then_some(direct);
            return Some((
                TargetUrl {
                    url: normalized,
                    original,
                },
                Provenance::Direct,
            ));
        }
        // A sentence in the url field is free text
        if let Some((url, rule)) = rules::extract_url(&direct) {
            return Some((
                TargetUrl {
                    url,
                    original: Some(direct),
                },
                Provenance::FreeText { rule },
            ));
        }
    }

    if let Some(text) = free_text {
        if let Some((url, rule)) = rules::extract_url(text) {
            let original = (url != text).then(|| text.to_string());
            return Some((TargetUrl { url, original }, Provenance::FreeText { rule }));
        }
    }

    let text = context?;
    rules::extract_url(text).map(|(url, rule)| {
        (
            TargetUrl {
                url,
                original: None,
            },
            Provenance::RecentContext { rule },
        )
    })
}

fn recover_scan_id(
    raw: &Map<String, Value>,
    free_text: Option<&str>,
    context: Option<&str>,
) -> Option<(String, Provenance)> {
    match raw.get("scan_id") {
        Some(Value::Number(n)) if n.is_u64() => {
            return Some((n.to_string(), Provenance::Direct));
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                return Some((s.to_string(), Provenance::Direct));
            }
        }
        _ => {}
    }

    if let Some((id, rule)) = free_text.and_then(rules::extract_scan_id) {
        return Some((id, Provenance::FreeText { rule }));
    }

    context
        .and_then(rules::extract_scan_id)
        .map(|(id, rule)| (id, Provenance::RecentContext { rule }))
}

/// Optional filter: recent context is consulted only when the request had no free text at all
fn recover_risk(
    raw: &Map<String, Value>,
    free_text: Option<&str>,
    context: Option<&str>,
) -> Option<(RiskLevel, Provenance)> {
    if let Some(level) = direct_string(raw, "risk_level").and_then(|s| s.parse::<RiskLevel>().ok()) {
        return Some((level, Provenance::Direct));
    }

    match free_text {
        Some(text) => rules::extract_risk_level(text)
            .map(|(level, rule)| (level, Provenance::FreeText { rule })),
        None => context
            .and_then(rules::extract_risk_level)
            .map(|(level, rule)| (level, Provenance::RecentContext { rule })),
    }
}

fn recover_depth(raw: &Map<String, Value>, free_text: Option<&str>) -> (u32, Provenance) {
    let direct = match raw.get("max_depth") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    if let Some(depth) = direct {
        return (clamp_depth(depth), Provenance::Direct);
    }

    if let Some((depth, rule)) = free_text.and_then(rules::extract_max_depth) {
        return (clamp_depth(depth as u64), Provenance::FreeText { rule });
    }

    (DEFAULT_MAX_DEPTH, Provenance::Default)
}

fn clamp_depth(depth: u64) -> u32 {
    depth.clamp(MIN_MAX_DEPTH as u64, MAX_MAX_DEPTH as u64) as u32
}

/// Last `user` message text in a request's `params.messages`, if any
pub fn context_from_messages(params: &Value) -> Option<String> {
    let messages = params.get("messages")?.as_array()?;

    messages
        .iter()
        .rev()
        .filter(|m| m.get("role").and_then(Value::as_str) == Some("user"))
        .find_map(|m| message_text(m.get("content")?))
}

fn message_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => content.get("text")?.as_str()?.to_string(),
        _ => return None,
    };

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPIDER: ToolCategory = ToolCategory::Target {
        depth: true,
        policy: false,
    };
    const ACTIVE: ToolCategory = ToolCategory::Target {
        depth: false,
        policy: true,
    };

    fn bundle(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn recovered(recovery: Recovery) -> RecoveredArguments {
        match recovery {
            Recovery::Recovered(args) => args,
            Recovery::Unrecoverable { parameter } => {
                panic!("expected recovery, got unrecoverable {}", parameter)
            }
        }
    }

    #[test]
    fn test_direct_url_used_as_is() {
        let args = recovered(recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"url": "https://existing.com", "random_string": "skyral.io"})),
            None,
        ));
        let target = args.url.as_ref().unwrap();
        assert_eq!(target.url, "https://existing.com");
        assert!(target.original.is_none());
        assert_eq!(args.provenance_of("url"), Some(&Provenance::Direct));
    }

    #[test]
    fn test_direct_bare_url_normalized_keeps_original() {
        let args = recovered(recover(
            "zap_active_scan",
            ACTIVE,
            &bundle(json!({"url": "httpbin.org", "scan_policy": "Light"})),
            None,
        ));
        let target = args.url.unwrap();
        assert_eq!(target.url, "https://httpbin.org");
        assert_eq!(target.original.as_deref(), Some("httpbin.org"));
        assert_eq!(args.scan_policy.as_deref(), Some("Light"));
    }

    #[test]
    fn test_url_from_free_text() {
        let args = recovered(recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"random_string": "example.com"})),
            None,
        ));
        assert_eq!(args.url.as_ref().unwrap().url, "https://example.com");
        assert_eq!(
            args.provenance_of("url"),
            Some(&Provenance::FreeText { rule: rules::URL_BARE })
        );
        assert_eq!(args.max_depth, Some(DEFAULT_MAX_DEPTH));
        assert_eq!(args.provenance_of("max_depth"), Some(&Provenance::Default));
        assert_eq!(args.provenance_of("url").and_then(Provenance::rule), Some(rules::URL_BARE));
        assert_eq!(Provenance::Default.rule(), None);
    }

    #[test]
    fn test_absolute_url_round_trips() {
        for url in [
            "https://example.com/path",
            "http://localhost:8080",
            "https://en.wikipedia.org/wiki/Foo_(bar)",
        ] {
            let args = recovered(recover(
                "zap_spider_scan",
                SPIDER,
                &bundle(json!({ "random_string": url })),
                None,
            ));
            let target = args.url.unwrap();
            assert_eq!(target.url, url);
            assert!(target.original.is_none());
        }
    }

    #[test]
    fn test_unrecoverable_names_parameter() {
        let recovery = recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"random_string": "not_a_url_or_domain"})),
            None,
        );
        assert_eq!(
            recovery,
            Recovery::Unrecoverable {
                parameter: "url".to_string()
            }
        );
    }

    #[test]
    fn test_empty_bundle_and_empty_free_text_behave_alike() {
        let context = Some("scan example.com please");
        let from_empty = recover("zap_spider_scan", SPIDER, &Map::new(), context);
        let from_blank = recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"random_string": "   "})),
            context,
        );
        assert_eq!(from_empty, from_blank);

        let args = recovered(from_empty);
        assert_eq!(args.url.as_ref().unwrap().url, "https://example.com");
        assert_eq!(
            args.provenance_of("url"),
            Some(&Provenance::RecentContext { rule: rules::URL_BARE })
        );

        assert!(matches!(
            recover("zap_spider_scan", SPIDER, &Map::new(), None),
            Recovery::Unrecoverable { .. }
        ));
    }

    #[test]
    fn test_context_used_when_free_text_has_no_match() {
        let args = recovered(recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"random_string": "do it again"})),
            Some("https://target.example"),
        ));
        assert_eq!(args.url.unwrap().url, "https://target.example");
    }

    #[test]
    fn test_stray_string_field_is_free_text() {
        let args = recovered(recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"query": "crawl https://example.com depth 3"})),
            None,
        ));
        assert_eq!(args.url.unwrap().url, "https://example.com");
        assert_eq!(args.max_depth, Some(3));

        // Two candidates: ambiguous, not used
        let recovery = recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"a": "example.com", "b": "example.org"})),
            None,
        );
        assert!(matches!(recovery, Recovery::Unrecoverable { .. }));
    }

    #[test]
    fn test_scan_id_direct_and_extracted() {
        let direct = recovered(recover(
            "zap_spider_status",
            ToolCategory::ScanId,
            &bundle(json!({"scan_id": 17})),
            None,
        ));
        assert_eq!(direct.scan_id.as_deref(), Some("17"));

        let extracted = recovered(recover(
            "zap_spider_status",
            ToolCategory::ScanId,
            &bundle(json!({"random_string": "scan id is 123"})),
            None,
        ));
        assert_eq!(extracted.scan_id.as_deref(), Some("123"));

        let numeric = recovered(recover(
            "zap_active_scan_status",
            ToolCategory::ScanId,
            &bundle(json!({"random_string": "456"})),
            None,
        ));
        assert_eq!(numeric.scan_id.as_deref(), Some("456"));

        assert!(matches!(
            recover(
                "zap_active_scan_status",
                ToolCategory::ScanId,
                &bundle(json!({"random_string": "the latest one"})),
                None,
            ),
            Recovery::Unrecoverable { ref parameter } if parameter == "scan_id"
        ));
    }

    #[test]
    fn test_risk_filter_optional() {
        let high = recovered(recover(
            "zap_get_alerts",
            ToolCategory::RiskFilter,
            &bundle(json!({"random_string": "show me HIGH risk vulnerabilities"})),
            None,
        ));
        assert_eq!(high.risk_level, Some(RiskLevel::High));

        let all = recovered(recover(
            "zap_get_alerts",
            ToolCategory::RiskFilter,
            &bundle(json!({"random_string": "everything please"})),
            Some("only high ones"),
        ));
        assert_eq!(all.risk_level, None);

        let from_context = recovered(recover(
            "zap_get_alerts",
            ToolCategory::RiskFilter,
            &Map::new(),
            Some("only medium ones"),
        ));
        assert_eq!(from_context.risk_level, Some(RiskLevel::Medium));
    }

    #[test]
    fn test_depth_clamped() {
        let deep = recovered(recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"url": "https://example.com", "max_depth": 99})),
            None,
        ));
        assert_eq!(deep.max_depth, Some(MAX_MAX_DEPTH));

        let shallow = recovered(recover(
            "zap_spider_scan",
            SPIDER,
            &bundle(json!({"url": "https://example.com", "max_depth": "0"})),
            None,
        ));
        assert_eq!(shallow.max_depth, Some(MIN_MAX_DEPTH));
    }

    #[test]
    fn test_no_argument_tools_ignore_text() {
        let args = recovered(recover(
            "zap_clear_session",
            ToolCategory::NoArguments,
            &bundle(json!({"random_string": "test_session_data"})),
            None,
        ));
        assert!(args.url.is_none());
        assert!(args.provenance.is_empty());
    }

    #[test]
    fn test_context_from_messages_takes_last_user_turn() {
        let params = json!({
            "name": "zap_spider_scan",
            "messages": [
                {"role": "user", "content": "hello"},
                {"role": "assistant", "content": "hi"},
                {"role": "user", "content": [{"type": "text", "text": "scan skyral.io"}]},
                {"role": "assistant", "content": "on it"}
            ]
        });
        assert_eq!(context_from_messages(&params).as_deref(), Some("scan skyral.io"));
        assert!(context_from_messages(&json!({})).is_none());
        assert!(context_from_messages(&json!({"messages": []})).is_none());
    }
}

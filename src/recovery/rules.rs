// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Versioned extraction rules.
//!
//! Each rule has a stable id. A change in matching behaviour gets a new id
//! (`URL-BARE-2`, ...) so recovered values in logs and metrics stay traceable.
//!
//! | Id | Matches |
//! |---|---|
//! | `URL-ABS-1` | absolute `http`/`https` URL with a host; trailing punctuation trimmed |
//! | `URL-BARE-1` | bare domain (labels + alphabetic TLD), optional port and path; `https://` prefixed |
//! | `SCAN-ID-CTX-1` | integer following the word `id` (`id 4`, `id: 4`, `id is 4`) |
//! | `SCAN-ID-1` | first standalone integer |
//! | `RISK-KW-1` | `high`, `medium`, `low`, `informational` or `info`, case-insensitive |
//! | `DEPTH-1` | integer following `depth` (`depth 3`, `max depth of 3`, `depth=3`) |
//!
//! All rules are leftmost-first: the earliest match in the text wins.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::types::RiskLevel;

pub const URL_ABS: &str = "URL-ABS-1";
pub const URL_BARE: &str = "URL-BARE-1";
pub const SCAN_ID_CTX: &str = "SCAN-ID-CTX-1";
pub const SCAN_ID: &str = "SCAN-ID-1";
pub const RISK_KW: &str = "RISK-KW-1";
pub const DEPTH: &str = "DEPTH-1";

/// Every rule id, in evaluation order per parameter
pub const ALL_RULES: [&str; 6] = [URL_ABS, URL_BARE, SCAN_ID_CTX, SCAN_ID, RISK_KW, DEPTH];

static ABSOLUTE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s/?#<>"'`.,;:!]+[^\s<>"'`]*"#).unwrap()
});

static BARE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^\w@./-])((?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}(?::\d{1,5})?(?:/[^\s]*)?)",
    )
    .unwrap()
});

static SCAN_ID_AFTER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bid\b\W*(?:is\s+|=\s*)?(\d+)\b").unwrap()
});

static STANDALONE_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").unwrap());

static RISK_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(informational|info|high|medium|low)\b").unwrap()
});

static DEPTH_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdepth\b\W*(?:of\s+|is\s+|to\s+)?(\d{1,4})\b").unwrap()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// Strip sentence punctuation; a closing bracket goes only when it has no opener in the match
fn trim_trailing(candidate: &str) -> &str {
    let mut trimmed = candidate;
    loop {
        let Some(last) = trimmed.chars().last() else {
            return trimmed;
        };
        let unbalanced = |open: char| {
            trimmed.matches(open).count() < trimmed.matches(last).count()
        };
        let strip = match last {
            ')' => unbalanced('('),
            ']' => unbalanced('['),
            '}' => unbalanced('{'),
            c => TRAILING_PUNCTUATION.contains(&c),
        };
        if !strip {
            return trimmed;
        }
        trimmed = &trimmed[..trimmed.len() - last.len_utf8()];
    }
}

/// Text that is nothing but one parseable absolute URL
fn whole_text_url(text: &str) -> Option<&str> {
    let text = text.trim();
    let lower = text.get(..8).unwrap_or(text).to_ascii_lowercase();
    let absolute = lower.starts_with("http://") || lower.starts_with("https://");
    if !absolute || text.contains(char::is_whitespace) {
        return None;
    }
    Url::parse(text).ok().filter(|u| u.host().is_some()).map(|_| text)
}

/// First absolute URL, then first bare domain (prefixed with `https://`).
///
/// A text that is exactly one valid absolute URL comes back verbatim.
pub fn extract_url(text: &str) -> Option<(String, &'static str)> {
    if let Some(url) = whole_text_url(text) {
        return Some((url.to_string(), URL_ABS));
    }

    if let Some(m) = ABSOLUTE_URL.find(text) {
        let url = trim_trailing(m.as_str());
        if !url.is_empty() {
            return Some((url.to_string(), URL_ABS));
        }
    }

    BARE_DOMAIN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| trim_trailing(m.as_str()))
        .filter(|domain| !domain.is_empty())
        .map(|domain| (format!("https://{}", domain), URL_BARE))
}

pub fn extract_scan_id(text: &str) -> Option<(String, &'static str)> {
    if let Some(caps) = SCAN_ID_AFTER_ID.captures(text) {
        if let Some(id) = caps.get(1) {
            return Some((id.as_str().to_string(), SCAN_ID_CTX));
        }
    }

    STANDALONE_INTEGER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|id| (id.as_str().to_string(), SCAN_ID))
}

pub fn extract_risk_level(text: &str) -> Option<(RiskLevel, &'static str)> {
    RISK_KEYWORD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|kw| kw.as_str().parse::<RiskLevel>().ok())
        .map(|level| (level, RISK_KW))
}

pub fn extract_max_depth(text: &str) -> Option<(u32, &'static str)> {
    DEPTH_VALUE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|d| d.as_str().parse::<u32>().ok())
        .map(|depth| (depth, DEPTH))
}

/// Prefix `https://` onto a bare domain; anything else is returned trimmed.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }

    let lower = input.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return input.to_string();
    }

    if input.contains('.') && !input.contains(char::is_whitespace) && !input.starts_with('/') {
        return format!("https://{}", input);
    }

    input.to_string()
}

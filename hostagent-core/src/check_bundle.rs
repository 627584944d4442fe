use crate::errors::{CoreError, Result};
use crate::metric::MetricDefinition;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_ACTIVE: &str = "active";

pub const FILTER_ALLOW: &str = "allow";
pub const FILTER_DENY: &str = "deny";

/// Config key holding the URL metrics are pushed to for trap style checks
pub const CONFIG_SUBMISSION_URL: &str = "submission_url";

/// A remote check bundle: target, metric filters and the brokers allowed to collect it.
///
/// The same shape is used for reads and for create/update requests; server assigned
/// fields (`_cid`, `_checks`) are omitted from requests while empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckBundle {
    #[serde(rename = "_cid", default, skip_serializing_if = "String::is_empty")]
    pub cid: String,
    #[serde(rename = "_checks", default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<String>,
    #[serde(
        rename = "_last_modified",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<u64>,
    #[serde(default)]
    pub brokers: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub metric_filters: Vec<MetricFilter>,
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub period: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub timeout: f32,
    #[serde(rename = "type", default)]
    pub check_type: String,
}

impl CheckBundle {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// The first check spawned from this bundle.
    pub fn check_cid(&self) -> Option<&str> {
        self.checks.first().map(String::as_str)
    }

    pub fn submission_url(&self) -> Option<&str> {
        self.config.get(CONFIG_SUBMISSION_URL).map(String::as_str)
    }
}

/// One `[action, pattern, comment]` rule of a bundle's metric filter list.
///
/// Rules are evaluated in order by the backend; the first matching pattern decides
/// whether a metric name is allowed onto the check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct MetricFilter {
    pub action: String,
    pub pattern: String,
    pub comment: String,
}

impl MetricFilter {
    pub fn new(action: &str, pattern: &str, comment: &str) -> Result<Self> {
        if action != FILTER_ALLOW && action != FILTER_DENY {
            return Err(CoreError::InvalidFilter(format!(
                "unknown action '{}' (expected allow or deny)",
                action
            )));
        }
        Regex::new(pattern)
            .map_err(|e| CoreError::InvalidFilter(format!("pattern '{}': {}", pattern, e)))?;

        Ok(MetricFilter {
            action: action.to_string(),
            pattern: pattern.to_string(),
            comment: comment.to_string(),
        })
    }
}

impl TryFrom<Vec<String>> for MetricFilter {
    type Error = CoreError;

    fn try_from(parts: Vec<String>) -> Result<Self> {
        match parts.as_slice() {
            [action, pattern] => MetricFilter::new(action, pattern, ""),
            [action, pattern, comment] => MetricFilter::new(action, pattern, comment),
            _ => Err(CoreError::InvalidFilter(format!(
                "expected [action, pattern, comment], got {} element(s)",
                parts.len()
            ))),
        }
    }
}

impl From<MetricFilter> for Vec<String> {
    fn from(filter: MetricFilter) -> Self {
        vec![filter.action, filter.pattern, filter.comment]
    }
}

/// Deny-everything then allow-everything: filtering is opt-in per added rule,
/// but the net effect of the defaults is permissive.
pub fn default_metric_filters() -> Vec<MetricFilter> {
    vec![
        MetricFilter {
            action: FILTER_DENY.to_string(),
            pattern: "^$".to_string(),
            comment: String::new(),
        },
        MetricFilter {
            action: FILTER_ALLOW.to_string(),
            pattern: "^.+$".to_string(),
            comment: String::new(),
        },
    ]
}

/// Parses a JSON list of `[action, pattern, comment]` triples.
pub fn parse_metric_filters(raw: &str) -> Result<Vec<MetricFilter>> {
    serde_json::from_str(raw).map_err(|e| CoreError::InvalidFilter(e.to_string()))
}

#[cfg(test)]
#[path = "check_bundle_test.rs"]
mod check_bundle_test;

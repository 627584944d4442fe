use crate::errors::{CheckError, Result};

use hostagent_core::check_bundle::{parse_metric_filters, STATUS_ACTIVE};
use hostagent_core::cid::normalize_broker_cid;
use hostagent_core::MetricFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CHECK_TYPE: &str = "json:nad";
pub const DEFAULT_METRIC_REFRESH_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BROKER_MAX_RESPONSE_TIME: Duration = Duration::from_millis(500);
pub const DEFAULT_BROKER_MAX_RETRIES: u32 = 5;

/// Literal broker setting asking for automatic broker selection.
pub const BROKER_SELECT: &str = "select";

/// check settings as read from the agent config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Manage a check bundle even without create / bundle id / new metrics
    pub enabled: bool,
    /// Explicit check bundle id, bare number or `/check_bundle/<n>`
    pub bundle_id: Option<String>,
    /// Target used to search for (or create) the check bundle
    pub target: Option<String>,
    /// Check type, defaults to `json:nad`
    pub check_type: Option<String>,
    /// Create the check bundle when the search finds none
    pub create: bool,
    /// Display name of a created check bundle
    pub title: Option<String>,
    /// Comma separated tags of a created check bundle
    pub tags: Option<String>,
    /// Broker id, or `select` to pick one automatically
    pub broker: Option<String>,
    /// JSON list of `[action, pattern, comment]` rules
    pub metric_filters: Option<String>,
    /// File holding the metric filter rules JSON
    pub metric_filter_file: Option<PathBuf>,
    /// How long the metric state may be used before being refreshed, e.g. `5m`
    pub metric_refresh_ttl: Option<String>,
    /// Deprecated: enable every new metric individually instead of using metric filters
    pub enable_new_metrics: bool,
    /// Directory holding the metric state file
    pub metric_state_dir: Option<PathBuf>,
    /// Per attempt broker connect timeout, e.g. `500ms`
    pub broker_max_response_time: Option<String>,
    /// Connection attempts per broker node
    pub broker_max_retries: Option<u32>,
    /// Status given to newly enabled metrics
    pub active_metric_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerChoice {
    Select,
    /// Normalized `/broker/<n>` cid
    Id(String),
}

/// Validated check management configuration.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub enabled: bool,
    pub bundle_id: Option<String>,
    pub target: String,
    pub check_type: String,
    pub create: bool,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub broker: BrokerChoice,
    pub metric_filters: Option<Vec<MetricFilter>>,
    pub metric_refresh_ttl: Duration,
    pub enable_new_metrics: bool,
    pub state_dir: Option<PathBuf>,
    pub broker_max_response_time: Duration,
    pub broker_max_retries: u32,
    pub active_metric_status: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            enabled: false,
            bundle_id: None,
            target: String::new(),
            check_type: DEFAULT_CHECK_TYPE.to_string(),
            create: false,
            title: None,
            tags: Vec::new(),
            broker: BrokerChoice::Select,
            metric_filters: None,
            metric_refresh_ttl: DEFAULT_METRIC_REFRESH_TTL,
            enable_new_metrics: false,
            state_dir: None,
            broker_max_response_time: DEFAULT_BROKER_MAX_RESPONSE_TIME,
            broker_max_retries: DEFAULT_BROKER_MAX_RETRIES,
            active_metric_status: STATUS_ACTIVE.to_string(),
        }
    }
}

impl CheckConfig {
    /// Whether anything in the configuration needs a resolved check bundle.
    pub fn is_required(&self) -> bool {
        self.enabled || self.create || self.enable_new_metrics || self.bundle_id.is_some()
    }

    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => format!("{} /agent", self.target),
        }
    }
}

fn parse_duration(field: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    match value {
        Some(raw) if !raw.trim().is_empty() => humantime::parse_duration(raw.trim())
            .map_err(|e| CheckError::Config(format!("{} ({}): {}", field, raw, e))),
        _ => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Implementing the TryFrom trait to validate CheckSettings into CheckConfig
impl TryFrom<CheckSettings> for CheckConfig {
    type Error = CheckError;

    fn try_from(settings: CheckSettings) -> Result<Self> {
        let broker = match non_empty(settings.broker) {
            None => BrokerChoice::Select,
            Some(b) if b == BROKER_SELECT => BrokerChoice::Select,
            Some(b) => BrokerChoice::Id(normalize_broker_cid(&b)?),
        };

        let filters_json = match (non_empty(settings.metric_filters), settings.metric_filter_file) {
            (Some(_), Some(_)) => {
                return Err(CheckError::Config(
                    "metric_filters and metric_filter_file are mutually exclusive".to_string(),
                ))
            }
            (Some(json), None) => Some(json),
            (None, Some(path)) => Some(std::fs::read_to_string(&path).map_err(|e| {
                CheckError::Config(format!("metric_filter_file ({}): {}", path.display(), e))
            })?),
            (None, None) => None,
        };
        let metric_filters = filters_json
            .map(|json| parse_metric_filters(&json))
            .transpose()?;

        let tags = settings
            .tags
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let metric_refresh_ttl = parse_duration(
            "metric_refresh_ttl",
            settings.metric_refresh_ttl,
            DEFAULT_METRIC_REFRESH_TTL,
        )?;
        if metric_refresh_ttl.is_zero() {
            return Err(CheckError::Config(
                "metric_refresh_ttl must be > 0".to_string(),
            ));
        }

        Ok(CheckConfig {
            enabled: settings.enabled,
            bundle_id: non_empty(settings.bundle_id),
            target: non_empty(settings.target).unwrap_or_default(),
            check_type: non_empty(settings.check_type)
                .unwrap_or_else(|| DEFAULT_CHECK_TYPE.to_string()),
            create: settings.create,
            title: non_empty(settings.title),
            tags,
            broker,
            metric_filters,
            metric_refresh_ttl,
            enable_new_metrics: settings.enable_new_metrics,
            state_dir: settings.metric_state_dir,
            broker_max_response_time: parse_duration(
                "broker_max_response_time",
                settings.broker_max_response_time,
                DEFAULT_BROKER_MAX_RESPONSE_TIME,
            )?,
            broker_max_retries: settings
                .broker_max_retries
                .unwrap_or(DEFAULT_BROKER_MAX_RETRIES),
            active_metric_status: non_empty(settings.active_metric_status)
                .unwrap_or_else(|| STATUS_ACTIVE.to_string()),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

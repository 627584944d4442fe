use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single locally produced metric value.
///
/// The shape is fixed by the collector that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    Histogram(Vec<f64>),
    Text(String),
}

/// Metrics produced by the collection pipeline, keyed by metric name.
pub type Metrics = HashMap<String, MetricValue>;

/// Remote metric type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Numeric,
    Histogram,
    Text,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Numeric => "numeric",
            MetricKind::Histogram => "histogram",
            MetricKind::Text => "text",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Scalar(_) => MetricKind::Numeric,
            MetricValue::Histogram(_) => MetricKind::Histogram,
            MetricValue::Text(_) => MetricKind::Text,
        }
    }
}

/// Metric entry of a check bundle (or of the bundle metrics endpoint).
///
/// `metric_type` stays a plain string since the backend knows types this agent never emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, kind: MetricKind, status: impl Into<String>) -> Self {
        MetricDefinition {
            name: name.into(),
            metric_type: kind.as_str().to_string(),
            status: status.into(),
            tags: Vec::new(),
            units: None,
        }
    }
}

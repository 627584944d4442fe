//! Hostagent-Check
//!
//! Binds a running agent to exactly one check bundle: broker selection, check bundle
//! resolution (by id, search or create) and the legacy per-metric enable state.

mod errors;
pub use errors::{CheckError, Result};

pub mod config;
pub use config::{BrokerChoice, CheckConfig, CheckSettings};

mod check_metrics;
pub use check_metrics::describe_metrics;

mod prober;
pub use prober::{Prober, TcpProber};

mod broker_selector;
pub use broker_selector::{BrokerSelector, MAX_BROKER_LATENCY};

mod resolver;
pub use resolver::{ensure_active, search_criteria, CheckResolver};

pub mod metric_state;
pub use metric_state::{MetricStateStore, MetricStates};

mod bundle;
pub use bundle::{BundleController, BundleInfo};

#[cfg(test)]
mod test_support;

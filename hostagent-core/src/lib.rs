//! Hostagent-Core
//!
//! Shared data model for the hostagent check bundle control plane: resource
//! identifiers, brokers, check bundles and the metric shapes produced locally.

mod errors;
pub use errors::{CoreError, Result};

pub mod broker;
pub use broker::{Broker, BrokerDetail};

pub mod check_bundle;
pub use check_bundle::{CheckBundle, MetricFilter};

pub mod cid;

pub mod metric;
pub use metric::{MetricDefinition, MetricKind, MetricValue, Metrics};

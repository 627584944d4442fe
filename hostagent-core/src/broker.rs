use serde::{Deserialize, Serialize};

/// Port used when a broker detail advertises neither an external nor an internal port.
pub const DEFAULT_BROKER_PORT: u16 = 43191;

/// The public trap broker only accepts submissions over 443.
pub const TRAP_BROKER_HOST: &str = "trap.noit.circonus.net";
pub const TRAP_BROKER_PORT: u16 = 443;

pub const BROKER_CLASS_SHARED: &str = "circonus";
pub const BROKER_CLASS_ENTERPRISE: &str = "enterprise";

pub const DETAIL_STATUS_ACTIVE: &str = "active";

/// A data-collection broker, as returned by the `/broker` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    #[serde(rename = "_cid")]
    pub cid: String,
    #[serde(rename = "_name", default)]
    pub name: String,
    /// `circonus` (shared) or `enterprise` (dedicated)
    #[serde(rename = "_type", default)]
    pub class: String,
    #[serde(rename = "_details", default)]
    pub details: Vec<BrokerDetail>,
}

/// One broker node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerDetail {
    #[serde(default)]
    pub cn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_host: Option<String>,
    #[serde(default)]
    pub external_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipaddress: Option<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub status: String,
}

impl Broker {
    pub fn is_enterprise(&self) -> bool {
        self.class == BROKER_CLASS_ENTERPRISE
    }
}

impl BrokerDetail {
    pub fn is_active(&self) -> bool {
        self.status == DETAIL_STATUS_ACTIVE
    }

    /// Whether this node runs the module backing `check_type` (sub-type after `:` ignored).
    pub fn supports(&self, check_type: &str) -> bool {
        let base = base_check_type(check_type);
        self.modules.iter().any(|module| module == base)
    }

    /// Resolves the host/port an agent should connect to.
    ///
    /// External host and port take precedence over the internal address and port.
    /// Returns `None` when the detail carries no usable host at all.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        let host = match self.external_host.as_deref() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => self.ipaddress.as_deref().filter(|ip| !ip.is_empty())?.to_string(),
        };

        let mut port = if self.external_port != 0 {
            self.external_port
        } else {
            match self.port {
                Some(port) if port != 0 => port,
                _ => DEFAULT_BROKER_PORT,
            }
        };

        if host == TRAP_BROKER_HOST {
            port = TRAP_BROKER_PORT;
        }

        Some((host, port))
    }
}

/// The check module name, i.e. the part of the check type before the first `:`.
pub fn base_check_type(check_type: &str) -> &str {
    check_type.split(':').next().unwrap_or(check_type)
}

#[cfg(test)]
#[path = "broker_test.rs"]
mod broker_test;

use anyhow::{Context, Result};
use hostagent_api::{HttpOptions, DEFAULT_API_APP, DEFAULT_API_URL};
use hostagent_check::{CheckConfig, CheckSettings};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(10);

/// configuration settings loaded from the config file
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LoadConfiguration {
    /// Monitoring API connection
    pub(crate) api: ApiSettings,
    /// Check bundle management
    #[serde(default)]
    pub(crate) check: CheckSettings,
    /// Optional: Prometheus exporter http address
    #[serde(default)]
    pub(crate) prom_exporter: Option<String>,
}

/// Monitoring API settings
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiSettings {
    /// API token, sent with every request
    pub(crate) token: String,
    /// Base URL, defaults to the public API
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Application name registered with the token
    #[serde(default)]
    pub(crate) app: Option<String>,
    /// Request timeout, e.g. `10s`
    #[serde(default)]
    pub(crate) timeout: Option<String>,
}

/// validated agent configuration
#[derive(Debug)]
pub(crate) struct AgentConfiguration {
    pub(crate) api: HttpOptions,
    pub(crate) check: CheckConfig,
    pub(crate) prom_exporter: Option<SocketAddr>,
}

impl TryFrom<LoadConfiguration> for AgentConfiguration {
    type Error = anyhow::Error;

    fn try_from(config: LoadConfiguration) -> Result<Self> {
        if config.api.token.trim().is_empty() {
            anyhow::bail!("api.token is required");
        }

        let timeout = match config.api.timeout.as_deref() {
            Some(raw) => humantime::parse_duration(raw)
                .with_context(|| format!("Failed to parse api.timeout: {}", raw))?,
            None => DEFAULT_API_TIMEOUT,
        };

        let api = HttpOptions {
            url: config.api.url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: config.api.token.trim().to_string(),
            app: config.api.app.unwrap_or_else(|| DEFAULT_API_APP.to_string()),
            timeout,
        };

        let check = CheckConfig::try_from(config.check).context("Invalid check configuration")?;

        let prom_exporter = config
            .prom_exporter
            .map(|addr| parse_socket_addr(&addr))
            .transpose()?;

        Ok(AgentConfiguration {
            api,
            check,
            prom_exporter,
        })
    }
}

pub(crate) fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .with_context(|| format!("Failed to parse into Socket address: {}", addr))
}

#[cfg(test)]
#[path = "service_configuration_test.rs"]
mod service_configuration_test;

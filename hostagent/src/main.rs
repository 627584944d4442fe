mod args_parse;
mod service_configuration;

use crate::{
    args_parse::Args,
    service_configuration::{parse_socket_addr, AgentConfiguration, LoadConfiguration},
};

use anyhow::{Context, Result};
use clap::Parser;
use hostagent_api::{CheckApi, HttpApi};
use hostagent_check::{describe_metrics, BundleController, TcpProber};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{fs::read_to_string, net::SocketAddr, sync::Arc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load the configuration from the specified YAML file
    let config_content = read_to_string(&args.config_file).with_context(|| {
        format!("Failed to read config file {}", args.config_file.display())
    })?;
    let load_config: LoadConfiguration = serde_yaml::from_str(&config_content)?;

    // Attempt to transform LoadConfiguration into AgentConfiguration
    let mut agent_config: AgentConfiguration = load_config.try_into()?;

    // Command-line args override the values from the config file
    if let Some(check_id) = args.check_id {
        agent_config.check.bundle_id = Some(check_id);
    }
    if let Some(state_dir) = args.state_dir {
        agent_config.check.state_dir = Some(state_dir);
    }
    if let Some(prom_exporter) = args.prom_exporter {
        agent_config.prom_exporter = Some(parse_socket_addr(&prom_exporter)?);
    }

    init_metrics(agent_config.prom_exporter)?;

    let refresh_every = agent_config.check.metric_refresh_ttl;
    let api = CheckApi::Http(HttpApi::new(agent_config.api)?);
    let controller = BundleController::new(api, agent_config.check, Arc::new(TcpProber));

    controller
        .initialize()
        .await
        .context("Failed to initialize check bundle")?;

    if !controller.is_initialized().await {
        info!("check management disabled, nothing to do");
        return Ok(());
    }

    let bundle = controller.info().await?;
    info!(
        cid = %bundle.cid,
        period = bundle.period,
        submission_url = ?bundle.submission_url,
        "hostagent bound to check bundle"
    );

    let mut ticker = interval(refresh_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately, the bundle was just fetched
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = controller.refresh().await {
                    warn!(error = %e, "check bundle refresh failed, keeping current bundle");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!(error = %e, "unable to listen for shutdown signal");
                }
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

fn init_metrics(prom_addr: Option<SocketAddr>) -> Result<()> {
    info!("initializing metrics exporter");

    if let Some(addr) = prom_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus recorder")?;
    }

    describe_metrics();
    Ok(())
}

use clap::Parser;
use std::path::PathBuf;

/// Host telemetry agent bound to a monitoring check bundle
#[derive(Debug, Parser)]
#[command(name = "hostagent")]
#[command(about = "Host telemetry agent bound to a monitoring check bundle", long_about = None)]
pub(crate) struct Args {
    /// Path to the YAML config file
    #[arg(long)]
    pub(crate) config_file: PathBuf,

    /// Check bundle id, overrides check.bundle_id from the config file
    #[arg(long)]
    pub(crate) check_id: Option<String>,

    /// Metric state directory, overrides check.metric_state_dir
    #[arg(long)]
    pub(crate) state_dir: Option<PathBuf>,

    /// Log filter directive (e.g. `debug`, `hostagent_check=trace`), RUST_LOG wins when set
    #[arg(long, default_value = "info")]
    pub(crate) log_level: String,

    /// Prometheus exporter http address, overrides prom_exporter
    #[arg(long)]
    pub(crate) prom_exporter: Option<String>,
}

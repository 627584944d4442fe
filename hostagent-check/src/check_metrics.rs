pub(crate) struct Metric {
    pub name: &'static str,
    description: &'static str,
}

pub(crate) const COUNTERS: [Metric; 3] = [
    BROKER_PROBE_FAILURES_TOTAL,
    CHECK_BUNDLE_RESOLUTIONS_TOTAL,
    CHECK_METRICS_ENABLED_TOTAL,
];

// BROKER Metrics --------------------------

pub(crate) const BROKER_PROBE_FAILURES_TOTAL: Metric = Metric {
    name: "hostagent_broker_probe_failures_total",
    description: "Total number of broker nodes found unreachable while selecting a broker",
};

// CHECK Metrics --------------------------

pub(crate) const CHECK_BUNDLE_RESOLUTIONS_TOTAL: Metric = Metric {
    name: "hostagent_check_bundle_resolutions_total",
    description: "Total check bundle resolutions by method (id/search/create) and result",
};

pub(crate) const CHECK_METRICS_ENABLED_TOTAL: Metric = Metric {
    name: "hostagent_check_metrics_enabled_total",
    description: "Total number of new metrics submitted as enabled on the check bundle",
};

/// Registers descriptions for the counters emitted by this crate.
/// Call once after the process wide recorder is installed.
pub fn describe_metrics() {
    for metric in COUNTERS {
        metrics::describe_counter!(metric.name, metric.description);
    }
}

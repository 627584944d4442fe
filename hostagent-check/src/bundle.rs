use crate::broker_selector::BrokerSelector;
use crate::check_metrics::CHECK_METRICS_ENABLED_TOTAL;
use crate::config::CheckConfig;
use crate::errors::{CheckError, Result};
use crate::metric_state::{verify_state_path, MetricStateStore};
use crate::prober::Prober;
use crate::resolver::{ensure_active, CheckResolver};

use hostagent_api::{ApiClient, CheckApi};
use hostagent_core::{CheckBundle, Metrics};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Summary of the check bundle the agent is bound to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleInfo {
    pub cid: String,
    pub check_cid: Option<String>,
    pub check_type: String,
    pub target: String,
    pub display_name: String,
    pub period: u32,
    pub brokers: Vec<String>,
    pub submission_url: Option<String>,
}

impl From<&CheckBundle> for BundleInfo {
    fn from(bundle: &CheckBundle) -> Self {
        BundleInfo {
            cid: bundle.cid.clone(),
            check_cid: bundle.check_cid().map(str::to_string),
            check_type: bundle.check_type.clone(),
            target: bundle.target.clone(),
            display_name: bundle.display_name.clone(),
            period: bundle.period,
            brokers: bundle.brokers.clone(),
            submission_url: bundle.submission_url().map(str::to_string),
        }
    }
}

/// BundleController - owner of the agent's check bundle binding
///
/// Resolves the bundle once at startup, then serves read accessors, `refresh` and
/// `enable_new_metrics` to the collection pipeline. Every operation holds the single
/// state lock for its whole duration (API calls included): the bundle and the metric
/// state are one consistency domain and are never observed half updated.
pub struct BundleController {
    api: CheckApi,
    config: CheckConfig,
    state: Mutex<ControllerState>,
}

struct ControllerState {
    /// `None` = uninitialized
    bundle: Option<CheckBundle>,
    /// legacy enable-new-metrics mode active
    manage: bool,
    store: Option<MetricStateStore>,
    selector: BrokerSelector,
}

impl ControllerState {
    // The state file can no longer be written; legacy management ends for this process.
    fn stop_managing(&mut self, cid: &str) {
        warn!(cid = %cid, "metric state not persisted, disabling metric management");
        self.manage = false;
        self.store = None;
    }
}

impl BundleController {
    pub fn new(api: CheckApi, config: CheckConfig, prober: Arc<dyn Prober>) -> Self {
        let selector = BrokerSelector::new(
            prober,
            config.broker_max_response_time,
            config.broker_max_retries,
        );
        Self::with_selector(api, config, selector)
    }

    pub fn with_selector(api: CheckApi, config: CheckConfig, selector: BrokerSelector) -> Self {
        BundleController {
            api,
            config,
            state: Mutex::new(ControllerState {
                bundle: None,
                manage: false,
                store: None,
                selector,
            }),
        }
    }

    /// Resolves the check bundle and prepares the metric state.
    ///
    /// Leaves the controller uninitialized when the configuration needs no check.
    /// An error here means the agent cannot run with this configuration.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        if !self.config.is_required() {
            info!("check management not configured, skipping check bundle resolution");
            return Ok(());
        }

        let mut bundle = {
            let ControllerState { selector, .. } = &mut *state;
            CheckResolver::new(&self.api, &self.config)
                .resolve(selector)
                .await?
        };
        bundle.metrics.clear();

        if self.config.enable_new_metrics {
            warn!("enable_new_metrics is deprecated, use metric filters instead");
            state.store = self.prepare_store().await;
            state.manage = state.store.is_some();
        }

        info!(
            cid = %bundle.cid,
            check_type = %bundle.check_type,
            target = %bundle.target,
            manage_metrics = state.manage,
            "check bundle initialized"
        );
        state.bundle = Some(bundle);
        Ok(())
    }

    // The store, or None when the state directory cannot be used.
    async fn prepare_store(&self) -> Option<MetricStateStore> {
        let Some(dir) = &self.config.state_dir else {
            warn!("no metric state directory configured, disabling metric management");
            return None;
        };

        if let Err(e) = verify_state_path(dir).await {
            warn!(error = %e, "metric state directory unusable, disabling metric management");
            return None;
        }

        let mut store = MetricStateStore::new(dir, self.config.metric_refresh_ttl);
        store.load().await;
        Some(store)
    }

    /// Re-fetches the bundle and replaces the in-memory copy wholesale.
    ///
    /// On error the current bundle is kept; the running agent is not torn down.
    pub async fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let cid = match &state.bundle {
            Some(bundle) => bundle.cid.clone(),
            None => return Err(CheckError::Uninitialized),
        };

        let mut bundle = self
            .api
            .fetch_check_bundle(&cid)
            .await
            .map_err(|e| CheckError::api(format!("refreshing check bundle {}", cid), e))?;
        ensure_active(&bundle)?;

        if state.manage {
            let persisted = match state.store.as_mut() {
                Some(store) => store.refresh_from_remote(&self.api, &cid, None).await?,
                None => true,
            };
            if !persisted {
                state.stop_managing(&cid);
            }
        }

        bundle.metrics.clear();
        debug!(cid = %cid, "check bundle refreshed");
        state.bundle = Some(bundle);
        Ok(())
    }

    /// Submits every metric of `metrics` the check bundle does not know yet as enabled.
    ///
    /// No-op unless the deprecated enable-new-metrics mode is active.
    pub async fn enable_new_metrics(&self, metrics: &Metrics) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.manage {
            return Ok(());
        }
        let cid = match &state.bundle {
            Some(bundle) => bundle.cid.clone(),
            None => return Ok(()),
        };
        let Some(store) = state.store.as_mut() else {
            return Ok(());
        };

        if !store.is_loaded() {
            // No prior state: the agent may be replacing an earlier install bound to
            // the same bundle. Seed from the roster instead of enabling everything.
            info!(cid = %cid, "no metric state, seeding from check bundle");
            if !store.refresh_from_remote(&self.api, &cid, None).await? {
                state.stop_managing(&cid);
            }
            return Ok(());
        }

        if store.needs_refresh() && !store.refresh_from_remote(&self.api, &cid, None).await? {
            state.stop_managing(&cid);
            return Ok(());
        }

        let new_metrics = store.unknown_metrics(metrics, &self.config.active_metric_status);
        if new_metrics.is_empty() {
            return Ok(());
        }
        store.mark_pending();

        let count = new_metrics.len();
        info!(cid = %cid, count, "enabling new metrics");

        // Work on a fresh copy so concurrent edits of the bundle are not overwritten.
        let mut fresh = self
            .api
            .fetch_check_bundle(&cid)
            .await
            .map_err(|e| CheckError::api(format!("fetching check bundle {}", cid), e))?;
        fresh.metrics.extend(new_metrics);

        let mut updated = self
            .api
            .update_check_bundle(&fresh)
            .await
            .map_err(|e| CheckError::api(format!("updating check bundle {}", cid), e))?;

        let persisted = store
            .refresh_from_remote(&self.api, &cid, Some(&updated.metrics))
            .await?;
        counter!(CHECK_METRICS_ENABLED_TOTAL.name).increment(count as u64);

        updated.metrics.clear();
        state.bundle = Some(updated);
        if !persisted {
            state.stop_managing(&cid);
        }
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.bundle.is_some()
    }

    /// Whether the legacy metric state mode ended up active.
    pub async fn is_managing_metrics(&self) -> bool {
        self.state.lock().await.manage
    }

    pub async fn cid(&self) -> Result<String> {
        self.with_bundle(|b| b.cid.clone()).await
    }

    /// The first check of the bundle, `None` while the backend has not spawned one.
    pub async fn check_cid(&self) -> Result<Option<String>> {
        self.with_bundle(|b| b.check_cid().map(str::to_string)).await
    }

    pub async fn period(&self) -> Result<u32> {
        self.with_bundle(|b| b.period).await
    }

    pub async fn info(&self) -> Result<BundleInfo> {
        self.with_bundle(|b| BundleInfo::from(b)).await
    }

    /// Copy of the current bundle.
    pub async fn bundle(&self) -> Result<CheckBundle> {
        self.with_bundle(CheckBundle::clone).await
    }

    async fn with_bundle<T>(&self, f: impl FnOnce(&CheckBundle) -> T) -> Result<T> {
        let state = self.state.lock().await;
        state.bundle.as_ref().map(f).ok_or(CheckError::Uninitialized)
    }
}

#[cfg(test)]
#[path = "bundle_test.rs"]
mod bundle_test;

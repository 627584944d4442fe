use crate::errors::{CheckError, Result};

use hostagent_api::{ApiClient, CheckApi};
use hostagent_core::cid::bundle_metrics_path;
use hostagent_core::{MetricDefinition, Metrics};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub const STATE_FILE_NAME: &str = "metrics.json";

const PROBE_FILE_NAME: &str = ".hostagent-write-probe";

/// Metric name -> remote status (`active`, `available`, ...)
pub type MetricStates = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct BundleMetrics {
    #[serde(default)]
    metrics: Vec<MetricDefinition>,
}

/// Local cache of the enabled/disabled status of every metric the check bundle knows.
///
/// Only used by the deprecated enable-new-metrics mode. The in-memory map is
/// authoritative for the running process; the file at `<state_dir>/metrics.json`
/// only carries it across restarts.
#[derive(Debug)]
pub struct MetricStateStore {
    path: PathBuf,
    states: Option<MetricStates>,
    last_refresh: Option<Instant>,
    ttl: Duration,
    pending_update: bool,
}

impl MetricStateStore {
    pub fn new(state_dir: &Path, ttl: Duration) -> Self {
        MetricStateStore {
            path: state_dir.join(STATE_FILE_NAME),
            states: None,
            last_refresh: None,
            ttl,
            pending_update: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` until state was loaded from disk or refreshed from the API.
    pub fn states(&self) -> Option<&MetricStates> {
        self.states.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.states.is_some()
    }

    pub fn pending_update(&self) -> bool {
        self.pending_update
    }

    /// True when the state was never refreshed, the TTL elapsed, or an update is pending.
    pub fn needs_refresh(&self) -> bool {
        self.pending_update
            || self
                .last_refresh
                .map_or(true, |at| at.elapsed() > self.ttl)
    }

    pub(crate) fn mark_pending(&mut self) {
        self.pending_update = true;
    }

    /// Loads the state file. A missing or unreadable file leaves the store without state.
    pub async fn load(&mut self) {
        match load_state(&self.path).await {
            Ok(Some(states)) => {
                info!(path = %self.path.display(), metrics = states.len(), "loaded metric state");
                self.states = Some(states);
            }
            Ok(None) => debug!(path = %self.path.display(), "no metric state file"),
            Err(e) => warn!(error = %e, "ignoring metric state file"),
        }
    }

    /// Merges the bundle's metric roster into the state and persists it.
    ///
    /// `known` skips the API call when the caller already holds the roster (e.g. the
    /// metrics returned by an update). Returns whether the state file was written; a
    /// write failure leaves the merged state in memory and is not an error.
    pub async fn refresh_from_remote(
        &mut self,
        api: &CheckApi,
        bundle_cid: &str,
        known: Option<&[MetricDefinition]>,
    ) -> Result<bool> {
        let fetched;
        let metrics = match known {
            Some(metrics) => metrics,
            None => {
                let path = bundle_metrics_path(bundle_cid);
                let raw = api
                    .get(&path)
                    .await
                    .map_err(|e| CheckError::api(format!("fetching metrics {}", path), e))?;
                let decoded: BundleMetrics = serde_json::from_slice(&raw)
                    .map_err(|e| CheckError::api(format!("decoding metrics {}", path), e.into()))?;
                fetched = decoded.metrics;
                &fetched
            }
        };

        self.merge(metrics);
        debug!(cid = %bundle_cid, metrics = metrics.len(), "refreshed metric state");

        let Some(states) = &self.states else {
            return Ok(true);
        };
        if let Err(e) = save_state(&self.path, states).await {
            warn!(error = %e, "unable to persist metric state, keeping it in memory");
            return Ok(false);
        }
        Ok(true)
    }

    /// Last write wins per metric name.
    pub(crate) fn merge(&mut self, metrics: &[MetricDefinition]) {
        let states = self.states.get_or_insert_with(MetricStates::new);
        for metric in metrics {
            states.insert(metric.name.clone(), metric.status.clone());
        }
        self.last_refresh = Some(Instant::now());
        self.pending_update = false;
    }

    /// Definitions for every candidate metric the state does not know yet, sorted by name.
    pub fn unknown_metrics(&self, candidates: &Metrics, status: &str) -> Vec<MetricDefinition> {
        let empty = MetricStates::new();
        let known = self.states.as_ref().unwrap_or(&empty);

        let mut new_metrics: Vec<MetricDefinition> = candidates
            .iter()
            .filter(|(name, _)| !known.contains_key(*name))
            .map(|(name, value)| MetricDefinition::new(name.clone(), value.kind(), status))
            .collect();
        new_metrics.sort_by(|a, b| a.name.cmp(&b.name));
        new_metrics
    }
}

/// Checks the state directory exists, is a directory and is writable.
pub async fn verify_state_path(dir: &Path) -> Result<()> {
    let meta = fs::metadata(dir)
        .await
        .map_err(|e| CheckError::state(dir, e))?;
    if !meta.is_dir() {
        return Err(CheckError::state(dir, "not a directory"));
    }

    let probe = dir.join(PROBE_FILE_NAME);
    fs::write(&probe, b"probe")
        .await
        .map_err(|e| CheckError::state(dir, format!("not writable: {}", e)))?;
    fs::remove_file(&probe)
        .await
        .map_err(|e| CheckError::state(dir, format!("unable to remove probe file: {}", e)))?;
    Ok(())
}

/// Reads the state file; `Ok(None)` when it does not exist.
pub async fn load_state(path: &Path) -> Result<Option<MetricStates>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckError::state(path, e)),
    };
    let states = serde_json::from_slice(&bytes)
        .map_err(|e| CheckError::state(path, format!("parse failed: {}", e)))?;
    Ok(Some(states))
}

/// Writes the state next to its final location, then renames it in place so a
/// crash mid-write keeps the previous file.
pub async fn save_state(path: &Path, states: &MetricStates) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(states).map_err(|e| CheckError::state(path, e))?;

    let tmp = path.with_extension("json.tmp");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .await
        .map_err(|e| CheckError::state(&tmp, format!("open failed: {}", e)))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| CheckError::state(&tmp, format!("write failed: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| CheckError::state(&tmp, format!("sync failed: {}", e)))?;
    drop(file);

    fs::rename(&tmp, path)
        .await
        .map_err(|e| CheckError::state(path, format!("rename failed: {}", e)))?;

    debug!(path = %path.display(), size = bytes.len(), "wrote metric state");
    Ok(())
}

#[cfg(test)]
#[path = "metric_state_test.rs"]
mod metric_state_test;

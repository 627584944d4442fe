use crate::{
    client::{ApiClient, SearchFilter},
    errors::{ApiError, Result},
};

use async_trait::async_trait;
use dashmap::DashMap;
use hostagent_core::check_bundle::STATUS_ACTIVE;
use hostagent_core::cid::{bundle_metrics_path, CHECK_BUNDLE_METRICS_PREFIX};
use hostagent_core::{Broker, CheckBundle, MetricDefinition};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// MemoryApi is an in-memory stand-in for the monitoring backend.
/// SHOULD BE USED ONLY FOR TESTING PURPOSES
///
/// Bundles are keyed by cid. Every bundle also owns a metric roster served by the
/// bundle metrics endpoint; updates merge the submitted metrics into it.
#[derive(Debug, Clone, Default)]
pub struct MemoryApi {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    brokers: Mutex<Vec<Broker>>,
    bundles: DashMap<String, CheckBundle>,
    rosters: DashMap<String, Vec<MetricDefinition>>,
    search_override: Mutex<Option<Vec<CheckBundle>>>,
    created: Mutex<Vec<CheckBundle>>,
    updated: Mutex<Vec<CheckBundle>>,
    next_id: AtomicU64,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryApi {
    pub fn new() -> Self {
        let api = MemoryApi::default();
        api.inner.next_id.store(1000, Ordering::SeqCst);
        api
    }

    pub fn set_brokers(&self, brokers: Vec<Broker>) {
        *lock(&self.inner.brokers) = brokers;
    }

    pub fn insert_bundle(&self, bundle: CheckBundle) {
        self.inner.bundles.insert(bundle.cid.clone(), bundle);
    }

    pub fn bundle(&self, cid: &str) -> Option<CheckBundle> {
        self.inner.bundles.get(cid).map(|b| b.value().clone())
    }

    /// Sets the full metric roster (active and inactive) known for a bundle.
    pub fn set_roster(&self, bundle_cid: &str, metrics: Vec<MetricDefinition>) {
        self.inner.rosters.insert(bundle_cid.to_string(), metrics);
    }

    /// Forces the result of every subsequent search, regardless of the criteria.
    pub fn set_search_result(&self, bundles: Vec<CheckBundle>) {
        *lock(&self.inner.search_override) = Some(bundles);
    }

    /// Makes every call fail with a 503 until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<CheckBundle> {
        lock(&self.inner.created).clone()
    }

    pub fn updated(&self) -> Vec<CheckBundle> {
        lock(&self.inner.updated).clone()
    }

    /// Number of calls received, failed ones included.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, path: &str) -> Result<()> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                code: 503,
                path: path.to_string(),
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn merge_roster(&self, bundle_cid: &str, metrics: &[MetricDefinition]) {
        let mut roster = self.inner.rosters.entry(bundle_cid.to_string()).or_default();
        for metric in metrics {
            match roster.iter_mut().find(|m| m.name == metric.name) {
                Some(existing) => *existing = metric.clone(),
                None => roster.push(metric.clone()),
            }
        }
    }
}

// Evaluates the `(key:value)` groups understood by the backend search.
fn matches_criteria(bundle: &CheckBundle, criteria: &str) -> bool {
    criteria
        .split(')')
        .filter_map(|group| group.trim().strip_prefix('('))
        .filter_map(|group| group.split_once(':'))
        .all(|(key, value)| {
            let value = value.trim_matches('"');
            match key {
                "active" => (value == "1") == (bundle.status == STATUS_ACTIVE),
                "type" => bundle.check_type == value,
                "target" => bundle.target == value,
                "display_name" => bundle.display_name == value,
                _ => true,
            }
        })
}

#[async_trait]
impl ApiClient for MemoryApi {
    async fn fetch_brokers(&self) -> Result<Vec<Broker>> {
        self.enter("/broker")?;
        Ok(lock(&self.inner.brokers).clone())
    }

    async fn fetch_check_bundle(&self, cid: &str) -> Result<CheckBundle> {
        self.enter(cid)?;
        self.bundle(cid)
            .ok_or_else(|| ApiError::NotFound(cid.to_string()))
    }

    async fn search_check_bundles(
        &self,
        criteria: &str,
        _filter: Option<&SearchFilter>,
    ) -> Result<Vec<CheckBundle>> {
        self.enter("/check_bundle")?;
        if let Some(result) = lock(&self.inner.search_override).as_ref() {
            return Ok(result.clone());
        }

        let mut found: Vec<CheckBundle> = self
            .inner
            .bundles
            .iter()
            .filter(|entry| matches_criteria(entry.value(), criteria))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.cid.cmp(&b.cid));
        Ok(found)
    }

    async fn create_check_bundle(&self, draft: &CheckBundle) -> Result<CheckBundle> {
        self.enter("/check_bundle")?;
        if draft.target.is_empty() || draft.brokers.is_empty() {
            return Err(ApiError::InvalidArguments(
                "check bundle requires a target and at least one broker".to_string(),
            ));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let mut bundle = draft.clone();
        bundle.cid = format!("/check_bundle/{}", id);
        bundle.checks = vec![format!("/check/{}", id)];
        if bundle.status.is_empty() {
            bundle.status = STATUS_ACTIVE.to_string();
        }

        lock(&self.inner.created).push(draft.clone());
        self.merge_roster(&bundle.cid, &bundle.metrics);
        self.insert_bundle(bundle.clone());
        Ok(bundle)
    }

    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        self.enter(&bundle.cid)?;
        if !self.inner.bundles.contains_key(&bundle.cid) {
            return Err(ApiError::NotFound(bundle.cid.clone()));
        }

        let mut stored = bundle.clone();
        stored.last_modified = Some(bundle.last_modified.unwrap_or(0) + 1);

        lock(&self.inner.updated).push(bundle.clone());
        self.merge_roster(&bundle.cid, &bundle.metrics);
        self.insert_bundle(stored.clone());
        Ok(stored)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.enter(path)?;
        if path.starts_with(CHECK_BUNDLE_METRICS_PREFIX) {
            let bundle_cid = self
                .inner
                .bundles
                .iter()
                .map(|entry| entry.key().clone())
                .find(|cid| bundle_metrics_path(cid) == path)
                .ok_or_else(|| ApiError::NotFound(path.to_string()))?;
            let metrics = self
                .inner
                .rosters
                .get(&bundle_cid)
                .map(|r| r.value().clone())
                .unwrap_or_default();
            let body = serde_json::json!({ "_cid": path, "metrics": metrics });
            return Ok(serde_json::to_vec(&body)?);
        }

        match self.bundle(path) {
            Some(bundle) => Ok(serde_json::to_vec(&bundle)?),
            None => Err(ApiError::NotFound(path.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "in_memory_test.rs"]
mod in_memory_test;

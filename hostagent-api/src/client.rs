use crate::errors::Result;

use async_trait::async_trait;
use hostagent_core::{Broker, CheckBundle};
use std::collections::BTreeMap;

/// Extra `f_<field>=<value>` filters applied on top of a search query.
pub type SearchFilter = BTreeMap<String, Vec<String>>;

/// Operations of the monitoring backend used by the check bundle control plane.
///
/// Timeouts and retries are the provider's concern.
#[async_trait]
pub trait ApiClient {
    async fn fetch_brokers(&self) -> Result<Vec<Broker>>;

    async fn fetch_check_bundle(&self, cid: &str) -> Result<CheckBundle>;

    /// `criteria` uses the backend search syntax, e.g. `(active:1)(type:"json")`.
    async fn search_check_bundles(
        &self,
        criteria: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<CheckBundle>>;

    async fn create_check_bundle(&self, draft: &CheckBundle) -> Result<CheckBundle>;

    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle>;

    /// Raw GET of an API path, for endpoints without a typed wrapper.
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
}

//! Hostagent-Api
//!
//! The monitoring backend API as consumed by the check bundle control plane.
//! Transport and authentication live in the providers; callers only see `ApiClient`.

mod errors;
pub use errors::{ApiError, Result};

mod client;
pub use client::{ApiClient, SearchFilter};

mod providers;
pub use providers::{
    http::{HttpApi, HttpOptions, DEFAULT_API_APP, DEFAULT_API_URL},
    in_memory::MemoryApi,
};

use async_trait::async_trait;
use hostagent_core::{Broker, CheckBundle};

#[derive(Debug, Clone)]
pub enum CheckApi {
    Http(HttpApi),
    InMemory(MemoryApi), // InMemory is used for testing purposes
}

#[async_trait]
impl ApiClient for CheckApi {
    async fn fetch_brokers(&self) -> Result<Vec<Broker>> {
        match self {
            CheckApi::Http(api) => api.fetch_brokers().await,
            CheckApi::InMemory(api) => api.fetch_brokers().await,
        }
    }

    async fn fetch_check_bundle(&self, cid: &str) -> Result<CheckBundle> {
        match self {
            CheckApi::Http(api) => api.fetch_check_bundle(cid).await,
            CheckApi::InMemory(api) => api.fetch_check_bundle(cid).await,
        }
    }

    async fn search_check_bundles(
        &self,
        criteria: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<CheckBundle>> {
        match self {
            CheckApi::Http(api) => api.search_check_bundles(criteria, filter).await,
            CheckApi::InMemory(api) => api.search_check_bundles(criteria, filter).await,
        }
    }

    async fn create_check_bundle(&self, draft: &CheckBundle) -> Result<CheckBundle> {
        match self {
            CheckApi::Http(api) => api.create_check_bundle(draft).await,
            CheckApi::InMemory(api) => api.create_check_bundle(draft).await,
        }
    }

    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        match self {
            CheckApi::Http(api) => api.update_check_bundle(bundle).await,
            CheckApi::InMemory(api) => api.update_check_bundle(bundle).await,
        }
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        match self {
            CheckApi::Http(api) => api.get(path).await,
            CheckApi::InMemory(api) => api.get(path).await,
        }
    }
}

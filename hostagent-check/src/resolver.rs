use crate::broker_selector::BrokerSelector;
use crate::check_metrics::CHECK_BUNDLE_RESOLUTIONS_TOTAL;
use crate::config::{BrokerChoice, CheckConfig};
use crate::errors::{CheckError, Result};

use hostagent_api::{ApiClient, CheckApi};
use hostagent_core::check_bundle::{default_metric_filters, STATUS_ACTIVE};
use hostagent_core::cid::normalize_bundle_cid;
use hostagent_core::{Broker, CheckBundle};
use metrics::counter;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECK_PERIOD: u32 = 60;
pub const DEFAULT_CHECK_TIMEOUT: f32 = 10.0;
pub const CHECK_NOTE: &str = "created by hostagent";

/// Produces the single active check bundle an agent is bound to.
pub struct CheckResolver<'a> {
    api: &'a CheckApi,
    config: &'a CheckConfig,
}

/// Search query used to find the bundle of a target.
pub fn search_criteria(check_type: &str, target: &str) -> String {
    format!(
        "(active:1)(type:\"{}\")(target:\"{}\")",
        check_type, target
    )
}

/// Fails with `NotActive` unless the bundle is usable.
pub fn ensure_active(bundle: &CheckBundle) -> Result<()> {
    if bundle.is_active() {
        return Ok(());
    }
    Err(CheckError::NotActive {
        cid: bundle.cid.clone(),
        checks: bundle.checks.clone(),
        status: bundle.status.clone(),
    })
}

impl<'a> CheckResolver<'a> {
    pub fn new(api: &'a CheckApi, config: &'a CheckConfig) -> Self {
        CheckResolver { api, config }
    }

    /// Resolves the bundle: by explicit id, else by search, else by creating it when allowed.
    ///
    /// The broker list is only fetched when a bundle has to be created.
    pub async fn resolve(&self, selector: &mut BrokerSelector) -> Result<CheckBundle> {
        let (method, bundle) = match &self.config.bundle_id {
            Some(cid) => ("id", self.fetch_by_id(cid).await),
            None => match self.search().await {
                Ok(Some(bundle)) => ("search", Ok(bundle)),
                Ok(None) if self.config.create => {
                    ("create", self.create_from_broker_list(selector).await)
                }
                Ok(None) => (
                    "search",
                    Err(CheckError::NotFound {
                        check_type: self.config.check_type.clone(),
                        target: self.config.target.clone(),
                    }),
                ),
                Err(e) => ("search", Err(e)),
            },
        };

        record(method, bundle.as_ref().err());
        bundle
    }

    async fn create_from_broker_list(&self, selector: &mut BrokerSelector) -> Result<CheckBundle> {
        let brokers = self
            .api
            .fetch_brokers()
            .await
            .map_err(|e| CheckError::api("fetching broker list", e))?;
        self.create(&brokers, selector).await
    }

    /// Fetches a bundle by id, bare number or `/check_bundle/<n>`.
    pub async fn fetch_by_id(&self, cid: &str) -> Result<CheckBundle> {
        let cid = normalize_bundle_cid(cid)?;

        let bundle = self
            .api
            .fetch_check_bundle(&cid)
            .await
            .map_err(|e| CheckError::api(format!("fetching check bundle {}", cid), e))?;
        ensure_active(&bundle)?;

        info!(cid = %bundle.cid, check_type = %bundle.check_type, "using check bundle");
        Ok(bundle)
    }

    /// Searches the active bundle of the configured type and target.
    ///
    /// `None` when nothing matches; more than one match is never guessed between.
    pub async fn search(&self) -> Result<Option<CheckBundle>> {
        if self.config.target.is_empty() {
            return Err(CheckError::EmptyTarget);
        }

        let criteria = search_criteria(&self.config.check_type, &self.config.target);
        debug!(criteria = %criteria, "searching check bundle");

        let mut found = self
            .api
            .search_check_bundles(&criteria, None)
            .await
            .map_err(|e| CheckError::api(format!("searching check bundles {}", criteria), e))?;

        match found.len() {
            0 => {
                info!(target = %self.config.target, check_type = %self.config.check_type, "no check bundle found");
                Ok(None)
            }
            1 => {
                let bundle = found.remove(0);
                ensure_active(&bundle)?;
                info!(cid = %bundle.cid, target = %bundle.target, "found check bundle");
                Ok(Some(bundle))
            }
            count => Err(CheckError::Ambiguous {
                count,
                check_type: self.config.check_type.clone(),
                target: self.config.target.clone(),
            }),
        }
    }

    /// Creates the bundle, bound to the configured broker or to one picked out of `brokers`.
    pub async fn create(
        &self,
        brokers: &[Broker],
        selector: &mut BrokerSelector,
    ) -> Result<CheckBundle> {
        if self.config.target.is_empty() {
            return Err(CheckError::EmptyTarget);
        }

        let broker_cid = match &self.config.broker {
            BrokerChoice::Id(cid) => {
                if !brokers.iter().any(|b| &b.cid == cid) {
                    return Err(CheckError::Config(format!(
                        "broker {} not found in broker list",
                        cid
                    )));
                }
                cid.clone()
            }
            BrokerChoice::Select => selector.select(&self.config.check_type, brokers).await?.cid,
        };

        let draft = self.draft(broker_cid);
        info!(
            target = %draft.target,
            check_type = %draft.check_type,
            broker = ?draft.brokers,
            "creating check bundle"
        );

        let bundle = self
            .api
            .create_check_bundle(&draft)
            .await
            .map_err(|e| CheckError::api(format!("creating check bundle for {}", draft.target), e))?;
        ensure_active(&bundle)?;

        info!(cid = %bundle.cid, "created check bundle");
        Ok(bundle)
    }

    /// The create request for the configured target.
    pub fn draft(&self, broker_cid: String) -> CheckBundle {
        CheckBundle {
            brokers: vec![broker_cid],
            config: BTreeMap::new(),
            display_name: self.config.display_name(),
            metric_filters: self
                .config
                .metric_filters
                .clone()
                .unwrap_or_else(default_metric_filters),
            metrics: Vec::new(),
            notes: Some(CHECK_NOTE.to_string()),
            period: DEFAULT_CHECK_PERIOD,
            status: STATUS_ACTIVE.to_string(),
            tags: self.config.tags.clone(),
            target: self.config.target.clone(),
            timeout: DEFAULT_CHECK_TIMEOUT,
            check_type: self.config.check_type.clone(),
            ..Default::default()
        }
    }
}

fn record(method: &'static str, error: Option<&CheckError>) {
    let result = match error {
        None => "ok",
        Some(e) => {
            warn!(method, error = %e, "check bundle resolution failed");
            "error"
        }
    };
    counter!(CHECK_BUNDLE_RESOLUTIONS_TOTAL.name, "method" => method, "result" => result)
        .increment(1);
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;

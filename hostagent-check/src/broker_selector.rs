use crate::check_metrics::BROKER_PROBE_FAILURES_TOTAL;
use crate::errors::{CheckError, Result};
use crate::prober::Prober;

use hostagent_core::Broker;
use metrics::counter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Brokers slower than this are never considered.
pub const MAX_BROKER_LATENCY: Duration = Duration::from_secs(10);

/// BrokerSelector picks the broker a new check bundle is bound to.
///
/// Latency only breaks ties: the fastest brokers form the candidate set, dedicated
/// (enterprise) brokers win over shared ones, and the remaining tie is resolved at
/// random so a fleet of agents spreads over equally fast brokers.
pub struct BrokerSelector {
    prober: Arc<dyn Prober>,
    max_response_time: Duration,
    max_attempts: u32,
    rng: StdRng,
}

impl BrokerSelector {
    pub fn new(prober: Arc<dyn Prober>, max_response_time: Duration, max_attempts: u32) -> Self {
        Self::with_rng(
            prober,
            max_response_time,
            max_attempts,
            StdRng::from_os_rng(),
        )
    }

    /// Uses the given random source for tie breaks (seed it for reproducible picks).
    pub fn with_rng(
        prober: Arc<dyn Prober>,
        max_response_time: Duration,
        max_attempts: u32,
        rng: StdRng,
    ) -> Self {
        BrokerSelector {
            prober,
            max_response_time,
            max_attempts,
            rng,
        }
    }

    /// Selects one broker able to run `check_type` out of `brokers`.
    ///
    /// Brokers are probed sequentially, in list order.
    pub async fn select(&mut self, check_type: &str, brokers: &[Broker]) -> Result<Broker> {
        if brokers.is_empty() {
            return Err(CheckError::NoBrokers);
        }

        let mut threshold = MAX_BROKER_LATENCY;
        let mut candidates: Vec<&Broker> = Vec::new();

        for broker in brokers {
            let Some(latency) = self.broker_latency(check_type, broker).await else {
                continue;
            };

            if latency < threshold {
                candidates.clear();
                threshold = latency;
                candidates.push(broker);
            } else if latency == threshold {
                candidates.push(broker);
            } else {
                debug!(broker = %broker.cid, latency = ?latency, threshold = ?threshold, "broker slower than current candidates");
            }
        }

        if candidates.iter().any(|b| b.is_enterprise()) {
            candidates.retain(|b| b.is_enterprise());
        }

        let selected = match candidates.len() {
            0 => {
                return Err(CheckError::NoValidBroker {
                    considered: brokers.len(),
                })
            }
            1 => candidates[0],
            n => candidates[self.rng.random_range(0..n)],
        };

        info!(
            broker = %selected.cid,
            name = %selected.name,
            latency = ?threshold,
            "selected broker"
        );
        Ok(selected.clone())
    }

    // Latency of the first active node supporting the check type that answers.
    async fn broker_latency(&self, check_type: &str, broker: &Broker) -> Option<Duration> {
        for detail in &broker.details {
            if !detail.is_active() {
                debug!(broker = %broker.cid, cn = %detail.cn, status = %detail.status, "skipping inactive broker node");
                continue;
            }
            if !detail.supports(check_type) {
                debug!(broker = %broker.cid, cn = %detail.cn, check_type = %check_type, "broker node does not support check type");
                continue;
            }

            let Some((host, port)) = detail.endpoint() else {
                warn!(broker = %broker.cid, cn = %detail.cn, "broker node has no address");
                continue;
            };

            match self
                .prober
                .probe(&host, port, self.max_response_time, self.max_attempts)
                .await
            {
                Some(latency) => {
                    debug!(broker = %broker.cid, host = %host, port, latency = ?latency, "broker node reachable");
                    return Some(latency);
                }
                None => {
                    counter!(BROKER_PROBE_FAILURES_TOTAL.name, "broker" => broker.cid.clone())
                        .increment(1);
                    warn!(broker = %broker.cid, host = %host, port, "broker node unreachable");
                }
            }
        }

        None
    }
}

#[cfg(test)]
#[path = "broker_selector_test.rs"]
mod broker_selector_test;

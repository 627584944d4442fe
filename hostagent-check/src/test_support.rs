use crate::broker_selector::BrokerSelector;
use crate::prober::Prober;

use async_trait::async_trait;
use hostagent_core::broker::BROKER_CLASS_SHARED;
use hostagent_core::{Broker, BrokerDetail, CheckBundle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers with a fixed latency per host; unknown hosts are unreachable.
#[derive(Default)]
pub(crate) struct ScriptedProber {
    latencies: HashMap<String, Duration>,
    probed: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub(crate) fn new(latencies: &[(&str, u64)]) -> Self {
        ScriptedProber {
            latencies: latencies
                .iter()
                .map(|(host, ms)| (host.to_string(), Duration::from_millis(*ms)))
                .collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, host: &str, _port: u16, _t: Duration, _n: u32) -> Option<Duration> {
        self.probed.lock().unwrap().push(host.to_string());
        self.latencies.get(host).copied()
    }
}

pub(crate) fn node(host: &str, status: &str, modules: &[&str]) -> BrokerDetail {
    BrokerDetail {
        cn: host.to_string(),
        ipaddress: Some(host.to_string()),
        modules: modules.iter().map(|m| m.to_string()).collect(),
        status: status.to_string(),
        ..Default::default()
    }
}

pub(crate) fn broker(id: u32, class: &str, details: Vec<BrokerDetail>) -> Broker {
    Broker {
        cid: format!("/broker/{}", id),
        name: format!("broker-{}", id),
        class: class.to_string(),
        details,
    }
}

pub(crate) fn shared_broker(id: u32, host: &str) -> Broker {
    broker(
        id,
        BROKER_CLASS_SHARED,
        vec![node(host, "active", &["json", "httptrap"])],
    )
}

pub(crate) fn seeded_selector(prober: Arc<ScriptedProber>, seed: u64) -> BrokerSelector {
    BrokerSelector::with_rng(
        prober,
        Duration::from_millis(500),
        1,
        StdRng::seed_from_u64(seed),
    )
}

pub(crate) fn bundle(id: u32, target: &str, status: &str) -> CheckBundle {
    CheckBundle {
        cid: format!("/check_bundle/{}", id),
        checks: vec![format!("/check/{}", id)],
        brokers: vec!["/broker/1".to_string()],
        display_name: format!("{} /agent", target),
        period: 60,
        status: status.to_string(),
        target: target.to_string(),
        check_type: "json:nad".to_string(),
        ..Default::default()
    }
}

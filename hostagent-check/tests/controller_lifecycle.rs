//! End to end check bundle lifecycle against the in-memory API and real TCP probing

use anyhow::Result;
use hostagent_api::{CheckApi, MemoryApi};
use hostagent_check::{BundleController, CheckConfig, CheckError, CheckSettings, TcpProber};
use hostagent_core::broker::{BROKER_CLASS_ENTERPRISE, BROKER_CLASS_SHARED};
use hostagent_core::{Broker, BrokerDetail, MetricValue, Metrics};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

fn local_broker(id: u32, class: &str, port: u16, status: &str) -> Broker {
    Broker {
        cid: format!("/broker/{}", id),
        name: format!("local-{}", id),
        class: class.to_string(),
        details: vec![BrokerDetail {
            cn: format!("local-{}", id),
            ipaddress: Some("127.0.0.1".to_string()),
            port: Some(port),
            modules: vec!["json".to_string(), "httptrap".to_string()],
            status: status.to_string(),
            ..Default::default()
        }],
    }
}

#[tokio::test]
/// What this test validates
///
/// - Scenario: no bundle exists for the target, creation is allowed, brokers are probed
///   over real TCP. One broker listens locally, the other is inactive.
/// - Expectations: the reachable broker is bound to the created bundle; a second agent
///   start with the same settings finds the bundle by search instead of creating another.
async fn create_then_find_by_search() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let memory = MemoryApi::new();
    memory.set_brokers(vec![
        local_broker(1, BROKER_CLASS_ENTERPRISE, port, "decommissioned"),
        local_broker(2, BROKER_CLASS_SHARED, port, "active"),
    ]);

    let settings = CheckSettings {
        target: Some("web01".to_string()),
        create: true,
        tags: Some("role:web".to_string()),
        broker_max_retries: Some(1),
        ..Default::default()
    };
    let config = CheckConfig::try_from(settings)?;

    let first = BundleController::new(
        CheckApi::InMemory(memory.clone()),
        config.clone(),
        Arc::new(TcpProber),
    );
    first.initialize().await?;
    let created = first.info().await?;
    assert_eq!(created.brokers, vec!["/broker/2"]);
    assert_eq!(created.display_name, "web01 /agent");
    assert_eq!(memory.created().len(), 1);

    let second = BundleController::new(
        CheckApi::InMemory(memory.clone()),
        config,
        Arc::new(TcpProber),
    );
    second.initialize().await?;
    assert_eq!(second.cid().await?, created.cid);
    assert_eq!(memory.created().len(), 1);
    Ok(())
}

#[tokio::test]
/// Creation with no reachable broker fails startup and never submits a bundle.
async fn create_without_reachable_broker_fails() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let memory = MemoryApi::new();
    memory.set_brokers(vec![local_broker(1, BROKER_CLASS_SHARED, port, "active")]);

    let config = CheckConfig::try_from(CheckSettings {
        target: Some("web01".to_string()),
        create: true,
        broker_max_retries: Some(1),
        broker_max_response_time: Some("200ms".to_string()),
        ..Default::default()
    })?;
    let controller =
        BundleController::new(CheckApi::InMemory(memory.clone()), config, Arc::new(TcpProber));

    let err = controller.initialize().await.unwrap_err();
    assert!(matches!(err, CheckError::NoValidBroker { considered: 1 }));
    assert!(!controller.is_initialized().await);
    assert!(memory.created().is_empty());
    Ok(())
}

#[tokio::test]
/// Legacy metric management across a restart: state persisted by the first agent is
/// picked up by the second, which only submits metrics it has never seen.
async fn legacy_metric_state_survives_restart() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let state_dir = TempDir::new()?;

    let memory = MemoryApi::new();
    memory.set_brokers(vec![local_broker(1, BROKER_CLASS_SHARED, port, "active")]);

    let config = CheckConfig::try_from(CheckSettings {
        target: Some("db01".to_string()),
        create: true,
        enable_new_metrics: true,
        metric_state_dir: Some(state_dir.path().to_path_buf()),
        broker_max_retries: Some(1),
        ..Default::default()
    })?;

    let batch = |names: &[&str]| -> Metrics {
        names
            .iter()
            .map(|n| (n.to_string(), MetricValue::Scalar(1.0)))
            .collect()
    };

    let first = BundleController::new(
        CheckApi::InMemory(memory.clone()),
        config.clone(),
        Arc::new(TcpProber),
    );
    first.initialize().await?;
    assert!(first.is_managing_metrics().await);
    // seeds the (empty) state
    first.enable_new_metrics(&batch(&["cpu"])).await?;
    // submits cpu
    first.enable_new_metrics(&batch(&["cpu"])).await?;
    assert_eq!(memory.updated().len(), 1);

    let restarted = BundleController::new(
        CheckApi::InMemory(memory.clone()),
        config,
        Arc::new(TcpProber),
    );
    restarted.initialize().await?;
    restarted.enable_new_metrics(&batch(&["cpu", "mem"])).await?;

    let updates = memory.updated();
    assert_eq!(updates.len(), 2);
    let names: Vec<&str> = updates[1].metrics.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["cpu", "mem"]);
    assert_eq!(
        updates[1].metrics.iter().filter(|m| m.name == "mem").count(),
        1
    );
    Ok(())
}

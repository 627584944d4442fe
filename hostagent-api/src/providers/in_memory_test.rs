use super::*;
use hostagent_core::MetricKind;

fn bundle(cid: &str, target: &str, check_type: &str, status: &str) -> CheckBundle {
    CheckBundle {
        cid: cid.to_string(),
        target: target.to_string(),
        check_type: check_type.to_string(),
        status: status.to_string(),
        brokers: vec!["/broker/35".to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_matches_criteria() -> Result<()> {
    let api = MemoryApi::new();
    api.insert_bundle(bundle("/check_bundle/1", "web01", "json:nad", "active"));
    api.insert_bundle(bundle("/check_bundle/2", "web02", "json:nad", "active"));
    api.insert_bundle(bundle("/check_bundle/3", "web01", "json:nad", "disabled"));
    api.insert_bundle(bundle("/check_bundle/4", "web01", "httptrap", "active"));

    let found = api
        .search_check_bundles(r#"(active:1)(type:"json:nad")(target:"web01")"#, None)
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].cid, "/check_bundle/1");

    let none = api
        .search_check_bundles(r#"(active:1)(type:"json:nad")(target:"db01")"#, None)
        .await?;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_create_assigns_cid_and_records_draft() -> Result<()> {
    let api = MemoryApi::new();
    let draft = CheckBundle {
        cid: String::new(),
        ..bundle("", "web01", "json:nad", "")
    };

    let created = api.create_check_bundle(&draft).await?;
    assert!(created.cid.starts_with("/check_bundle/"));
    assert_eq!(created.checks.len(), 1);
    assert!(created.is_active());
    assert_eq!(api.created(), vec![draft]);
    assert_eq!(api.fetch_check_bundle(&created.cid).await?, created);
    Ok(())
}

#[tokio::test]
async fn test_update_merges_roster() -> Result<()> {
    let api = MemoryApi::new();
    api.insert_bundle(bundle("/check_bundle/7", "web01", "json:nad", "active"));
    api.set_roster(
        "/check_bundle/7",
        vec![MetricDefinition::new("cpu", MetricKind::Numeric, "available")],
    );

    let mut update = api.fetch_check_bundle("/check_bundle/7").await?;
    update.metrics = vec![
        MetricDefinition::new("cpu", MetricKind::Numeric, "active"),
        MetricDefinition::new("latency", MetricKind::Histogram, "active"),
    ];
    api.update_check_bundle(&update).await?;

    let raw = api.get("/check_bundle_metrics/7").await?;
    let body: serde_json::Value = serde_json::from_slice(&raw)?;
    let metrics: Vec<MetricDefinition> = serde_json::from_value(body["metrics"].clone())?;
    assert_eq!(metrics.len(), 2);
    assert!(metrics.iter().all(|m| m.status == "active"));
    assert_eq!(api.updated().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_fails_every_call() {
    let api = MemoryApi::new();
    api.set_unavailable(true);
    let err = api.fetch_brokers().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { code: 503, .. }));
    assert_eq!(api.calls(), 1);
}

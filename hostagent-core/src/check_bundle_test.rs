use super::*;

#[test]
fn test_parse_metric_filters() {
    let filters =
        parse_metric_filters(r#"[["allow", "^cpu", "cpu metrics"], ["deny", ".*"]]"#).unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].action, "allow");
    assert_eq!(filters[0].pattern, "^cpu");
    assert_eq!(filters[0].comment, "cpu metrics");
    assert_eq!(filters[1].action, "deny");
    assert_eq!(filters[1].comment, "");
}

#[test]
fn test_parse_metric_filters_rejects_bad_rules() {
    assert!(parse_metric_filters(r#"[["block", "^cpu", ""]]"#).is_err());
    assert!(parse_metric_filters(r#"[["allow", "([", ""]]"#).is_err());
    assert!(parse_metric_filters(r#"[["allow"]]"#).is_err());
    assert!(parse_metric_filters("not json").is_err());
}

#[test]
fn test_metric_filter_serializes_as_triple() {
    let json = serde_json::to_value(default_metric_filters()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([["deny", "^$", ""], ["allow", "^.+$", ""]])
    );
}

#[test]
fn test_check_bundle_deserialize() {
    let raw = r#"{
        "_cid": "/check_bundle/1234",
        "_checks": ["/check/5678"],
        "brokers": ["/broker/35"],
        "config": {"submission_url": "https://trap.noit.circonus.net/module/httptrap/abc/secret"},
        "display_name": "web01 /agent",
        "metric_filters": [["deny", "^$", ""], ["allow", "^.+$", ""]],
        "metrics": [],
        "period": 60,
        "status": "active",
        "tags": ["env:prod"],
        "target": "web01",
        "timeout": 10,
        "type": "httptrap"
    }"#;
    let bundle: CheckBundle = serde_json::from_str(raw).unwrap();
    assert!(bundle.is_active());
    assert_eq!(bundle.check_cid(), Some("/check/5678"));
    assert_eq!(
        bundle.submission_url(),
        Some("https://trap.noit.circonus.net/module/httptrap/abc/secret")
    );
    assert_eq!(bundle.metric_filters, default_metric_filters());
    assert_eq!(bundle.period, 60);
}

#[test]
fn test_draft_omits_server_fields() {
    let draft = CheckBundle {
        target: "web01".to_string(),
        check_type: "json:nad".to_string(),
        ..Default::default()
    };
    let json = serde_json::to_value(&draft).unwrap();
    assert!(json.get("_cid").is_none());
    assert!(json.get("_checks").is_none());
    assert_eq!(json["type"], "json:nad");
}

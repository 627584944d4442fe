use crate::errors::{CoreError, Result};
use regex::Regex;
use std::sync::LazyLock;

pub const CHECK_BUNDLE_PREFIX: &str = "/check_bundle/";
pub const CHECK_BUNDLE_METRICS_PREFIX: &str = "/check_bundle_metrics/";
pub const BROKER_PREFIX: &str = "/broker/";

static NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("static numeric id pattern"));
static CHECK_BUNDLE_CID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/check_bundle/[0-9]+$").expect("static check bundle pattern"));
static BROKER_CID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/broker/[0-9]+$").expect("static broker pattern"));

/// Normalizes a check bundle identifier into its canonical `/check_bundle/<n>` form.
///
/// Accepts either a bare integer or the canonical form; anything else is rejected
/// before it can reach the API.
pub fn normalize_bundle_cid(input: &str) -> Result<String> {
    normalize(input, CHECK_BUNDLE_PREFIX, &CHECK_BUNDLE_CID).map_err(CoreError::InvalidCid)
}

/// Same as [`normalize_bundle_cid`] for broker identifiers (`/broker/<n>`).
pub fn normalize_broker_cid(input: &str) -> Result<String> {
    normalize(input, BROKER_PREFIX, &BROKER_CID).map_err(CoreError::InvalidBrokerId)
}

// on failure returns the text used in the error message
fn normalize(
    input: &str,
    prefix: &str,
    canonical: &Regex,
) -> std::result::Result<String, String> {
    if input.is_empty() {
        return Err("empty".to_string());
    }

    let cid = if NUMERIC_ID.is_match(input) {
        format!("{}{}", prefix, input)
    } else {
        input.to_string()
    };

    if !canonical.is_match(&cid) {
        return Err(input.to_string());
    }

    Ok(cid)
}

/// Path of the endpoint listing every metric the broker knows for a bundle,
/// including those not yet active.
pub fn bundle_metrics_path(bundle_cid: &str) -> String {
    bundle_cid.replacen(CHECK_BUNDLE_PREFIX, CHECK_BUNDLE_METRICS_PREFIX, 1)
}

#[cfg(test)]
#[path = "cid_test.rs"]
mod cid_test;

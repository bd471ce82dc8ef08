//! Upstream document schema and validation.

use relaysync_types::{IpRangeSet, SyncConfig, FILTER_ANY};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Deserialize)]
struct RangeDocument {
    items: Vec<RangeItem>,
}

#[derive(Debug, Deserialize)]
struct RangeItem {
    cidr: String,
    #[serde(default)]
    product: Option<Value>,
    #[serde(default)]
    direction: Option<Value>,
}

/// Item filters on the `product` and `direction` lists.
///
/// An empty list, or one containing `*`, accepts every item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeFilter {
    pub product: Vec<String>,
    pub direction: Vec<String>,
}

impl RangeFilter {
    pub fn new(product: Vec<String>, direction: Vec<String>) -> Self {
        Self { product, direction }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.product_filter.clone(), config.direction_filter.clone())
    }

    /// True when no item can be filtered out.
    pub fn accepts_all(&self) -> bool {
        is_open(&self.product) && is_open(&self.direction)
    }

    fn accepts(&self, item: &RangeItem) -> bool {
        list_matches(&self.product, item.product.as_ref())
            && list_matches(&self.direction, item.direction.as_ref())
    }
}

fn is_open(wanted: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| w == FILTER_ANY)
}

fn list_matches(wanted: &[String], field: Option<&Value>) -> bool {
    if is_open(wanted) {
        return true;
    }
    let values: Vec<&str> = match field {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(single)) => vec![single.as_str()],
        _ => return false,
    };
    values.iter().any(|v| wanted.iter().any(|w| w.eq_ignore_ascii_case(v)))
}

/// Parse an upstream document into a validated range set.
///
/// Fails without partial results when the JSON is malformed, an item lacks a
/// string `cidr`, any prefix is not valid CIDR, or nothing survives filtering.
pub fn parse_document(body: &str, filter: &RangeFilter) -> CoreResult<IpRangeSet> {
    let document: RangeDocument = serde_json::from_str(body)?;
    let total = document.items.len();

    let mut prefixes = Vec::with_capacity(total);
    for (index, item) in document.items.iter().enumerate() {
        let net = IpRangeSet::parse_prefix(&item.cidr).map_err(|e| {
            CoreError::Document(format!("item {index}: invalid CIDR {:?}: {e}", item.cidr))
        })?;
        if filter.accepts(item) {
            prefixes.push(net);
        }
    }

    let set: IpRangeSet = prefixes.into_iter().collect();
    if set.is_empty() {
        return Err(CoreError::Document(format!(
            "document contained no usable ranges ({total} items before filtering)"
        )));
    }

    tracing::debug!("[Sync] Parsed {} unique ranges from {} items", set.len(), total);
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaysync_types::SyncErrorKind;

    fn atlassian_sample() -> &'static str {
        r#"{
            "creationDate": "2024-05-01T00:00:00.000000",
            "syncToken": 1714521600,
            "items": [
                {"network": "13.52.5.0", "mask_len": 25, "cidr": "13.52.5.0/25",
                 "mask": "255.255.255.128", "region": ["us-west-1"],
                 "product": ["email"], "direction": ["egress"]},
                {"network": "18.184.99.128", "mask_len": 25, "cidr": "18.184.99.128/25",
                 "product": ["jira", "confluence"], "direction": ["ingress", "egress"]},
                {"cidr": "2401:1d80:3000::/36", "product": ["email"], "direction": ["egress"]},
                {"cidr": "13.52.5.0/25", "product": ["email"], "direction": ["egress"]}
            ]
        }"#
    }

    #[test]
    fn test_parse_without_filter_keeps_everything_once() {
        let set = parse_document(atlassian_sample(), &RangeFilter::default()).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_parse_with_product_and_direction_filter() {
        let filter = RangeFilter::new(vec!["email".into()], vec!["egress".into()]);
        let set = parse_document(atlassian_sample(), &filter).unwrap();
        let rendered: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["13.52.5.0/25", "2401:1d80:3000::/36"]);
    }

    #[test]
    fn test_default_config_drops_non_email_ranges() {
        let filter = RangeFilter::from_config(&SyncConfig::default());
        assert!(!filter.accepts_all());

        let body = r#"{"items":[
            {"cidr":"13.52.5.0/25","product":["email"],"direction":["egress"]},
            {"cidr":"18.184.99.128/25","product":["jira"],"direction":["egress"]},
            {"cidr":"104.192.136.0/21","product":["bitbucket"],"direction":["ingress"]},
            {"cidr":"13.52.6.0/25","product":["email"],"direction":["ingress"]}
        ]}"#;
        let set = parse_document(body, &filter).unwrap();
        let rendered: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["13.52.5.0/25"]);
    }

    #[test]
    fn test_wildcard_filter_accepts_everything() {
        let filter = RangeFilter::new(vec![FILTER_ANY.into()], vec![FILTER_ANY.into()]);
        assert!(filter.accepts_all());
        let set = parse_document(atlassian_sample(), &filter).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_minimal_document() {
        let set =
            parse_document(r#"{"items":[{"cidr":"3.4.5.0/24"}]}"#, &RangeFilter::default()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_document(r#"{"items":[{"cidr":"3.4.5.0/24"}"#, &RangeFilter::default())
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Parse);
    }

    #[test]
    fn test_missing_items_is_parse_error() {
        let err = parse_document(r#"{"prefixes":[]}"#, &RangeFilter::default()).unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Parse);
    }

    #[test]
    fn test_missing_cidr_is_parse_error() {
        let err = parse_document(r#"{"items":[{"network":"3.4.5.0"}]}"#, &RangeFilter::default())
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Parse);
    }

    #[test]
    fn test_invalid_cidr_rejects_whole_document() {
        let body = r#"{"items":[{"cidr":"3.4.5.0/24"},{"cidr":"3.4.5.300/24"}]}"#;
        let err = parse_document(body, &RangeFilter::default()).unwrap_err();
        assert!(matches!(err, CoreError::Document(ref m) if m.contains("item 1")));
    }

    #[test]
    fn test_invalid_cidr_in_filtered_out_item_still_rejected() {
        let body = r#"{"items":[
            {"cidr":"3.4.5.0/24","product":["email"]},
            {"cidr":"bogus","product":["jira"]}
        ]}"#;
        let filter = RangeFilter::new(vec!["email".into()], Vec::new());
        assert!(parse_document(body, &filter).is_err());
    }

    #[test]
    fn test_empty_result_is_parse_error() {
        let err = parse_document(r#"{"items":[]}"#, &RangeFilter::default()).unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Parse);

        let filter = RangeFilter::new(vec!["email".into()], Vec::new());
        let body = r#"{"items":[{"cidr":"3.4.5.0/24","product":["jira"]}]}"#;
        assert_eq!(parse_document(body, &filter).unwrap_err().kind(), SyncErrorKind::Parse);
    }

    #[test]
    fn test_filter_ignores_items_without_field() {
        let filter = RangeFilter::new(vec!["email".into()], Vec::new());
        let body = r#"{"items":[{"cidr":"3.4.5.0/24"},{"cidr":"4.4.4.0/24","product":"email"}]}"#;
        let set = parse_document(body, &filter).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&"4.4.4.0/24".parse().unwrap()));
    }
}

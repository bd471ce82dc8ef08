//! Set of network prefixes published by the upstream.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::btree_set::{self, BTreeSet};
use std::str::FromStr;

/// Immutable, duplicate-free set of CIDR prefixes from one fetch.
///
/// Members are stored with host bits cleared, so `3.4.5.9/24` and `3.4.5.0/24`
/// collapse into a single entry. Iteration order is the stable `IpNet` order
/// (IPv4 before IPv6, then by address and prefix length).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IpRangeSet(BTreeSet<IpNet>);

/// Members added and removed between two sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeDiff {
    pub added: Vec<IpNet>,
    pub removed: Vec<IpNet>,
}

impl IpRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single prefix in strict CIDR notation (`addr/len`).
    pub fn parse_prefix(raw: &str) -> Result<IpNet, ipnet::AddrParseError> {
        IpNet::from_str(raw.trim()).map(|net| net.trunc())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, net: &IpNet) -> bool {
        self.0.contains(&net.trunc())
    }

    pub fn iter(&self) -> btree_set::Iter<'_, IpNet> {
        self.0.iter()
    }

    /// What changed going from `previous` to `self`.
    pub fn diff(&self, previous: &Self) -> RangeDiff {
        RangeDiff {
            added: self.0.difference(&previous.0).copied().collect(),
            removed: previous.0.difference(&self.0).copied().collect(),
        }
    }
}

impl FromIterator<IpNet> for IpRangeSet {
    fn from_iter<I: IntoIterator<Item = IpNet>>(iter: I) -> Self {
        Self(iter.into_iter().map(|net| net.trunc()).collect())
    }
}

impl<'a> IntoIterator for &'a IpRangeSet {
    type Item = &'a IpNet;
    type IntoIter = btree_set::Iter<'a, IpNet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_duplicates_collapse() {
        let set: IpRangeSet =
            [net("3.4.5.0/24"), net("3.4.5.0/24"), net("3.4.5.77/24")].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&net("3.4.5.0/24")));
    }

    #[test]
    fn test_equality_is_order_independent() {
        let a: IpRangeSet = [net("10.0.0.0/8"), net("2001:db8::/32")].into_iter().collect();
        let b: IpRangeSet = [net("2001:db8::/32"), net("10.0.0.0/8")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let set: IpRangeSet =
            [net("2001:db8::/32"), net("13.0.0.0/8"), net("3.0.0.0/8")].into_iter().collect();
        let rendered: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["3.0.0.0/8", "13.0.0.0/8", "2001:db8::/32"]);
    }

    #[test]
    fn test_parse_prefix_rejects_bare_address() {
        assert!(IpRangeSet::parse_prefix("1.2.3.4").is_err());
        assert!(IpRangeSet::parse_prefix("1.2.3.4/33").is_err());
        assert!(IpRangeSet::parse_prefix("not-a-cidr").is_err());
        assert_eq!(IpRangeSet::parse_prefix(" 1.2.3.4/24 ").unwrap(), net("1.2.3.0/24"));
    }

    #[test]
    fn test_diff() {
        let old: IpRangeSet = [net("1.0.0.0/8"), net("2.0.0.0/8")].into_iter().collect();
        let new: IpRangeSet = [net("2.0.0.0/8"), net("3.0.0.0/8")].into_iter().collect();
        let diff = new.diff(&old);
        assert_eq!(diff.added, vec![net("3.0.0.0/8")]);
        assert_eq!(diff.removed, vec![net("1.0.0.0/8")]);
        assert_eq!(new.diff(&new), RangeDiff::default());
    }

    #[test]
    fn test_serializes_as_string_list() {
        let set: IpRangeSet = [net("3.4.5.0/24")].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["3.4.5.0/24"]"#);
    }
}

//! Route records and the configured/dynamic route lists.
//!
//! Each wildcard template and each dynamic route materialised from it
//! is an owned, independent `Mroute4` living in a `Vec` rather than an
//! intrusive linked list with raw back-references.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::consts::{MAX_MIF, MAX_VIF};
use crate::utils::groups_match;

/// Sentinel source address marking an IPv4 wildcard `(*,G)` route.
pub const ANY_SOURCE: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// A concrete or wildcard IPv4 multicast route.
///
/// `sender == ANY_SOURCE` marks a wildcard template living in
/// [`RouteStore::conf_list`]; any other sender is either a route installed
/// directly or a dynamic instance materialised from a wildcard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mroute4 {
    pub sender: Ipv4Addr,
    pub group: Ipv4Addr,
    /// Prefix length in bits over `group`, `0..=32`. `0` is treated as
    /// an exact match (`/32`), not match-all.
    pub len: u8,
    /// Ingress VIF slot.
    pub inbound: usize,
    /// Per-outbound-VIF TTL; a zero entry means "do not forward there".
    pub ttl: [u8; MAX_VIF],
}

impl Mroute4 {
    /// A concrete `(S,G)` route with an all-zero outbound fan-out (the
    /// caller or `dyn_add` fills in `ttl` afterwards).
    pub fn new(sender: Ipv4Addr, group: Ipv4Addr, len: u8, inbound: usize) -> Self {
        Mroute4 {
            sender,
            group,
            len,
            inbound,
            ttl: [0; MAX_VIF],
        }
    }

    /// Whether this route is a wildcard template.
    pub fn is_wildcard(&self) -> bool {
        self.sender == ANY_SOURCE
    }
}

/// A concrete IPv6 multicast route. IPv6 has no wildcard expansion, so
/// there is no `len`/sentinel-source analogue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mroute6 {
    pub sender: Ipv6Addr,
    pub group: Ipv6Addr,
    /// Ingress MIF slot.
    pub inbound: usize,
    /// Per-outbound-MIF TTL; a zero entry means "do not forward there".
    pub ttl: [u8; MAX_MIF],
}

impl Mroute6 {
    pub fn new(sender: Ipv6Addr, group: Ipv6Addr, inbound: usize) -> Self {
        Mroute6 {
            sender,
            group,
            inbound,
            ttl: [0; MAX_MIF],
        }
    }
}

/// Does `cand` fall inside the `(rule.inbound, rule.group/rule.len)`
/// wildcard?
pub fn matches(rule: &Mroute4, cand: &Mroute4) -> bool {
    rule.inbound == cand.inbound && groups_match(rule.group, cand.group, rule.len)
}

/// The IPv4 route store: `conf_list` (wildcard templates) and `dyn_list`
/// (materialised dynamics). IPv6 has neither.
#[derive(Clone, Debug, Default)]
pub struct RouteStore {
    conf_list: Vec<Mroute4>,
    dyn_list: Vec<Mroute4>,
}

impl RouteStore {
    pub fn new() -> Self {
        RouteStore::default()
    }

    pub fn conf_list(&self) -> &[Mroute4] {
        &self.conf_list
    }

    pub fn dyn_list(&self) -> &[Mroute4] {
        &self.dyn_list
    }

    pub(crate) fn conf_push(&mut self, route: Mroute4) {
        self.conf_list.push(route);
    }

    pub(crate) fn dyn_push(&mut self, route: Mroute4) {
        self.dyn_list.push(route);
    }

    /// Remove and return every `conf_list` entry matching `route` with an
    /// identical prefix length — the double `len` guard `del` needs to
    /// leave overlapping wildcards of other lengths untouched.
    pub(crate) fn take_conf_matching(&mut self, route: &Mroute4) -> Vec<Mroute4> {
        let (matched, rest) = std::mem::take(&mut self.conf_list)
            .into_iter()
            .partition(|e| matches(e, route) && e.len == route.len);
        self.conf_list = rest;
        matched
    }

    /// Remove and return every `dyn_list` entry matching template `rule`
    /// with prefix length `len` — the dynamics derived from one withdrawn
    /// wildcard.
    pub(crate) fn take_dyn_matching(&mut self, rule: &Mroute4, len: u8) -> Vec<Mroute4> {
        let (matched, rest) = std::mem::take(&mut self.dyn_list)
            .into_iter()
            .partition(|d| matches(rule, d) && rule.len == len);
        self.dyn_list = rest;
        matched
    }

    /// Find the first configured wildcard matching `cand`, used by
    /// `dyn_add`.
    pub(crate) fn find_conf_matching(&self, cand: &Mroute4) -> Option<&Mroute4> {
        self.conf_list.iter().find(|e| matches(e, cand))
    }

    /// `dyn_flush`: remove and return every dynamic route.
    pub(crate) fn take_all_dyn(&mut self) -> Vec<Mroute4> {
        std::mem::take(&mut self.dyn_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(sender: [u8; 4], group: [u8; 4], len: u8, inbound: usize) -> Mroute4 {
        Mroute4::new(Ipv4Addr::from(sender), Ipv4Addr::from(group), len, inbound)
    }

    #[test]
    fn wildcard_matches_same_inbound_and_prefix() {
        let wc = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        let cand = route([10, 0, 0, 5], [239, 1, 2, 3], 32, 0);
        assert!(matches(&wc, &cand));
    }

    #[test]
    fn wildcard_rejects_other_inbound() {
        let wc = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        let cand = route([10, 0, 0, 5], [239, 1, 2, 3], 32, 1);
        assert!(!matches(&wc, &cand));
    }

    #[test]
    fn take_conf_matching_respects_len_guard() {
        let mut store = RouteStore::new();
        store.conf_push(route([0, 0, 0, 0], [239, 0, 0, 0], 8, 0));
        store.conf_push(route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0));

        let del_request = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        let removed = store.take_conf_matching(&del_request);

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].len, 16);
        assert_eq!(store.conf_list().len(), 1);
        assert_eq!(store.conf_list()[0].len, 8);
    }
}

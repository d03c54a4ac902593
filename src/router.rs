//! [`MulticastRouter`], the crate's public entry point: orchestrates the
//! VIF/MIF tables, the route store, and the kernel control channels
//! into the operations a daemon actually calls.

use std::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::config::RouterConfig;
use crate::consts::raw::{MAX_MIF, MAX_VIF};
use crate::err::CoreError;
use crate::iface::Interfaces;
use crate::mif::MifTable;
use crate::route::{Mroute4, Mroute6, RouteStore};
use crate::socket::channel::{KernelChannel4, KernelChannel6, RawMroute4Channel, RawMroute6Channel};
use crate::vif::VifTable;

/// The route manager. Owns the VIF/MIF tables, the IPv4 route store,
/// and (once `enable`d) the two kernel control channels.
///
/// Generic over the channel implementation so tests can substitute
/// [`crate::socket::mock::MockChannel4`]/[`MockChannel6`] for the real,
/// raw-socket-backed [`RawMroute4Channel`]/[`RawMroute6Channel`].
pub struct MulticastRouter<C4 = RawMroute4Channel, C6 = RawMroute6Channel> {
    config: RouterConfig,
    vif_table: VifTable,
    mif_table: MifTable,
    routes: RouteStore,
    chan4: Option<C4>,
    chan6: Option<C6>,
}

impl<C4, C6> MulticastRouter<C4, C6>
where
    C4: KernelChannel4 + Default,
    C6: KernelChannel6 + Default,
{
    /// Build a router from `config`. No kernel resources are acquired
    /// until [`enable`][Self::enable].
    pub fn new(config: RouterConfig) -> Self {
        if config.max_vif() > &MAX_VIF || config.max_mif() > &MAX_MIF {
            panic!(
                "RouterConfig table size exceeds the kernel's compile-time MAX_VIF/MAX_MIF: \
                 configured ({}, {}) > kernel ({MAX_VIF}, {MAX_MIF})",
                config.max_vif(),
                config.max_mif(),
            );
        }
        MulticastRouter {
            vif_table: VifTable::new(*config.max_vif()),
            mif_table: MifTable::new(*config.max_mif()),
            routes: RouteStore::new(),
            chan4: None,
            chan6: None,
            config,
        }
    }

    /// Whether the kernel sockets are currently owned.
    pub fn is_enabled(&self) -> bool {
        self.chan4.is_some() && self.chan6.is_some()
    }

    /// Acquire both kernel control channels and, unless
    /// [`RouterConfig::auto_provision_vifs`] is `false`, provision a
    /// VIF/MIF for every multicast-capable interface `ifaces` knows
    /// about. Any failure releases whatever was already acquired before
    /// returning.
    pub fn enable(&mut self, ifaces: &mut impl Interfaces) -> Result<(), CoreError> {
        let mut chan4 = C4::default();
        chan4.init()?;

        let mut chan6 = C6::default();
        if let Err(e) = chan6.init() {
            chan4.done();
            return Err(e.into());
        }

        if *self.config.auto_provision_vifs() {
            if let Err(e) = self.vif_table.provision_all(ifaces, &mut chan4) {
                chan4.done();
                chan6.done();
                return Err(e.into());
            }
            if let Err(e) = self.mif_table.provision_all(ifaces, &mut chan6) {
                chan4.done();
                chan6.done();
                return Err(e.into());
            }
        }

        self.chan4 = Some(chan4);
        self.chan6 = Some(chan6);
        info!("multicast router enabled");
        Ok(())
    }

    /// Release both kernel channels and withdraw all slot bindings.
    /// Best-effort: failures are logged, never returned, and never stop
    /// the rest of the teardown.
    pub fn disable(&mut self, ifaces: &mut impl Interfaces) {
        if let Some(mut chan4) = self.chan4.take() {
            let mut index = 0;
            while let Some(iface) = ifaces.find_by_index_mut(index) {
                if let Err(e) = self.vif_table.del_vif(iface, &mut chan4) {
                    warn!("failed releasing VIF for {iface}: {e}");
                }
                index += 1;
            }
            chan4.done();
        }
        if let Some(mut chan6) = self.chan6.take() {
            let mut index = 0;
            while let Some(iface) = ifaces.find_by_index_mut(index) {
                if let Err(e) = self.mif_table.del_mif(iface, &mut chan6) {
                    warn!("failed releasing MIF for {iface}: {e}");
                }
                index += 1;
            }
            chan6.done();
        }
        info!("multicast router disabled");
    }

    /// Add an IPv4 route. A wildcard (`route.sender == ANY_SOURCE`) is
    /// filed into the configured list with no kernel interaction;
    /// anything else is installed directly via `add_mfc`.
    pub fn add(&mut self, route: Mroute4) -> Result<(), CoreError> {
        if route.is_wildcard() {
            debug!(
                "file wildcard {}/{} inbound={}",
                route.group, route.len, route.inbound
            );
            self.routes.conf_push(route);
            return Ok(());
        }
        let chan = self.chan4.as_mut().ok_or(CoreError::Unsupported)?;
        debug!(
            "add direct route {} -> {} inbound={}",
            route.sender, route.group, route.inbound
        );
        chan.add_mfc(route.sender, route.group, route.inbound, &route.ttl)?;
        Ok(())
    }

    /// Remove an IPv4 route. Direct routes are removed via `del_mfc`.
    /// Wildcards cascade: every matching dynamic is withdrawn from the
    /// kernel before the template itself is dropped.
    pub fn del(&mut self, route: &Mroute4) -> Result<(), CoreError> {
        if !route.is_wildcard() {
            let chan = self.chan4.as_mut().ok_or(CoreError::Unsupported)?;
            chan.del_mfc(route.sender, route.group)?;
            return Ok(());
        }

        let templates = self.routes.take_conf_matching(route);
        for template in &templates {
            let dynamics = self.routes.take_dyn_matching(template, route.len);
            for d in &dynamics {
                let chan = self.chan4.as_mut().ok_or(CoreError::Unsupported)?;
                if let Err(e) = chan.del_mfc(d.sender, d.group) {
                    warn!("failed withdrawing dynamic {} -> {}: {e}", d.sender, d.group);
                }
            }
        }
        Ok(())
    }

    /// Materialise a dynamic route from a kernel "no cache" upcall.
    /// Finds the first configured wildcard matching `route`, copies its
    /// outbound fanout into `route.ttl`, records it in `dyn_list`, and
    /// installs it. Fails with `NotFound` if no wildcard matches.
    pub fn dyn_add(&mut self, mut route: Mroute4) -> Result<(), CoreError> {
        let ttl = {
            let template = self.routes.find_conf_matching(&route).ok_or(CoreError::NotFound)?;
            template.ttl
        };
        route.ttl = ttl;

        let chan = self.chan4.as_mut().ok_or(CoreError::Unsupported)?;
        chan.add_mfc(route.sender, route.group, route.inbound, &route.ttl)?;
        debug!(
            "materialised dynamic route {} -> {} inbound={}",
            route.sender, route.group, route.inbound
        );
        self.routes.dyn_push(route);
        Ok(())
    }

    /// Withdraw every dynamic route from the kernel. Leaves the
    /// configured list untouched. Idempotent: a second call with an
    /// empty `dyn_list` issues no kernel calls.
    pub fn dyn_flush(&mut self) {
        let dynamics = self.routes.take_all_dyn();
        for d in &dynamics {
            let Some(chan) = self.chan4.as_mut() else {
                continue;
            };
            if let Err(e) = chan.del_mfc(d.sender, d.group) {
                warn!("failed flushing dynamic {} -> {}: {e}", d.sender, d.group);
            }
        }
    }

    /// Install an IPv6 route directly. There is no wildcard expansion
    /// on this side.
    pub fn add6(&mut self, route: &Mroute6) -> Result<(), CoreError> {
        let chan = self.chan6.as_mut().ok_or(CoreError::Unsupported)?;
        chan.add_mfc6(route.sender, route.group, route.inbound, &route.ttl)?;
        Ok(())
    }

    /// Remove an IPv6 route directly.
    pub fn del6(&mut self, route: &Mroute6) -> Result<(), CoreError> {
        let chan = self.chan6.as_mut().ok_or(CoreError::Unsupported)?;
        chan.del_mfc6(route.sender, route.group)?;
        Ok(())
    }

    /// Add the named interface to both the VIF and MIF tables. Both
    /// families are attempted even if one fails; the return value is
    /// the count of families that failed (`0` means both succeeded),
    /// matching the "one or both failed" contract the daemon's CLI
    /// surfaces.
    pub fn add_vif_by_name(
        &mut self,
        ifaces: &mut impl Interfaces,
        name: &str,
        threshold: u8,
    ) -> usize {
        let mut failures = 0;

        if let Some(iface) = ifaces.find_by_name_mut(name) {
            iface.set_threshold(threshold);
        } else {
            warn!("add_vif_by_name: no such interface {name}");
            return 2;
        }

        if let Some(chan4) = self.chan4.as_mut() {
            if let Some(iface) = ifaces.find_by_name_mut(name) {
                if let Err(e) = self.vif_table.add_vif(iface, chan4) {
                    warn!("failed adding VIF for {name}: {e}");
                    failures += 1;
                }
            }
        } else {
            failures += 1;
        }

        if let Some(chan6) = self.chan6.as_mut() {
            if let Some(iface) = ifaces.find_by_name_mut(name) {
                if let Err(e) = self.mif_table.add_mif(iface, chan6) {
                    warn!("failed adding MIF for {name}: {e}");
                    failures += 1;
                }
            }
        } else {
            failures += 1;
        }

        failures
    }

    /// Remove the named interface from both the VIF and MIF tables.
    /// Same failure-accumulation contract as
    /// [`add_vif_by_name`][Self::add_vif_by_name].
    pub fn del_vif_by_name(&mut self, ifaces: &mut impl Interfaces, name: &str) -> usize {
        let mut failures = 0;

        if let Some(chan4) = self.chan4.as_mut() {
            if let Some(iface) = ifaces.find_by_name_mut(name) {
                if let Err(e) = self.vif_table.del_vif(iface, chan4) {
                    warn!("failed removing VIF for {name}: {e}");
                    failures += 1;
                }
            } else {
                failures += 1;
            }
        } else {
            failures += 1;
        }

        if let Some(chan6) = self.chan6.as_mut() {
            if let Some(iface) = ifaces.find_by_name_mut(name) {
                if let Err(e) = self.mif_table.del_mif(iface, chan6) {
                    warn!("failed removing MIF for {name}: {e}");
                    failures += 1;
                }
            } else {
                failures += 1;
            }
        } else {
            failures += 1;
        }

        failures
    }

    /// Number of dynamic routes currently installed.
    pub fn dyn_count(&self) -> usize {
        self.routes.dyn_list().len()
    }

    /// Number of configured wildcard templates currently filed.
    pub fn conf_count(&self) -> usize {
        self.routes.conf_list().len()
    }
}

/// Build a route suitable for `dyn_add` from a kernel "no cache"
/// upcall: an exact `(S,G)` pair on the given inbound slot, with a
/// zeroed outbound fanout that `dyn_add` fills in from the matching
/// template.
pub fn upcall_route(sender: Ipv4Addr, group: Ipv4Addr, inbound: usize) -> Mroute4 {
    Mroute4::new(sender, group, 32, inbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::{IfaceFlags, Interface, InterfaceTable};
    use crate::socket::mock::{MockChannel4, MockChannel6};
    use std::net::Ipv6Addr;

    type TestRouter = MulticastRouter<MockChannel4, MockChannel6>;

    fn two_ifaces() -> InterfaceTable {
        InterfaceTable::new(vec![
            Interface::new(0, "eth0", 10, IfaceFlags::MULTICAST, Ipv4Addr::new(10, 0, 0, 1), 1),
            Interface::new(1, "eth1", 11, IfaceFlags::MULTICAST, Ipv4Addr::new(10, 0, 1, 1), 1),
        ])
    }

    fn route(sender: [u8; 4], group: [u8; 4], len: u8, inbound: usize) -> Mroute4 {
        Mroute4::new(Ipv4Addr::from(sender), Ipv4Addr::from(group), len, inbound)
    }

    #[test]
    fn direct_add_and_del_issue_one_kernel_call_each() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let mut r = route([10, 0, 0, 1], [239, 1, 1, 1], 32, 0);
        r.ttl[1] = 1;
        router.add(r.clone()).unwrap();
        router.del(&r).unwrap();

        assert!(router.dyn_count() == 0 && router.conf_count() == 0);
    }

    #[test]
    fn wildcard_match_materialises_one_dynamic() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let mut wc = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        wc.ttl[1] = 1;
        router.add(wc).unwrap();
        assert_eq!(router.conf_count(), 1);

        let upcall = upcall_route(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(239, 1, 2, 3), 0);
        router.dyn_add(upcall).unwrap();
        assert_eq!(router.dyn_count(), 1);
    }

    #[test]
    fn wildcard_non_match_returns_not_found() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let wc = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        router.add(wc).unwrap();

        let upcall = upcall_route(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(239, 2, 0, 1), 0);
        assert_eq!(router.dyn_add(upcall), Err(CoreError::NotFound));
        assert_eq!(router.dyn_count(), 0);
    }

    #[test]
    fn wildcard_cascade_delete_withdraws_all_dynamics() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let wc = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        router.add(wc.clone()).unwrap();

        for host in [5u8, 6, 7] {
            let upcall = upcall_route(Ipv4Addr::new(10, 0, 0, host), Ipv4Addr::new(239, 1, 2, 3), 0);
            router.dyn_add(upcall).unwrap();
        }
        assert_eq!(router.dyn_count(), 3);

        router.del(&wc).unwrap();
        assert_eq!(router.dyn_count(), 0);
        assert_eq!(router.conf_count(), 0);
    }

    #[test]
    fn overlapping_wildcards_delete_independently() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let wide = route([0, 0, 0, 0], [239, 0, 0, 0], 8, 0);
        let narrow = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        router.add(wide.clone()).unwrap();
        router.add(narrow.clone()).unwrap();

        let from_narrow = upcall_route(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(239, 1, 2, 3), 0);
        router.dyn_add(from_narrow).unwrap();

        router.del(&narrow).unwrap();
        assert_eq!(router.conf_count(), 1);
        assert_eq!(router.dyn_count(), 0);
    }

    #[test]
    fn slot_exhaustion_reports_table_full() {
        let config = crate::config::RouterConfigBuilder::default()
            .max_vif(2_usize)
            .build()
            .unwrap();
        let mut router: TestRouter = MulticastRouter::new(config);
        let mut ifaces = InterfaceTable::new(vec![
            Interface::new(0, "eth0", 10, IfaceFlags::MULTICAST, Ipv4Addr::new(10, 0, 0, 1), 1),
            Interface::new(1, "eth1", 11, IfaceFlags::MULTICAST, Ipv4Addr::new(10, 0, 1, 1), 1),
            Interface::new(2, "eth2", 12, IfaceFlags::MULTICAST, Ipv4Addr::new(10, 0, 2, 1), 1),
        ]);
        assert_eq!(router.enable(&mut ifaces), Err(CoreError::TableFull));
    }

    #[test]
    fn dyn_flush_is_idempotent() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let wc = route([0, 0, 0, 0], [239, 1, 0, 0], 16, 0);
        router.add(wc).unwrap();
        let upcall = upcall_route(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(239, 1, 2, 3), 0);
        router.dyn_add(upcall).unwrap();

        router.dyn_flush();
        assert_eq!(router.dyn_count(), 0);
        router.dyn_flush();
        assert_eq!(router.dyn_count(), 0);
    }

    #[test]
    fn ipv6_add_and_del_are_direct() {
        let mut router: TestRouter = MulticastRouter::new(RouterConfig::default());
        let mut ifaces = two_ifaces();
        router.enable(&mut ifaces).unwrap();

        let r = Mroute6::new(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST, 0);
        router.add6(&r).unwrap();
        router.del6(&r).unwrap();
    }
}

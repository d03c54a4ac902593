//! The interface record and the `Interfaces` provider boundary.
//!
//! Enumerating interfaces and tracking link state is an external
//! collaborator's job — this module only defines the shape of an
//! interface record and the trait this crate needs implemented against
//! it. It does not implement `getifaddrs`-style enumeration itself.

use std::fmt;
use std::net::Ipv4Addr;

use bitflags::bitflags;

bitflags! {
    /// Interface capability flags, mirroring `IFF_LOOPBACK`/`IFF_MULTICAST`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IfaceFlags: u32 {
        /// The interface is the loopback device.
        const LOOPBACK = 0x1;
        /// The interface supports multicast.
        const MULTICAST = 0x2;
    }
}

/// A network interface record as seen by the route manager.
///
/// Owned by the embedding daemon's `Interfaces` provider; this crate
/// mutates only the `vif`, `mif` and `threshold` fields, and only through
/// [`Interface::set_vif`], [`Interface::set_mif`] and
/// [`Interface::set_threshold`] — never by reconstructing the whole
/// record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    index: u32,
    name: String,
    ifindex: u32,
    flags: IfaceFlags,
    address: Ipv4Addr,
    threshold: u8,
    vif: Option<usize>,
    mif: Option<usize>,
}

impl Interface {
    /// Construct a new interface record. Called by the `Interfaces`
    /// provider, never by the route manager.
    pub fn new(
        index: u32,
        name: impl Into<String>,
        ifindex: u32,
        flags: IfaceFlags,
        address: Ipv4Addr,
        threshold: u8,
    ) -> Self {
        Interface {
            index,
            name: name.into(),
            ifindex,
            flags,
            address,
            threshold,
            vif: None,
            mif: None,
        }
    }

    /// Stable index used by [`Interfaces::find_by_index`].
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Interface name, e.g. `eth0`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kernel interface index (`if_nametoindex`), used for
    /// `VIFF_USE_IFINDEX`-style VIF installs.
    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    /// Capability flags.
    pub fn flags(&self) -> IfaceFlags {
        self.flags
    }

    /// Whether this interface is eligible for a VIF/MIF: multicast-capable
    /// and not the loopback device.
    pub fn is_multicast_capable(&self) -> bool {
        self.flags.contains(IfaceFlags::MULTICAST) && !self.flags.contains(IfaceFlags::LOOPBACK)
    }

    /// Primary IPv4 address, used for non-ifindex VIF installs.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Minimum TTL for packets forwarded out this interface.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Currently assigned VIF slot, if any.
    pub fn vif(&self) -> Option<usize> {
        self.vif
    }

    /// Currently assigned MIF slot, if any.
    pub fn mif(&self) -> Option<usize> {
        self.mif
    }

    /// Bind this interface to a VIF slot. Called only by
    /// [`crate::vif::VifTable`].
    pub(crate) fn set_vif(&mut self, vif: Option<usize>) {
        self.vif = vif;
    }

    /// Bind this interface to a MIF slot. Called only by
    /// [`crate::mif::MifTable`].
    pub(crate) fn set_mif(&mut self, mif: Option<usize>) {
        self.mif = mif;
    }

    /// Update the TTL threshold. Called only by
    /// [`crate::router::MulticastRouter::add_vif_by_name`].
    pub(crate) fn set_threshold(&mut self, threshold: u8) {
        self.threshold = threshold;
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The external interface-enumeration collaborator this crate consumes.
///
/// A real daemon backs this with something like a `getifaddrs`-based
/// enumerator (the `getifs` crate is exactly that kind of thing); this
/// crate only depends on the trait boundary.
pub trait Interfaces {
    /// Look up an interface by its stable index. Iterable from zero until
    /// this returns `None`.
    fn find_by_index(&self, index: u32) -> Option<&Interface>;

    /// Mutable counterpart of [`find_by_index`][Interfaces::find_by_index].
    fn find_by_index_mut(&mut self, index: u32) -> Option<&mut Interface>;

    /// Look up an interface by name.
    fn find_by_name(&self, name: &str) -> Option<&Interface>;

    /// Mutable counterpart of [`find_by_name`][Interfaces::find_by_name].
    fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Interface>;
}

/// A simple in-memory `Interfaces` provider, indexed by position. Useful
/// for tests and for daemons that already hold a `Vec<Interface>` from a
/// one-shot enumeration pass.
#[derive(Clone, Debug, Default)]
pub struct InterfaceTable {
    ifaces: Vec<Interface>,
}

impl InterfaceTable {
    /// Build a provider from an already-enumerated list of interfaces.
    pub fn new(ifaces: Vec<Interface>) -> Self {
        InterfaceTable { ifaces }
    }
}

impl Interfaces for InterfaceTable {
    fn find_by_index(&self, index: u32) -> Option<&Interface> {
        self.ifaces.iter().find(|i| i.index() == index)
    }

    fn find_by_index_mut(&mut self, index: u32) -> Option<&mut Interface> {
        self.ifaces.iter_mut().find(|i| i.index() == index)
    }

    fn find_by_name(&self, name: &str) -> Option<&Interface> {
        self.ifaces.iter().find(|i| i.name() == name)
    }

    fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.ifaces.iter_mut().find(|i| i.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(index: u32, name: &str, flags: IfaceFlags) -> Interface {
        Interface::new(index, name, index + 100, flags, Ipv4Addr::new(10, 0, 0, index as u8), 1)
    }

    #[test]
    fn loopback_is_not_multicast_capable() {
        let lo = sample(0, "lo", IfaceFlags::LOOPBACK | IfaceFlags::MULTICAST);
        assert!(!lo.is_multicast_capable());
    }

    #[test]
    fn plain_multicast_interface_is_capable() {
        let eth0 = sample(1, "eth0", IfaceFlags::MULTICAST);
        assert!(eth0.is_multicast_capable());
    }

    #[test]
    fn provider_finds_by_index_and_name() {
        let mut table = InterfaceTable::new(vec![
            sample(0, "lo", IfaceFlags::LOOPBACK | IfaceFlags::MULTICAST),
            sample(1, "eth0", IfaceFlags::MULTICAST),
        ]);
        assert_eq!(table.find_by_name("eth0").unwrap().index(), 1);
        assert!(table.find_by_index(2).is_none());
        table.find_by_index_mut(1).unwrap().set_threshold(5);
        assert_eq!(table.find_by_name("eth0").unwrap().threshold(), 5);
    }
}

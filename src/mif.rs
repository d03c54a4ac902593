//! The IPv6 MIF table: slot allocation over the interfaces the kernel's
//! `MAXMIFS`-sized table can hold, backed by a [`KernelChannel6`].

use crate::consts::raw::MAX_MIF;
use crate::err::TableError;
use crate::iface::{Interface, Interfaces};
use crate::socket::channel::KernelChannel6;

/// IPv6 counterpart of [`crate::vif::VifTable`]. There is no wildcard
/// expansion on this side, but slot bookkeeping works the same way.
#[derive(Debug)]
pub struct MifTable {
    max_mif: usize,
    slot_owner: Vec<Option<u32>>,
}

impl MifTable {
    pub fn new(max_mif: usize) -> Self {
        MifTable { max_mif, slot_owner: vec![None; max_mif] }
    }

    /// Total number of slots this table was sized with.
    pub fn capacity(&self) -> usize {
        self.max_mif
    }

    pub fn len(&self) -> usize {
        self.slot_owner.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.slot_owner.iter().position(Option::is_none)
    }

    /// Bind a MIF for `iface`. See [`crate::vif::VifTable::add_vif`] for
    /// the loopback-skip and rollback-on-failure semantics, which are
    /// identical here.
    pub fn add_mif(
        &mut self,
        iface: &mut Interface,
        chan: &mut impl KernelChannel6,
    ) -> Result<(), TableError> {
        if !iface.is_multicast_capable() {
            return Ok(());
        }
        if iface.mif().is_some() {
            return Ok(());
        }
        let slot = self.first_free_slot().ok_or(TableError::TableFull)?;
        chan.add_mif(slot, iface.ifindex(), iface.threshold())?;
        self.slot_owner[slot] = Some(iface.index());
        iface.set_mif(Some(slot));
        Ok(())
    }

    /// Release the MIF bound to `iface`, if any.
    pub fn del_mif(
        &mut self,
        iface: &mut Interface,
        chan: &mut impl KernelChannel6,
    ) -> Result<(), TableError> {
        let Some(slot) = iface.mif() else {
            return Ok(());
        };
        chan.del_mif(slot)?;
        self.slot_owner[slot] = None;
        iface.set_mif(None);
        Ok(())
    }

    /// Walk every interface the provider knows about from index zero
    /// and bind a MIF to each multicast-capable one, stopping at the
    /// first kernel or table failure.
    pub fn provision_all(
        &mut self,
        ifaces: &mut impl Interfaces,
        chan: &mut impl KernelChannel6,
    ) -> Result<(), TableError> {
        let mut index = 0;
        while let Some(iface) = ifaces.find_by_index_mut(index) {
            self.add_mif(iface, chan)?;
            index += 1;
        }
        Ok(())
    }
}

const _: () = assert!(MAX_MIF > 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::IfaceFlags;
    use crate::socket::mock::MockChannel6;
    use std::net::Ipv4Addr;

    fn iface(index: u32, flags: IfaceFlags) -> Interface {
        Interface::new(index, format!("eth{index}"), index + 10, flags, Ipv4Addr::new(10, 0, 0, 1), 1)
    }

    #[test]
    fn binds_first_free_slot() {
        let mut table = MifTable::new(4);
        let mut chan = MockChannel6::new();
        let mut eth0 = iface(0, IfaceFlags::MULTICAST);
        table.add_mif(&mut eth0, &mut chan).unwrap();
        assert_eq!(eth0.mif(), Some(0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_full_when_all_slots_occupied() {
        let mut table = MifTable::new(1);
        let mut chan = MockChannel6::new();
        let mut eth0 = iface(0, IfaceFlags::MULTICAST);
        let mut eth1 = iface(1, IfaceFlags::MULTICAST);
        table.add_mif(&mut eth0, &mut chan).unwrap();
        assert_eq!(table.add_mif(&mut eth1, &mut chan), Err(TableError::TableFull));
    }

    #[test]
    fn del_mif_frees_the_slot() {
        let mut table = MifTable::new(4);
        let mut chan = MockChannel6::new();
        let mut eth0 = iface(0, IfaceFlags::MULTICAST);
        table.add_mif(&mut eth0, &mut chan).unwrap();
        table.del_mif(&mut eth0, &mut chan).unwrap();
        assert_eq!(eth0.mif(), None);
        assert_eq!(table.len(), 0);
    }
}

//! The IPv4 VIF table: slot allocation over the interfaces the kernel's
//! `MAXVIFS`-sized table can hold, backed by a [`KernelChannel4`].

use crate::consts::raw::MAX_VIF;
use crate::err::TableError;
use crate::iface::{Interface, Interfaces};
use crate::socket::channel::KernelChannel4;

/// Tracks which of the kernel's `[0, MAX_VIF)` VIF slots are occupied
/// and maps each occupied slot back to the interface index bound there.
///
/// Mutating an [`Interface`]'s `vif` field always goes through this
/// table, never directly, so the two stay in sync.
#[derive(Debug)]
pub struct VifTable {
    max_vif: usize,
    slot_owner: Vec<Option<u32>>,
}

impl VifTable {
    /// Build a table sized to `max_vif` slots, all free.
    pub fn new(max_vif: usize) -> Self {
        VifTable { max_vif, slot_owner: vec![None; max_vif] }
    }

    /// Total number of slots this table was sized with.
    pub fn capacity(&self) -> usize {
        self.max_vif
    }

    /// Number of slots currently bound.
    pub fn len(&self) -> usize {
        self.slot_owner.iter().filter(|o| o.is_some()).count()
    }

    /// Whether no slot is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.slot_owner.iter().position(Option::is_none)
    }

    /// Bind a VIF for `iface`, installing it in the kernel through
    /// `chan`. Silently does nothing if `iface` is not multicast-capable
    /// (the loopback/non-multicast interfaces are skipped, not an
    /// error). Fails with [`TableError::TableFull`] if no slot remains.
    ///
    /// On kernel failure the slot is not recorded as bound: `chan` is
    /// asked to install the VIF before this table records the
    /// assignment, and a failure there leaves both the table and
    /// `iface.vif()` untouched.
    pub fn add_vif(
        &mut self,
        iface: &mut Interface,
        chan: &mut impl KernelChannel4,
    ) -> Result<(), TableError> {
        if !iface.is_multicast_capable() {
            return Ok(());
        }
        if iface.vif().is_some() {
            return Ok(());
        }
        let slot = self.first_free_slot().ok_or(TableError::TableFull)?;
        chan.add_vif(slot, iface.ifindex(), iface.threshold())?;
        self.slot_owner[slot] = Some(iface.index());
        iface.set_vif(Some(slot));
        Ok(())
    }

    /// Release the VIF bound to `iface`, if any. A no-op if `iface` has
    /// no VIF bound.
    pub fn del_vif(
        &mut self,
        iface: &mut Interface,
        chan: &mut impl KernelChannel4,
    ) -> Result<(), TableError> {
        let Some(slot) = iface.vif() else {
            return Ok(());
        };
        chan.del_vif(slot)?;
        self.slot_owner[slot] = None;
        iface.set_vif(None);
        Ok(())
    }

    /// Walk every interface the provider knows about from index zero
    /// and bind a VIF to each multicast-capable one, stopping at the
    /// first kernel or table failure.
    pub fn provision_all(
        &mut self,
        ifaces: &mut impl Interfaces,
        chan: &mut impl KernelChannel4,
    ) -> Result<(), TableError> {
        let mut index = 0;
        while let Some(iface) = ifaces.find_by_index_mut(index) {
            self.add_vif(iface, chan)?;
            index += 1;
        }
        Ok(())
    }
}

const _: () = assert!(MAX_VIF > 0);

//! In-memory test doubles for [`KernelChannel4`]/[`KernelChannel6`].
//!
//! The route manager's wildcard-expansion state machine is exercised
//! against these rather than a real kernel socket, the way a
//! raw-socket-owning layer is usually kept behind a trait so the layers
//! above it can be driven without root privileges.

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::consts::raw::{MAX_MIF, MAX_VIF};
use crate::err::ChanError;

use super::channel::{KernelChannel4, KernelChannel6};

/// One recorded call against a [`MockChannel4`]/[`MockChannel6`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Init,
    Done,
    AddVif { slot: usize, ifindex: u32, threshold: u8 },
    DelVif { slot: usize },
    AddMfc { sender: Ipv4Addr, group: Ipv4Addr, inbound: usize },
    DelMfc { sender: Ipv4Addr, group: Ipv4Addr },
    AddMif { slot: usize, ifindex: u32, threshold: u8 },
    DelMif { slot: usize },
    AddMfc6 { sender: Ipv6Addr, group: Ipv6Addr, inbound: usize },
    DelMfc6 { sender: Ipv6Addr, group: Ipv6Addr },
}

/// IPv4 mock channel. Records every call and can be primed to fail the
/// next `init`, `add_vif` or `add_mfc` call so tests can exercise
/// rollback behavior.
#[derive(Debug, Default)]
pub struct MockChannel4 {
    pub calls: Vec<Call>,
    pub occupied_vifs: HashSet<usize>,
    pub fail_init: bool,
    pub fail_next_add_vif: bool,
    pub fail_next_add_mfc: bool,
}

impl MockChannel4 {
    pub fn new() -> Self {
        MockChannel4::default()
    }
}

impl KernelChannel4 for MockChannel4 {
    fn init(&mut self) -> Result<(), ChanError> {
        self.calls.push(Call::Init);
        if self.fail_init {
            return Err(ChanError::KernelError(libc::EADDRINUSE));
        }
        Ok(())
    }

    fn done(&mut self) {
        self.calls.push(Call::Done);
    }

    fn add_vif(&mut self, slot: usize, ifindex: u32, threshold: u8) -> Result<(), ChanError> {
        self.calls.push(Call::AddVif { slot, ifindex, threshold });
        if self.fail_next_add_vif {
            self.fail_next_add_vif = false;
            return Err(ChanError::KernelError(libc::EINVAL));
        }
        self.occupied_vifs.insert(slot);
        Ok(())
    }

    fn del_vif(&mut self, slot: usize) -> Result<(), ChanError> {
        self.calls.push(Call::DelVif { slot });
        self.occupied_vifs.remove(&slot);
        Ok(())
    }

    fn add_mfc(
        &mut self,
        sender: Ipv4Addr,
        group: Ipv4Addr,
        inbound: usize,
        _ttls: &[u8; MAX_VIF],
    ) -> Result<(), ChanError> {
        self.calls.push(Call::AddMfc { sender, group, inbound });
        if self.fail_next_add_mfc {
            self.fail_next_add_mfc = false;
            return Err(ChanError::KernelError(libc::EINVAL));
        }
        Ok(())
    }

    fn del_mfc(&mut self, sender: Ipv4Addr, group: Ipv4Addr) -> Result<(), ChanError> {
        self.calls.push(Call::DelMfc { sender, group });
        Ok(())
    }
}

/// IPv6 mock channel, analogous to [`MockChannel4`].
#[derive(Debug, Default)]
pub struct MockChannel6 {
    pub calls: Vec<Call>,
    pub occupied_mifs: HashSet<usize>,
    pub fail_init: bool,
    pub fail_next_add_mif: bool,
}

impl MockChannel6 {
    pub fn new() -> Self {
        MockChannel6::default()
    }
}

impl KernelChannel6 for MockChannel6 {
    fn init(&mut self) -> Result<(), ChanError> {
        self.calls.push(Call::Init);
        if self.fail_init {
            return Err(ChanError::KernelError(libc::EADDRINUSE));
        }
        Ok(())
    }

    fn done(&mut self) {
        self.calls.push(Call::Done);
    }

    fn add_mif(&mut self, slot: usize, ifindex: u32, threshold: u8) -> Result<(), ChanError> {
        self.calls.push(Call::AddMif { slot, ifindex, threshold });
        if self.fail_next_add_mif {
            self.fail_next_add_mif = false;
            return Err(ChanError::KernelError(libc::EINVAL));
        }
        self.occupied_mifs.insert(slot);
        Ok(())
    }

    fn del_mif(&mut self, slot: usize) -> Result<(), ChanError> {
        self.calls.push(Call::DelMif { slot });
        self.occupied_mifs.remove(&slot);
        Ok(())
    }

    fn add_mfc6(
        &mut self,
        sender: Ipv6Addr,
        group: Ipv6Addr,
        inbound: usize,
        _ttls: &[u8; MAX_MIF],
    ) -> Result<(), ChanError> {
        self.calls.push(Call::AddMfc6 { sender, group, inbound });
        Ok(())
    }

    fn del_mfc6(&mut self, sender: Ipv6Addr, group: Ipv6Addr) -> Result<(), ChanError> {
        self.calls.push(Call::DelMfc6 { sender, group });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_init_and_add_vif_calls() {
        let mut chan = MockChannel4::new();
        chan.init().unwrap();
        chan.add_vif(0, 2, 1).unwrap();
        assert_eq!(
            chan.calls,
            vec![Call::Init, Call::AddVif { slot: 0, ifindex: 2, threshold: 1 }]
        );
        assert!(chan.occupied_vifs.contains(&0));
    }

    #[test]
    fn primed_failure_does_not_occupy_slot() {
        let mut chan = MockChannel4::new();
        chan.fail_next_add_vif = true;
        assert!(chan.add_vif(0, 2, 1).is_err());
        assert!(!chan.occupied_vifs.contains(&0));
    }
}

//! Raw-socket-backed kernel control channels, one per address family.
//!
//! Each channel owns a single raw socket for the lifetime of its
//! `init`/`done` pair and issues `setsockopt` calls against the option
//! numbers and control structures in [`crate::consts::raw`].

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::mem::size_of;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::unix::io::RawFd;

use log::{debug, warn};

use crate::consts::raw::{
    Mf6cctl, Mfcctl, Mif6ctl, Vifctl, VifcLcl, MAX_MIF, MAX_VIF, MRT6_ADD_MFC, MRT6_ADD_MIF,
    MRT6_DEL_MFC, MRT6_DEL_MIF, MRT6_DONE, MRT6_INIT, MRT_ADD_MFC, MRT_ADD_VIF, MRT_DEL_MFC,
    MRT_DEL_VIF, MRT_DONE, MRT_INIT, VIFF_USE_IFINDEX,
};
use crate::consts::socket::RawProtocol;
use crate::err::ChanError;
use crate::utils::{ipv4_to_s_addr, ttls_to_bitset};

/// Path written during IPv6 init to turn on the kernel's global
/// multicast-forwarding toggle. Only relevant on Linux.
const IPV6_ALL_MC_FORWARD: &str = "/proc/sys/net/ipv6/conf/all/mc_forwarding";

/// The IPv4 kernel control channel contract.
pub trait KernelChannel4 {
    /// Acquire the IPv4 multicast-router role on a fresh raw socket.
    fn init(&mut self) -> Result<(), ChanError>;
    /// Release the role and close the socket. Idempotent.
    fn done(&mut self);
    /// Install a VIF at `slot` for the interface with kernel index
    /// `ifindex`, forwarding with minimum TTL `threshold`.
    fn add_vif(&mut self, slot: usize, ifindex: u32, threshold: u8) -> Result<(), ChanError>;
    /// Remove the VIF at `slot`.
    fn del_vif(&mut self, slot: usize) -> Result<(), ChanError>;
    /// Install a concrete `(sender, group)` forwarding-cache entry.
    fn add_mfc(
        &mut self,
        sender: Ipv4Addr,
        group: Ipv4Addr,
        inbound: usize,
        ttls: &[u8; MAX_VIF],
    ) -> Result<(), ChanError>;
    /// Remove a `(sender, group)` forwarding-cache entry.
    fn del_mfc(&mut self, sender: Ipv4Addr, group: Ipv4Addr) -> Result<(), ChanError>;
}

/// The IPv6 kernel control channel contract.
pub trait KernelChannel6 {
    /// Acquire the IPv6 multicast-router role on a fresh raw socket.
    fn init(&mut self) -> Result<(), ChanError>;
    /// Release the role and close the socket. Idempotent.
    fn done(&mut self);
    /// Install a MIF at `slot` for the interface with kernel index
    /// `ifindex`.
    fn add_mif(&mut self, slot: usize, ifindex: u32, threshold: u8) -> Result<(), ChanError>;
    /// Remove the MIF at `slot`.
    fn del_mif(&mut self, slot: usize) -> Result<(), ChanError>;
    /// Install a concrete `(sender, group)` v6 forwarding-cache entry.
    /// The outbound MIF set is derived from `ttls[i] > 0`.
    fn add_mfc6(
        &mut self,
        sender: Ipv6Addr,
        group: Ipv6Addr,
        inbound: usize,
        ttls: &[u8; MAX_MIF],
    ) -> Result<(), ChanError>;
    /// Remove a `(sender, group)` v6 forwarding-cache entry.
    fn del_mfc6(&mut self, sender: Ipv6Addr, group: Ipv6Addr) -> Result<(), ChanError>;
}

fn raw_socket(protocol: RawProtocol) -> io::Result<RawFd> {
    match unsafe {
        libc::socket(
            family_for(protocol),
            libc::SOCK_RAW | libc::SOCK_CLOEXEC,
            protocol.into(),
        )
    } {
        fd if fd >= 0 => Ok(fd),
        _ => Err(io::Error::last_os_error()),
    }
}

fn family_for(protocol: RawProtocol) -> libc::c_int {
    use crate::consts::socket::AddrFamily;
    match protocol {
        RawProtocol::Igmp => AddrFamily::Inet.into(),
        RawProtocol::Icmpv6 => AddrFamily::Inet6.into(),
    }
}

fn setsockopt<T>(fd: RawFd, level: libc::c_int, name: libc::c_int, val: &T) -> io::Result<()> {
    match unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            val as *const T as *const libc::c_void,
            size_of::<T>() as libc::socklen_t,
        )
    } {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

/// Kernel control channel for IPv4 multicast routing: a raw IGMP socket
/// holding the `MRT_INIT` ownership of the kernel's VIF/MFC tables.
#[derive(Debug, Default)]
pub struct RawMroute4Channel {
    fd: Option<RawFd>,
}

impl RawMroute4Channel {
    pub fn new() -> Self {
        RawMroute4Channel { fd: None }
    }
}

impl KernelChannel4 for RawMroute4Channel {
    fn init(&mut self) -> Result<(), ChanError> {
        let fd = raw_socket(RawProtocol::Igmp).map_err(ChanError::from)?;
        let arg: libc::c_int = 1;
        if let Err(e) = setsockopt(fd, libc::IPPROTO_IP, MRT_INIT, &arg) {
            unsafe {
                libc::close(fd);
            }
            return Err(ChanError::from(e));
        }
        self.fd = Some(fd);
        debug!("IPv4 multicast routing socket initialised");
        Ok(())
    }

    fn done(&mut self) {
        let Some(fd) = self.fd.take() else {
            return;
        };
        if setsockopt(fd, libc::IPPROTO_IP, MRT_DONE, &0i32).is_err() {
            warn!(
                "failed shutting down IPv4 multicast routing socket: {}",
                io::Error::last_os_error()
            );
        }
        unsafe {
            libc::close(fd);
        }
    }

    fn add_vif(&mut self, slot: usize, ifindex: u32, threshold: u8) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        let vc = Vifctl {
            vifc_vifi: slot as u16,
            vifc_flags: VIFF_USE_IFINDEX,
            vifc_threshold: threshold,
            vifc_rate_limit: 0,
            vifc_lcl: VifcLcl {
                vifc_lcl_ifindex: ifindex as libc::c_int,
            },
            vifc_rmt_addr: libc::in_addr { s_addr: 0 },
        };
        debug!("map VIF {slot} ifindex {ifindex} TTL threshold {threshold}");
        setsockopt(fd, libc::IPPROTO_IP, MRT_ADD_VIF, &vc).map_err(ChanError::from)
    }

    fn del_vif(&mut self, slot: usize) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        debug!("removing VIF {slot}");
        del_vif_encoded(fd, slot)
    }

    fn add_mfc(
        &mut self,
        sender: Ipv4Addr,
        group: Ipv4Addr,
        inbound: usize,
        ttls: &[u8; MAX_VIF],
    ) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        let mc = Mfcctl {
            mfcc_origin: libc::in_addr {
                s_addr: ipv4_to_s_addr(sender),
            },
            mfcc_mcastgrp: libc::in_addr {
                s_addr: ipv4_to_s_addr(group),
            },
            mfcc_parent: inbound as u16,
            mfcc_ttls: *ttls,
            mfcc_pkt_cnt: 0,
            mfcc_byte_cnt: 0,
            mfcc_wrong_if: 0,
            mfcc_expire: 0,
        };
        debug!("add {sender} -> {group} from VIF {inbound}");
        setsockopt(fd, libc::IPPROTO_IP, MRT_ADD_MFC, &mc).map_err(ChanError::from)
    }

    fn del_mfc(&mut self, sender: Ipv4Addr, group: Ipv4Addr) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        let mc = Mfcctl {
            mfcc_origin: libc::in_addr {
                s_addr: ipv4_to_s_addr(sender),
            },
            mfcc_mcastgrp: libc::in_addr {
                s_addr: ipv4_to_s_addr(group),
            },
            mfcc_parent: 0,
            mfcc_ttls: [0; MAX_VIF],
            mfcc_pkt_cnt: 0,
            mfcc_byte_cnt: 0,
            mfcc_wrong_if: 0,
            mfcc_expire: 0,
        };
        debug!("del {sender} -> {group}");
        setsockopt(fd, libc::IPPROTO_IP, MRT_DEL_MFC, &mc).map_err(ChanError::from)
    }
}

#[cfg(target_os = "linux")]
fn del_vif_encoded(fd: RawFd, slot: usize) -> Result<(), ChanError> {
    let vc = Vifctl {
        vifc_vifi: slot as u16,
        vifc_flags: 0,
        vifc_threshold: 0,
        vifc_rate_limit: 0,
        vifc_lcl: VifcLcl { vifc_lcl_addr: libc::in_addr { s_addr: 0 } },
        vifc_rmt_addr: libc::in_addr { s_addr: 0 },
    };
    setsockopt(fd, libc::IPPROTO_IP, MRT_DEL_VIF, &vc).map_err(ChanError::from)
}

#[cfg(not(target_os = "linux"))]
fn del_vif_encoded(fd: RawFd, slot: usize) -> Result<(), ChanError> {
    let vif = slot as i16;
    setsockopt(fd, libc::IPPROTO_IP, MRT_DEL_VIF, &vif).map_err(ChanError::from)
}

impl Drop for RawMroute4Channel {
    fn drop(&mut self) {
        self.done();
    }
}

/// Kernel control channel for IPv6 multicast routing: a raw ICMPv6
/// socket holding the `MRT6_INIT` ownership of the kernel's MIF/MFC6
/// tables.
#[derive(Debug, Default)]
pub struct RawMroute6Channel {
    fd: Option<RawFd>,
}

impl RawMroute6Channel {
    pub fn new() -> Self {
        RawMroute6Channel { fd: None }
    }
}

impl KernelChannel6 for RawMroute6Channel {
    fn init(&mut self) -> Result<(), ChanError> {
        let fd = raw_socket(RawProtocol::Icmpv6).map_err(ChanError::from)?;
        let arg: libc::c_int = 1;
        if let Err(e) = setsockopt(fd, libc::IPPROTO_IPV6, MRT6_INIT, &arg) {
            unsafe {
                libc::close(fd);
            }
            return Err(ChanError::from(e));
        }
        self.fd = Some(fd);

        #[cfg(target_os = "linux")]
        enable_ipv6_mc_forwarding_sysfs()?;

        debug!("IPv6 multicast routing socket initialised");
        Ok(())
    }

    fn done(&mut self) {
        let Some(fd) = self.fd.take() else {
            return;
        };
        if setsockopt(fd, libc::IPPROTO_IPV6, MRT6_DONE, &0i32).is_err() {
            warn!(
                "failed shutting down IPv6 multicast routing socket: {}",
                io::Error::last_os_error()
            );
        }
        unsafe {
            libc::close(fd);
        }
    }

    fn add_mif(&mut self, slot: usize, ifindex: u32, threshold: u8) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        let mc = Mif6ctl {
            mif6c_mifi: slot as u16,
            mif6c_flags: 0,
            vifc_threshold: threshold,
            mif6c_pifi: ifindex as u16,
            vifc_rate_limit: 0,
        };
        debug!("map MIF {slot} ifindex {ifindex} TTL threshold {threshold}");
        setsockopt(fd, libc::IPPROTO_IPV6, MRT6_ADD_MIF, &mc).map_err(ChanError::from)
    }

    fn del_mif(&mut self, slot: usize) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        debug!("removing MIF {slot}");
        let mif = slot as u16;
        setsockopt(fd, libc::IPPROTO_IPV6, MRT6_DEL_MIF, &mif).map_err(ChanError::from)
    }

    fn add_mfc6(
        &mut self,
        sender: Ipv6Addr,
        group: Ipv6Addr,
        inbound: usize,
        ttls: &[u8; MAX_MIF],
    ) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        let mut ifset = [0u32; 8];
        ttls_to_bitset(ttls, &mut ifset);
        let mc = Mf6cctl {
            mf6cc_origin: sockaddr_in6_for(sender),
            mf6cc_mcastgrp: sockaddr_in6_for(group),
            mf6cc_parent: inbound as u16,
            mf6cc_ifset: ifset,
        };
        debug!("add {sender} -> {group} from MIF {inbound}");
        setsockopt(fd, libc::IPPROTO_IPV6, MRT6_ADD_MFC, &mc).map_err(ChanError::from)
    }

    fn del_mfc6(&mut self, sender: Ipv6Addr, group: Ipv6Addr) -> Result<(), ChanError> {
        let fd = self.fd.ok_or(ChanError::Unsupported)?;
        let mc = Mf6cctl {
            mf6cc_origin: sockaddr_in6_for(sender),
            mf6cc_mcastgrp: sockaddr_in6_for(group),
            mf6cc_parent: 0,
            mf6cc_ifset: [0; 8],
        };
        debug!("del {sender} -> {group}");
        setsockopt(fd, libc::IPPROTO_IPV6, MRT6_DEL_MFC, &mc).map_err(ChanError::from)
    }
}

fn sockaddr_in6_for(addr: Ipv6Addr) -> libc::sockaddr_in6 {
    libc::sockaddr_in6 {
        sin6_family: libc::AF_INET6 as libc::sa_family_t,
        sin6_port: 0,
        sin6_flowinfo: 0,
        sin6_addr: libc::in6_addr { s6_addr: addr.octets() },
        sin6_scope_id: 0,
    }
}

/// Writes exactly one byte (`b"1"`) to the sysfs toggle. A failure
/// caused by insufficient privilege is fatal; the file's absence
/// (kernels that already enable forwarding via `MRT6_INIT`) is
/// tolerated.
#[cfg(target_os = "linux")]
fn enable_ipv6_mc_forwarding_sysfs() -> Result<(), ChanError> {
    match OpenOptions::new().write(true).open(IPV6_ALL_MC_FORWARD) {
        Ok(mut f) => f.write_all(b"1").map_err(ChanError::from),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ChanError::from(e)),
    }
}

impl Drop for RawMroute6Channel {
    fn drop(&mut self) {
        self.done();
    }
}

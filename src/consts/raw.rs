//! Kernel uAPI constants and control structures for the multicast routing
//! socket options, transcribed from `<linux/mroute.h>` and
//! `<linux/mroute6.h>`. Layouts are `#[repr(C)]` and field order/types
//! match the kernel headers exactly; nothing here is inferred.

use std::mem::size_of;

/// `MAXVIFS` from `<linux/mroute.h>`. The kernel's IPv4 VIF table has
/// exactly this many slots; the in-process [`crate::vif::VifTable`] is
/// sized to match and the crate refuses to run if the two disagree.
pub const MAX_VIF: usize = 32;

/// `MAXMIFS` from `<linux/mroute6.h>`. The IPv6 analogue of [`MAX_VIF`].
pub const MAX_MIF: usize = 32;

/// `IF_SET_SIZE` from `<linux/mroute6.h>`: width, in `u32` words, of the
/// outbound-MIF bitset embedded in [`Mf6cctl`].
pub const IF_SET_WORDS: usize = 8;

// Option numbers for `setsockopt(fd, IPPROTO_IP, MRT_*, ...)`, from
// `<linux/mroute.h>`. `MRT_BASE` is 200 on Linux.
const MRT_BASE: libc::c_int = 200;
/// Acquire the IPv4 multicast-router role on this socket.
pub const MRT_INIT: libc::c_int = MRT_BASE;
/// Release the IPv4 multicast-router role.
pub const MRT_DONE: libc::c_int = MRT_BASE + 1;
/// Install a VIF.
pub const MRT_ADD_VIF: libc::c_int = MRT_BASE + 2;
/// Remove a VIF.
pub const MRT_DEL_VIF: libc::c_int = MRT_BASE + 3;
/// Install an MFC entry.
pub const MRT_ADD_MFC: libc::c_int = MRT_BASE + 4;
/// Remove an MFC entry.
pub const MRT_DEL_MFC: libc::c_int = MRT_BASE + 5;

// Option numbers for `setsockopt(fd, IPPROTO_IPV6, MRT6_*, ...)`, from
// `<linux/mroute6.h>`. `MRT6_BASE` is 200 in its own (IPPROTO_IPV6-scoped)
// option namespace.
const MRT6_BASE: libc::c_int = 200;
/// Acquire the IPv6 multicast-router role on this socket.
pub const MRT6_INIT: libc::c_int = MRT6_BASE;
/// Release the IPv6 multicast-router role.
pub const MRT6_DONE: libc::c_int = MRT6_BASE + 1;
/// Install a MIF.
pub const MRT6_ADD_MIF: libc::c_int = MRT6_BASE + 2;
/// Remove a MIF.
pub const MRT6_DEL_MIF: libc::c_int = MRT6_BASE + 3;
/// Install an MFC6 entry.
pub const MRT6_ADD_MFC: libc::c_int = MRT6_BASE + 4;
/// Remove an MFC6 entry.
pub const MRT6_DEL_MFC: libc::c_int = MRT6_BASE + 5;

/// `VIFF_USE_IFINDEX` from `<linux/mroute.h>`: tell the kernel to route by
/// `vifc_lcl_ifindex` rather than `vifc_lcl_addr`. Always set on Linux,
/// where this crate runs; BSD variants of the API have no such flag and
/// always address VIFs by local address.
pub const VIFF_USE_IFINDEX: u8 = 0x8;

/// `struct vifctl` from `<linux/mroute.h>`, bit-for-bit.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Vifctl {
    pub vifc_vifi: u16,
    pub vifc_flags: u8,
    pub vifc_threshold: u8,
    pub vifc_rate_limit: u32,
    pub vifc_lcl: VifcLcl,
    pub vifc_rmt_addr: libc::in_addr,
}

/// The kernel overlays `vifc_lcl_addr`/`vifc_lcl_ifindex` in a union;
/// only one is meaningful depending on whether `VIFF_USE_IFINDEX` is set.
#[repr(C)]
#[derive(Clone, Copy)]
pub union VifcLcl {
    pub vifc_lcl_addr: libc::in_addr,
    pub vifc_lcl_ifindex: libc::c_int,
}

/// `struct mfcctl` from `<linux/mroute.h>`, bit-for-bit. The kernel
/// rejects `MRT_ADD_MFC`/`MRT_DEL_MFC` with `EINVAL` unless `optlen`
/// matches `sizeof(struct mfcctl)` exactly, so the trailing counters the
/// kernel appends after `mfcc_ttls` must be present even though this
/// crate never reads them back.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Mfcctl {
    pub mfcc_origin: libc::in_addr,
    pub mfcc_mcastgrp: libc::in_addr,
    pub mfcc_parent: u16,
    pub mfcc_ttls: [u8; MAX_VIF],
    pub mfcc_pkt_cnt: libc::c_uint,
    pub mfcc_byte_cnt: libc::c_uint,
    pub mfcc_wrong_if: libc::c_uint,
    pub mfcc_expire: libc::c_int,
}

/// `struct mif6ctl` from `<linux/mroute6.h>`, bit-for-bit.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Mif6ctl {
    pub mif6c_mifi: u16,
    pub mif6c_flags: u8,
    pub vifc_threshold: u8,
    pub mif6c_pifi: u16,
    pub vifc_rate_limit: u32,
}

/// `struct mf6cctl` from `<linux/mroute6.h>`, bit-for-bit. `mf6cc_ifset`
/// is the outbound-MIF bitset: bit `i` set means MIF `i` is in the
/// outbound fan-out.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Mf6cctl {
    pub mf6cc_origin: libc::sockaddr_in6,
    pub mf6cc_mcastgrp: libc::sockaddr_in6,
    pub mf6cc_parent: u16,
    pub mf6cc_ifset: [u32; IF_SET_WORDS],
}

/// `sizeof(struct mfcctl)` on Linux with `MAXVIFS == 32`: two `in_addr`
/// (4 bytes each), a `vifi_t` (2 bytes), `mfcc_ttls[32]`, two bytes of
/// padding before the next `unsigned int`-aligned field, then four
/// 4-byte trailing counters. `ip_mroute_setsockopt` compares `optlen`
/// against this exact value.
const KERNEL_MFCCTL_SIZE: usize = 60;

const _: () = assert!(size_of::<Vifctl>() >= size_of::<u16>() + 2 + size_of::<u32>());
const _: () = assert!(size_of::<Mfcctl>() == KERNEL_MFCCTL_SIZE);

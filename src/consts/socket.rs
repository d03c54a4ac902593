/// Address family passed to the `socket()` syscall when opening a
/// routing-control socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddrFamily {
    /// IPv4, used for the VIF/MFC control socket.
    Inet,
    /// IPv6, used for the MIF/MFC6 control socket.
    Inet6,
}

impl From<AddrFamily> for libc::c_int {
    fn from(f: AddrFamily) -> Self {
        match f {
            AddrFamily::Inet => libc::AF_INET,
            AddrFamily::Inet6 => libc::AF_INET6,
        }
    }
}

/// Transport protocol passed to the `socket()` syscall. The kernel's
/// multicast routing API is reached over a raw IGMP (v4) or ICMPv6 (v6)
/// socket — there is no dedicated protocol number for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawProtocol {
    /// `IPPROTO_IGMP`, used to open the IPv4 routing-control socket.
    Igmp,
    /// `IPPROTO_ICMPV6`, used to open the IPv6 routing-control socket.
    Icmpv6,
}

impl From<RawProtocol> for libc::c_int {
    fn from(p: RawProtocol) -> Self {
        match p {
            RawProtocol::Igmp => libc::IPPROTO_IGMP,
            RawProtocol::Icmpv6 => libc::IPPROTO_ICMPV6,
        }
    }
}

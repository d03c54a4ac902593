//! Error types used throughout `mroute-core`.
//!
//! There are three main types, layered the way the kernel call itself is
//! layered:
//! * [`ChanError`] - errors from the [`kernel control channel`][crate::socket]
//!   that owns the raw routing socket.
//! * [`TableError`] - errors from the [`VIF/MIF table managers`][crate::vif]
//!   sitting on top of the channel.
//! * [`CoreError`] - the error surfaced at the public
//!   [`MulticastRouter`][crate::router::MulticastRouter] API, which every
//!   lower layer's error converts into.
//!
//! # Design decisions
//!
//! All errors implement [`std::error::Error`] in an attempt to allow them
//! to be used in conjunction with [`Result`] for easier error management
//! even at the syscall level. None of these hand-roll a derive macro-based
//! hierarchy (no `thiserror`): a small crate like this one gets more
//! mileage out of writing `Display` by hand, matching the rest of this
//! codebase's error module.

use std::{
    error::Error,
    fmt::{self, Display},
};

use derive_builder::UninitializedFieldError;

/// Errors from the kernel control channel: failures of the raw
/// `setsockopt`-class calls this crate is built around.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChanError {
    /// The kernel does not support multicast routing for this address
    /// family (`MRT_INIT`/`MRT6_INIT` failed with `ENOPROTOOPT`).
    Unsupported,
    /// Another process already owns the multicast-router role on this
    /// address family (`MRT_INIT`/`MRT6_INIT` failed with `EADDRINUSE`).
    Busy,
    /// Any other kernel syscall failure, carrying the raw `errno`.
    KernelError(i32),
}

impl Display for ChanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChanError::Unsupported => {
                write!(f, "kernel does not support multicast routing")
            }
            ChanError::Busy => write!(f, "multicast routing role already held by another process"),
            ChanError::KernelError(errno) => {
                write!(f, "kernel call failed: {}", io_error_from_errno(*errno))
            }
        }
    }
}

impl Error for ChanError {}

impl From<std::io::Error> for ChanError {
    fn from(e: std::io::Error) -> Self {
        match e.raw_os_error() {
            Some(libc::ENOPROTOOPT) => ChanError::Unsupported,
            Some(libc::EADDRINUSE) => ChanError::Busy,
            Some(errno) => ChanError::KernelError(errno),
            None => ChanError::KernelError(-1),
        }
    }
}

fn io_error_from_errno(errno: i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno)
}

/// Errors from the VIF/MIF table manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableError {
    /// No free slot in `[0, MAX_VIF)`/`[0, MAX_MIF)`.
    TableFull,
    /// The kernel call backing the slot assignment failed; no slot was
    /// bound as a result.
    Chan(ChanError),
}

impl Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableError::TableFull => write!(f, "no free VIF/MIF slot"),
            TableError::Chan(e) => write!(f, "{e}"),
        }
    }
}

impl Error for TableError {}

impl From<ChanError> for TableError {
    fn from(e: ChanError) -> Self {
        TableError::Chan(e)
    }
}

/// Error surfaced at the public route-manager API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// The kernel does not support multicast routing for this address
    /// family.
    Unsupported,
    /// Another process already owns the multicast-router role.
    Busy,
    /// No free VIF/MIF slot.
    TableFull,
    /// `dyn_add` found no configured wildcard matching the candidate
    /// route.
    NotFound,
    /// A kernel syscall failed, carrying the raw `errno`.
    KernelError(i32),
    /// Growing the configured-route list failed (memory exhaustion).
    AllocationFailed,
}

impl Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoreError::Unsupported => write!(f, "kernel does not support multicast routing"),
            CoreError::Busy => write!(f, "multicast routing role already held by another process"),
            CoreError::TableFull => write!(f, "no free VIF/MIF slot"),
            CoreError::NotFound => write!(f, "no configured wildcard route matches"),
            CoreError::KernelError(errno) => {
                write!(f, "kernel call failed: {}", io_error_from_errno(*errno))
            }
            CoreError::AllocationFailed => write!(f, "allocation failed while recording route"),
        }
    }
}

impl Error for CoreError {}

impl From<ChanError> for CoreError {
    fn from(e: ChanError) -> Self {
        match e {
            ChanError::Unsupported => CoreError::Unsupported,
            ChanError::Busy => CoreError::Busy,
            ChanError::KernelError(code) => CoreError::KernelError(code),
        }
    }
}

impl From<TableError> for CoreError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::TableFull => CoreError::TableFull,
            TableError::Chan(c) => CoreError::from(c),
        }
    }
}

impl From<UninitializedFieldError> for CoreError {
    fn from(_: UninitializedFieldError) -> Self {
        CoreError::AllocationFailed
    }
}

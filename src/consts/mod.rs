//! # High level notes
//!
//! This module holds the constants and kernel-visible control structures
//! this crate is built around: the compile-time `MAXVIFS`/`MAXMIFS` table
//! sizes, the `setsockopt` option numbers for the kernel's multicast
//! routing API, and the `#[repr(C)]` structs (`vifctl`, `mfcctl`,
//! `mif6ctl`, `mf6cctl`) that are passed across that boundary.
//!
//! # Design decisions
//!
//! None of these are re-derived from first principles: they are
//! transcribed byte-for-byte from the Linux kernel's `<linux/mroute.h>`
//! and `<linux/mroute6.h>` uAPI headers. A crate built on top of this
//! one must never guess at these layouts.

/// Kernel-visible option numbers and control structures.
pub mod raw;
/// Constants for the address-family/protocol numbers used to open the
/// raw routing sockets.
pub mod socket;

pub use raw::{MAX_MIF, MAX_VIF};

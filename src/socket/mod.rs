//! The kernel control channel: the only place in this crate that issues
//! `setsockopt`-class multicast-routing operations.
//!
//! ## Design decisions
//!
//! [`channel`] defines one trait per address family
//! ([`KernelChannel4`][channel::KernelChannel4],
//! [`KernelChannel6`][channel::KernelChannel6]) and one real,
//! raw-socket-backed implementation of each
//! ([`RawMroute4Channel`][channel::RawMroute4Channel],
//! [`RawMroute6Channel`][channel::RawMroute6Channel]). The route manager
//! in [`crate::router`] is generic over the trait, not the concrete
//! socket type, so its wildcard-expansion state machine can be exercised
//! in tests against [`mock::MockChannel4`]/[`mock::MockChannel6`] without
//! root privileges or a real kernel.

pub mod channel;
#[cfg(test)]
pub mod mock;

pub use channel::{KernelChannel4, KernelChannel6, RawMroute4Channel, RawMroute6Channel};

//! # mroute-core
//!
//! A user-space control layer for the kernel's IP multicast forwarding
//! engine: owns the kernel's multicast routing socket and its VIF/MIF
//! virtual-interface table, and implements a route manager that
//! translates route declarations — including wildcard source
//! declarations — into concrete forwarding-cache entries, with lazy
//! materialisation on kernel upcalls and cascading withdrawal.
//!
//! ## The crate is broken down into the following modules:
//! * [`router`] — [`MulticastRouter`][router::MulticastRouter], the
//!   public entry point: `enable`/`disable`, `add`/`del`/`dyn_add`/
//!   `dyn_flush`, IPv6 `add`/`del`, and interface hot-plug.
//! * [`route`] — route records and the configured/dynamic route store.
//! * [`vif`] / [`mif`] — VIF/MIF slot allocation over an interface
//!   table shared with the kernel.
//! * [`iface`] — the interface record and the `Interfaces` provider
//!   boundary this crate consumes but does not implement.
//! * [`socket`] — the kernel control channels, one per address family,
//!   and the `KernelChannel4`/`KernelChannel6` traits they implement.
//! * [`consts`] — kernel uAPI option numbers and control structures.
//! * [`config`] — runtime behavior knobs native to the route-manager
//!   layer.
//! * [`err`] — the layered error hierarchy (`ChanError`, `TableError`,
//!   `CoreError`).
//! * [`utils`] — bit-level helpers: prefix masking and kernel byte
//!   layout conversions.
//!
//! ## Design decisions
//!
//! This crate does not itself enumerate interfaces, parse
//! configuration, classify kernel upcalls, or choose a logging
//! implementation — those are the embedding daemon's job. It logs
//! through the [`log`] facade and lets the daemon pick the sink.
//!
//! `enable`/`disable` scope the kernel sockets' lifetime explicitly;
//! nothing here relies on `Drop` to release kernel resources except as
//! a last-resort safety net inside the channel implementations
//! themselves.

pub mod config;
pub mod consts;
pub mod err;
pub mod iface;
pub mod mif;
pub mod route;
pub mod router;
pub mod socket;
pub mod utils;
pub mod vif;

pub use config::{RouterConfig, RouterConfigBuilder};
pub use err::{ChanError, CoreError, TableError};
pub use iface::{IfaceFlags, Interface, InterfaceTable, Interfaces};
pub use route::{Mroute4, Mroute6, ANY_SOURCE};
pub use router::{upcall_route, MulticastRouter};

//! Runtime configuration for a [`MulticastRouter`][crate::router::MulticastRouter].
//!
//! This is not file-parsed daemon configuration — that lives entirely
//! outside this crate — but the handful of behavior knobs native to the
//! route-manager layer itself.

use derive_builder::Builder;
use getset::Getters;

use crate::consts::{MAX_MIF, MAX_VIF};

/// Configuration accepted by [`MulticastRouter::enable`][crate::router::MulticastRouter::enable].
///
/// Defaults match the original daemon's behavior: provision a VIF/MIF for
/// every multicast-capable, non-loopback interface found at enable time,
/// and require the kernel's compile-time table sizes to match this
/// crate's [`MAX_VIF`]/[`MAX_MIF`].
#[derive(Builder, Getters, Clone, Debug)]
#[builder(pattern = "owned", default)]
pub struct RouterConfig {
    /// If `true` (the default), `enable` walks the
    /// [`Interfaces`][crate::iface::Interfaces] provider from index zero
    /// and provisions a VIF/MIF for every multicast-capable interface it
    /// finds. If `false`, no VIFs/MIFs are provisioned automatically and
    /// the caller is expected to call `add_vif_by_name`/`add_mif` itself.
    ///
    #[getset(get = "pub")]
    auto_provision_vifs: bool,
    /// The kernel's compile-time `MAXVIFS`. Defaulted from
    /// [`MAX_VIF`]; overridable so tests can exercise slot exhaustion
    /// without a 32-entry interface list.
    #[getset(get = "pub")]
    max_vif: usize,
    /// The kernel's compile-time `MAXMIFS`. Defaulted from
    /// [`MAX_MIF`].
    #[getset(get = "pub")]
    max_mif: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            auto_provision_vifs: true,
            max_vif: MAX_VIF,
            max_mif: MAX_MIF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_kernel_table_sizes() {
        let cfg = RouterConfig::default();
        assert_eq!(*cfg.max_vif(), MAX_VIF);
        assert_eq!(*cfg.max_mif(), MAX_MIF);
        assert!(*cfg.auto_provision_vifs());
    }

    #[test]
    fn builder_overrides_table_size_for_tests() {
        let cfg = RouterConfigBuilder::default()
            .max_vif(4_usize)
            .build()
            .unwrap();
        assert_eq!(*cfg.max_vif(), 4);
    }
}

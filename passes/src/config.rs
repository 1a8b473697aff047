//! Pass configuration.
//!
//! Typed configuration with bon builders and environment variable fallbacks.

use std::str::FromStr;

use bon::bon;
use enumset::EnumSet;
use varform_ir::{GeometricQuantity, Side};

/// Geometric quantities a lowering pass leaves untouched.
pub type PreserveSet = EnumSet<GeometricQuantity>;

// ============================================================================
// GEOMETRY LOWERING
// ============================================================================

/// Configuration for geometry lowering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoweringConfig {
    /// Quantities kept as they are. Integral types add their own minimum set
    /// on top of this one.
    pub preserve: PreserveSet,
}

#[bon]
impl LoweringConfig {
    #[builder]
    pub fn new(#[builder(default)] preserve: PreserveSet) -> Self {
        Self { preserve }
    }
}

impl LoweringConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `VARFORM_PRESERVE_GEOMETRY` - Comma-separated snake_case quantity
    ///   names, e.g. `jacobian,cell_volume` (default: none)
    pub fn from_env() -> Self {
        let preserve =
            std::env::var("VARFORM_PRESERVE_GEOMETRY").ok().map(|s| parse_preserve_list(&s)).unwrap_or_default();
        Self { preserve }
    }
}

/// Parse a comma-separated list of quantity names, skipping unknown ones.
pub fn parse_preserve_list(list: &str) -> PreserveSet {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match GeometricQuantity::from_str(name) {
            Ok(quantity) => Some(quantity),
            Err(_) => {
                tracing::warn!(name, "ignoring unknown geometric quantity");
                None
            }
        })
        .collect()
}

// ============================================================================
// RESTRICTION PROPAGATION
// ============================================================================

/// Configuration for restriction propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionConfig {
    /// Restrict continuous quantities found outside any restriction to
    /// `default_side`.
    pub use_default_side: bool,
    /// Side continuous quantities and facet normals are evaluated on.
    pub default_side: Side,
}

impl Default for RestrictionConfig {
    fn default() -> Self {
        Self { use_default_side: true, default_side: Side::Plus }
    }
}

#[bon]
impl RestrictionConfig {
    #[builder]
    pub fn new(
        #[builder(default = true)] use_default_side: bool,
        #[builder(default = Side::Plus)] default_side: Side,
    ) -> Self {
        Self { use_default_side, default_side }
    }
}

impl RestrictionConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `VARFORM_NO_DEFAULT_SIDE` - Leave unrestricted continuous quantities alone if set
    /// * `VARFORM_DEFAULT_SIDE` - `+` or `-` (default: `+`)
    pub fn from_env() -> Self {
        let use_default_side = std::env::var("VARFORM_NO_DEFAULT_SIDE").is_err();
        let default_side =
            std::env::var("VARFORM_DEFAULT_SIDE").ok().and_then(|s| s.trim().parse().ok()).unwrap_or(Side::Plus);
        Self { use_default_side, default_side }
    }
}

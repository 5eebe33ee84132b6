//! Editor configuration.

use serde::Deserialize;

/// Upper bound for `size_precision`.
pub const MAX_SIZE_PRECISION: u32 = 10;

/// Tunables for history depth and handle interaction.
///
/// Every field has a default, so a JSON document only needs the keys it
/// wants to override.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo steps kept. Default: **100**.
    pub max_undo_depth: usize,

    /// Hit radius around resize handles, in screen pixels. Default: **6**.
    pub handle_hit_radius: f64,

    /// Width of the rotate ring outside each corner, in screen pixels.
    /// Default: **18**.
    pub rotate_ring_size: f64,

    /// How close (in degrees) an edge normal must be to a screen axis for
    /// edge resizing to snap the pointer to whole scene units. Default: **1**.
    pub axis_snap_tolerance_deg: f64,

    /// Step for Shift-constrained rotation, in degrees. Default: **15**.
    pub rotate_snap_deg: f64,

    /// Decimal places kept when scale is folded into size, at most
    /// [`MAX_SIZE_PRECISION`]. Default: **2**.
    pub size_precision: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: 100,
            handle_hit_radius: 6.0,
            rotate_ring_size: 18.0,
            axis_snap_tolerance_deg: 1.0,
            rotate_snap_deg: 15.0,
            size_precision: 2,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON configuration.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input or wrong types.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(text)?;
        if config.size_precision > MAX_SIZE_PRECISION {
            log::warn!(
                "size_precision {} clamped to {MAX_SIZE_PRECISION}",
                config.size_precision
            );
            config.size_precision = MAX_SIZE_PRECISION;
        }
        Ok(config)
    }
}

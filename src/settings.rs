//! Engine tuning
//!
//! Delays and placement radii, loadable from JSON so hosts can retune the
//! lab without recompiling.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, Result};

/// Engine tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    // === Timing ===
    /// Seconds a fired neutron is in flight before it strikes
    pub motion_delay_secs: f32,
    /// Seconds between an explosion and its fragments appearing
    pub post_fission_delay_secs: f32,

    // === Placement ===
    /// Neutrons may not be placed within this distance of a nuclide
    pub capture_radius: f32,
    /// Ring radius for fission products
    pub product_radius: f32,
    /// Ring radius for released neutrons
    pub neutron_radius: f32,

    // === Effects ===
    /// Number of `EnergyRelease` events per fission
    pub energy_burst_count: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            motion_delay_secs: MOTION_DELAY_SECS,
            post_fission_delay_secs: POST_FISSION_DELAY_SECS,

            capture_radius: CAPTURE_RADIUS,
            product_radius: PRODUCT_RADIUS,
            neutron_radius: NEUTRON_RADIUS,

            energy_burst_count: ENERGY_BURST_COUNT,
        }
    }
}

impl EngineSettings {
    /// Parse settings from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject negative or non-finite delays and non-positive radii
    pub fn validate(&self) -> Result<()> {
        let delays = [
            ("motion_delay_secs", self.motion_delay_secs),
            ("post_fission_delay_secs", self.post_fission_delay_secs),
        ];
        for (name, value) in delays {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidSetting(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }

        let radii = [
            ("capture_radius", self.capture_radius),
            ("product_radius", self.product_radius),
            ("neutron_radius", self.neutron_radius),
        ];
        for (name, value) in radii {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidSetting(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        Ok(())
    }
}

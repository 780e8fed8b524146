//! Configuration errors
//!
//! Only configuration paths are fallible. Simulation commands never return
//! errors: stale ids and rejected placements are silent no-ops.

use thiserror::Error;

use crate::sim::NuclideType;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fatal configuration problems, caught before the simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A nuclide type is referenced but has no property table entry.
    #[error("unknown nuclide {0}")]
    UnknownNuclide(NuclideType),

    /// A property table entry is internally inconsistent.
    #[error("invalid properties for {nuclide}: {reason}")]
    InvalidProperties {
        nuclide: NuclideType,
        reason: String,
    },

    /// The decay targets of a nuclide loop back on themselves.
    #[error("decay chain starting at {0} never reaches a stable nuclide")]
    DecayCycle(NuclideType),

    /// Engine tuning values are out of range.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// Malformed JSON configuration.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

//! Fission Lab - A nuclear chain-reaction simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (nuclides, neutrons, timers, events)
//! - `settings`: Data-driven engine tuning
//! - `score`: Fission scoring collaborators
//! - `error`: Configuration errors

pub mod error;
pub mod score;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, Result};
pub use score::{FissionReport, FissionScorer, ScoreTally};
pub use settings::EngineSettings;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed host-loop timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Time a fired neutron travels before its collision resolves (seconds)
    pub const MOTION_DELAY_SECS: f32 = 0.5;
    /// Pause between an explosion and the appearance of its fragments (seconds)
    pub const POST_FISSION_DELAY_SECS: f32 = 0.3;

    /// Neutrons cannot be placed this close to a nuclide
    pub const CAPTURE_RADIUS: f32 = 40.0;
    /// Ring radius for fission products around the split nuclide
    pub const PRODUCT_RADIUS: f32 = 60.0;
    /// Ring radius for released neutrons around the split nuclide
    pub const NEUTRON_RADIUS: f32 = 80.0;
    /// Size of the cosmetic energy burst emitted on every fission
    pub const ENERGY_BURST_COUNT: u32 = 3;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Points evenly spaced on a ring of `radius` around `center`, starting at angle 0
pub fn ring_positions(center: Vec2, radius: f32, count: usize) -> Vec<Vec2> {
    if count == 0 {
        return Vec::new();
    }
    let step = std::f32::consts::TAU / count as f32;
    (0..count)
        .map(|i| center + polar_to_cartesian(radius, step * i as f32))
        .collect()
}

//! Fission scoring
//!
//! The engine reports every completed fission to its scorers once the
//! fragments have appeared. `ScoreTally` is the built-in accumulator; hosts
//! may register their own `FissionScorer` for leaderboards or power readouts.

use serde::{Deserialize, Serialize};

/// Energy and neutron yield of one completed fission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FissionReport {
    /// Energy released (MeV)
    pub energy: f32,
    /// Neutrons released
    pub neutrons: u32,
}

/// Receiver of fission reports
pub trait FissionScorer {
    fn on_fission(&mut self, energy: f32, neutrons: u32);
}

/// Running totals over a simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreTally {
    /// Completed fissions
    pub fissions: u32,
    /// Sum of released energy (MeV)
    pub total_energy: f32,
    /// Sum of released neutrons
    pub total_neutrons: u32,
    /// Most recent report
    pub last: Option<FissionReport>,
}

impl ScoreTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent fission, if any
    pub fn last_fission(&self) -> Option<FissionReport> {
        self.last
    }

    /// Average energy per fission (0 before the first fission)
    pub fn mean_energy(&self) -> f32 {
        if self.fissions == 0 {
            0.0
        } else {
            self.total_energy / self.fissions as f32
        }
    }

    /// Forget everything (new seed placed)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl FissionScorer for ScoreTally {
    fn on_fission(&mut self, energy: f32, neutrons: u32) {
        self.fissions += 1;
        self.total_energy += energy;
        self.total_neutrons += neutrons;
        self.last = Some(FissionReport { energy, neutrons });
    }
}

//! Entity types and read-only snapshots
//!
//! Everything the engine owns per entity lives here. Collaborators only ever
//! see these through shared references or cloned snapshots.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::nuclide::NuclideType;
use super::scheduler::TimerHandle;

/// Nuclide identity, stable across absorption and decay
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NuclideId(pub u32);

impl fmt::Display for NuclideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nuclide#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NeutronId(pub u32);

impl fmt::Display for NeutronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "neutron#{}", self.0)
    }
}

/// Monotonic entity id source shared by nuclides and neutrons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start at `first` (useful for replaying a recorded run)
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Id the next call will hand out
    pub fn peek(&self) -> u32 {
        self.next
    }
}

/// Where a nuclide came from (display only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Placed by the user as the run's starting atom
    Seed,
    /// Produced by a fission
    Product,
}

/// Behavioral state, derived from the nuclide's current type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NuclideState {
    /// Waiting for a neutron (or inert)
    Stable,
    /// Will turn into `target` when `timer` fires
    Decaying {
        target: NuclideType,
        timer: TimerHandle,
    },
}

/// A nuclide entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nuclide {
    pub id: NuclideId,
    pub kind: NuclideType,
    pub pos: Vec2,
    pub provenance: Provenance,
    pub state: NuclideState,
}

impl Nuclide {
    /// Pending decay timer, if decaying
    pub fn decay_timer(&self) -> Option<TimerHandle> {
        match self.state {
            NuclideState::Decaying { timer, .. } => Some(timer),
            NuclideState::Stable => None,
        }
    }

    pub fn is_decaying(&self) -> bool {
        matches!(self.state, NuclideState::Decaying { .. })
    }
}

/// Neutron motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NeutronMotion {
    /// Resting where it was placed
    Idle,
    /// In flight toward a nuclide
    Moving { target: Vec2 },
}

/// A neutron entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neutron {
    pub id: NeutronId,
    pub pos: Vec2,
    pub motion: NeutronMotion,
}

impl Neutron {
    pub fn is_idle(&self) -> bool {
        self.motion == NeutronMotion::Idle
    }
}

/// Render-facing view of one nuclide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuclideView {
    pub id: NuclideId,
    pub kind: NuclideType,
    pub pos: Vec2,
    pub provenance: Provenance,
    /// Species this nuclide is decaying into
    pub decaying_into: Option<NuclideType>,
    /// Seconds left before the decay fires
    pub remaining_decay_secs: Option<f32>,
}

/// Committed state of the whole simulation at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Virtual clock, seconds
    pub time_secs: f32,
    /// Sorted by id
    pub nuclides: Vec<NuclideView>,
    /// Sorted by id
    pub neutrons: Vec<Neutron>,
    /// Outstanding timers (flights, fragment spawns, decays)
    pub pending_timers: usize,
}

//! Domain events
//!
//! What happened, in the order it happened. Presentation turns these into
//! effects and messages; nothing in the engine reads them back.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::nuclide::NuclideType;
use super::scheduler::VirtualTime;
use super::state::NuclideId;

/// One simulation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A nuclide split; fragments follow after the post-fission delay
    Explosion {
        nuclide: NuclideId,
        kind: NuclideType,
        pos: Vec2,
        products: Vec<NuclideType>,
        energy: f32,
        neutrons: u32,
    },
    /// A nuclide captured a neutron and changed species
    NeutronAbsorption {
        nuclide: NuclideId,
        pos: Vec2,
        from: NuclideType,
        to: NuclideType,
    },
    /// A nuclide decayed on its own
    BetaDecay {
        nuclide: NuclideId,
        pos: Vec2,
        from: NuclideType,
        to: NuclideType,
    },
    /// One flash of the burst that accompanies the fragments
    EnergyRelease { pos: Vec2, energy: f32 },
    /// A neutron hit but nothing happened
    FailedCollision {
        nuclide: NuclideId,
        pos: Vec2,
        kind: NuclideType,
    },
}

impl DomainEvent {
    pub fn pos(&self) -> Vec2 {
        match self {
            DomainEvent::Explosion { pos, .. }
            | DomainEvent::NeutronAbsorption { pos, .. }
            | DomainEvent::BetaDecay { pos, .. }
            | DomainEvent::EnergyRelease { pos, .. }
            | DomainEvent::FailedCollision { pos, .. } => *pos,
        }
    }

    /// Short variant name, handy for logs and assertions
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::Explosion { .. } => "Explosion",
            DomainEvent::NeutronAbsorption { .. } => "NeutronAbsorption",
            DomainEvent::BetaDecay { .. } => "BetaDecay",
            DomainEvent::EnergyRelease { .. } => "EnergyRelease",
            DomainEvent::FailedCollision { .. } => "FailedCollision",
        }
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainEvent::Explosion {
                kind,
                products,
                energy,
                neutrons,
                ..
            } => {
                let products: Vec<_> = products.iter().map(NuclideType::symbol).collect();
                write!(
                    f,
                    "{kind} fissioned into {} releasing {energy} MeV and {neutrons} neutrons",
                    products.join(" + ")
                )
            }
            DomainEvent::NeutronAbsorption { from, to, .. } => {
                write!(f, "{from} absorbed a neutron and became {to}")
            }
            DomainEvent::BetaDecay { from, to, .. } => write!(f, "{from} beta-decayed into {to}"),
            DomainEvent::EnergyRelease { energy, .. } => write!(f, "{energy} MeV released"),
            DomainEvent::FailedCollision { kind, .. } => {
                write!(f, "neutron struck {kind} without effect")
            }
        }
    }
}

/// An event stamped with its emission order and virtual time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub seq: u64,
    pub at: VirtualTime,
    pub event: DomainEvent,
}

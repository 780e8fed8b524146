//! Nuclide kinds and their physical behavior records

use std::fmt;

use serde::{Deserialize, Serialize};

/// Nuclide species known to the lab
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum NuclideType {
    // Fuel and breeding chains
    U235,
    U238,
    U239,
    Np239,
    Pu239,
    Th232,
    Th233,
    Pa233,
    U233,
    // Fission fragments
    Ba,
    Kr,
    Xe,
    Zr,
    Cs,
    Rb,
}

impl NuclideType {
    /// Every species, in declaration order
    pub const ALL: [NuclideType; 15] = [
        NuclideType::U235,
        NuclideType::U238,
        NuclideType::U239,
        NuclideType::Np239,
        NuclideType::Pu239,
        NuclideType::Th232,
        NuclideType::Th233,
        NuclideType::Pa233,
        NuclideType::U233,
        NuclideType::Ba,
        NuclideType::Kr,
        NuclideType::Xe,
        NuclideType::Zr,
        NuclideType::Cs,
        NuclideType::Rb,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            NuclideType::U235 => "U235",
            NuclideType::U238 => "U238",
            NuclideType::U239 => "U239",
            NuclideType::Np239 => "Np239",
            NuclideType::Pu239 => "Pu239",
            NuclideType::Th232 => "Th232",
            NuclideType::Th233 => "Th233",
            NuclideType::Pa233 => "Pa233",
            NuclideType::U233 => "U233",
            NuclideType::Ba => "Ba",
            NuclideType::Kr => "Kr",
            NuclideType::Xe => "Xe",
            NuclideType::Zr => "Zr",
            NuclideType::Cs => "Cs",
            NuclideType::Rb => "Rb",
        }
    }

    /// Case-insensitive symbol lookup ("u235", "Np239", ...)
    pub fn from_symbol(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.symbol().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for NuclideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How one nuclide species reacts to neutrons and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FissionProperties {
    /// May split when struck by a neutron
    #[serde(default)]
    pub can_fission: bool,
    /// Captures a neutron and becomes `transform_target`
    #[serde(default)]
    pub can_absorb: bool,
    /// Turns into `decay_target` after `decay_delay_secs`, no neutron needed
    #[serde(default)]
    pub is_decaying: bool,
    /// Chance (0-1) that a striking neutron splits the nucleus
    #[serde(default)]
    pub probability: f32,
    /// Energy released per fission (MeV)
    #[serde(default)]
    pub energy_released: f32,
    /// Neutrons emitted per fission
    #[serde(default)]
    pub neutrons_released: u32,
    /// Fission fragments, in angular placement order
    #[serde(default)]
    pub products: Vec<NuclideType>,
    #[serde(default)]
    pub transform_target: Option<NuclideType>,
    #[serde(default)]
    pub decay_target: Option<NuclideType>,
    #[serde(default)]
    pub decay_delay_secs: Option<f32>,
}

impl FissionProperties {
    /// Neither splits, absorbs, nor decays
    pub fn inert() -> Self {
        Self {
            can_fission: false,
            can_absorb: false,
            is_decaying: false,
            probability: 0.0,
            energy_released: 0.0,
            neutrons_released: 0,
            products: Vec::new(),
            transform_target: None,
            decay_target: None,
            decay_delay_secs: None,
        }
    }

    pub fn fissile(
        probability: f32,
        energy_released: f32,
        neutrons_released: u32,
        products: Vec<NuclideType>,
    ) -> Self {
        Self {
            can_fission: true,
            probability,
            energy_released,
            neutrons_released,
            products,
            ..Self::inert()
        }
    }

    pub fn absorber(target: NuclideType) -> Self {
        Self {
            can_absorb: true,
            transform_target: Some(target),
            ..Self::inert()
        }
    }

    pub fn decaying(target: NuclideType, delay_secs: f32) -> Self {
        Self {
            is_decaying: true,
            decay_target: Some(target),
            decay_delay_secs: Some(delay_secs),
            ..Self::inert()
        }
    }

    /// Species this record can turn into (fragments, absorption and decay targets)
    pub fn references(&self) -> impl Iterator<Item = NuclideType> + '_ {
        self.products
            .iter()
            .copied()
            .chain(self.transform_target)
            .chain(self.decay_target)
    }
}

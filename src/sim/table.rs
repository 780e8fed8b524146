//! Property table
//!
//! Immutable mapping from nuclide species to behavior. Built once at startup,
//! validated eagerly, then lent to the engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::nuclide::{FissionProperties, NuclideType};
use crate::error::{ConfigError, Result};

/// Species → behavior lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyTable {
    entries: BTreeMap<NuclideType, FissionProperties>,
}

impl PropertyTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The lab's built-in species: U235 fuel, two breeding chains, inert fragments
    pub fn standard() -> Self {
        use NuclideType::*;

        Self::new()
            // Fissile fuel
            .with(U235, FissionProperties::fissile(0.85, 200.0, 3, vec![Ba, Kr]))
            .with(Pu239, FissionProperties::fissile(0.9, 210.0, 3, vec![Xe, Zr]))
            .with(U233, FissionProperties::fissile(0.8, 197.0, 2, vec![Cs, Rb]))
            // Uranium-plutonium breeding
            .with(U238, FissionProperties::absorber(U239))
            .with(U239, FissionProperties::decaying(Np239, 3.0))
            .with(Np239, FissionProperties::decaying(Pu239, 5.0))
            // Thorium-uranium breeding
            .with(Th232, FissionProperties::absorber(Th233))
            .with(Th233, FissionProperties::decaying(Pa233, 2.0))
            .with(Pa233, FissionProperties::decaying(U233, 4.0))
            // Dead-end fragments
            .with(Ba, FissionProperties::inert())
            .with(Kr, FissionProperties::inert())
            .with(Xe, FissionProperties::inert())
            .with(Zr, FissionProperties::inert())
            .with(Cs, FissionProperties::inert())
            .with(Rb, FissionProperties::inert())
    }

    /// Builder-style insert (replaces an existing entry)
    pub fn with(mut self, kind: NuclideType, props: FissionProperties) -> Self {
        self.insert(kind, props);
        self
    }

    pub fn insert(&mut self, kind: NuclideType, props: FissionProperties) {
        self.entries.insert(kind, props);
    }

    /// Properties of a registered species.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not registered. Engines only hold validated
    /// tables, so reaching this is a configuration bug.
    pub fn lookup(&self, kind: NuclideType) -> &FissionProperties {
        match self.entries.get(&kind) {
            Some(props) => props,
            None => panic!("{}", ConfigError::UnknownNuclide(kind)),
        }
    }

    pub fn try_lookup(&self, kind: NuclideType) -> Result<&FissionProperties> {
        self.entries
            .get(&kind)
            .ok_or(ConfigError::UnknownNuclide(kind))
    }

    pub fn contains(&self, kind: NuclideType) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered species, sorted
    pub fn kinds(&self) -> impl Iterator<Item = NuclideType> + '_ {
        self.entries.keys().copied()
    }

    /// Check every record and the closure of everything reachable from it.
    ///
    /// Every product, absorption target and decay target must itself be
    /// registered, values must be in range, and decay chains must end.
    pub fn validate(&self) -> Result<()> {
        for (&kind, props) in &self.entries {
            Self::validate_entry(kind, props)?;
            for referenced in props.references() {
                if !self.contains(referenced) {
                    return Err(ConfigError::UnknownNuclide(referenced));
                }
            }
        }

        for kind in self.kinds() {
            self.check_decay_terminates(kind)?;
        }

        Ok(())
    }

    /// Species reachable from `start` by any transition, `start` included
    pub fn reachable_from(&self, start: NuclideType) -> Result<BTreeSet<NuclideType>> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(kind) = stack.pop() {
            if !seen.insert(kind) {
                continue;
            }
            stack.extend(self.try_lookup(kind)?.references());
        }
        Ok(seen)
    }

    /// Parse and validate a JSON table (`{ "U235": { ... }, ... }`)
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate_entry(kind: NuclideType, props: &FissionProperties) -> Result<()> {
        let invalid = |reason: &str| ConfigError::InvalidProperties {
            nuclide: kind,
            reason: reason.to_string(),
        };

        if !(0.0..=1.0).contains(&props.probability) {
            return Err(invalid("probability must be within [0, 1]"));
        }
        if !props.energy_released.is_finite() || props.energy_released < 0.0 {
            return Err(invalid("energy_released must be non-negative"));
        }
        if props.can_absorb && props.transform_target.is_none() {
            return Err(invalid("absorbing nuclide needs a transform_target"));
        }
        if props.is_decaying {
            if props.decay_target.is_none() {
                return Err(invalid("decaying nuclide needs a decay_target"));
            }
            match props.decay_delay_secs {
                Some(delay) if delay.is_finite() && delay >= 0.0 => {}
                _ => return Err(invalid("decaying nuclide needs a non-negative decay_delay_secs")),
            }
        }
        Ok(())
    }

    fn check_decay_terminates(&self, start: NuclideType) -> Result<()> {
        let mut visited = BTreeSet::new();
        let mut current = start;
        loop {
            let props = self.try_lookup(current)?;
            let next = match (props.is_decaying, props.decay_target) {
                (true, Some(next)) => next,
                _ => return Ok(()),
            };
            if !visited.insert(current) {
                return Err(ConfigError::DecayCycle(start));
            }
            current = next;
        }
    }
}

//! Deterministic simulation module
//!
//! All chain-reaction logic lives here. This module must be pure and deterministic:
//! - Virtual time only (no wall clock)
//! - Injected RNG and id source only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod engine;
pub mod event;
pub mod nuclide;
pub mod resolver;
pub mod scheduler;
pub mod state;
pub mod table;

pub use engine::Engine;
pub use event::{DomainEvent, TimedEvent};
pub use nuclide::{FissionProperties, NuclideType};
pub use resolver::{FixedOutcome, OutcomeResolver, RngResolver};
pub use scheduler::{TimerHandle, TimerScheduler, VirtualTime};
pub use state::{
    IdAllocator, Neutron, NeutronId, NeutronMotion, Nuclide, NuclideId, NuclideState,
    NuclideView, Provenance, Snapshot,
};
pub use table::PropertyTable;

//! Simulation engine
//!
//! Owns every nuclide, neutron and timer. Commands mutate state immediately
//! or queue a task; `advance` replays due tasks one at a time, in fire order,
//! so collections are never observed half-updated.
//!
//! Timers race freely: a decay and an in-flight neutron may both target the
//! same nuclide. Whichever fires second re-checks the entity and quietly does
//! nothing if it is gone or has moved on.

use glam::Vec2;

use super::event::{DomainEvent, TimedEvent};
use super::nuclide::{FissionProperties, NuclideType};
use super::resolver::{OutcomeResolver, RngResolver};
use super::scheduler::{Fired, TimerScheduler, VirtualTime, secs_to_millis};
use super::state::{
    IdAllocator, Neutron, NeutronId, NeutronMotion, Nuclide, NuclideId, NuclideState,
    NuclideView, Provenance, Snapshot,
};
use super::table::PropertyTable;
use crate::error::Result;
use crate::ring_positions;
use crate::score::{FissionScorer, ScoreTally};
use crate::settings::EngineSettings;

/// Deferred work, keyed by the entities it touches
#[derive(Debug, Clone, PartialEq)]
enum Task {
    /// A fired neutron arrives at its target
    ResolveCollision { neutron: NeutronId, nuclide: NuclideId },
    /// Fragments and released neutrons of a finished fission appear
    SpawnFragments {
        origin: Vec2,
        products: Vec<NuclideType>,
        neutrons: u32,
        energy: f32,
    },
    /// A decaying nuclide's delay has elapsed
    Decay { nuclide: NuclideId },
}

/// The chain-reaction simulation
pub struct Engine<'t, R = RngResolver> {
    table: &'t PropertyTable,
    settings: EngineSettings,
    resolver: R,
    ids: IdAllocator,
    timers: TimerScheduler<Task>,
    /// Sorted by id
    nuclides: Vec<Nuclide>,
    /// Sorted by id
    neutrons: Vec<Neutron>,
    events: Vec<TimedEvent>,
    next_seq: u64,
    /// Sub-millisecond remainder carried between `advance` calls
    carry_ms: f64,
    tally: ScoreTally,
    scorers: Vec<Box<dyn FissionScorer>>,
}

impl<'t, R: OutcomeResolver> Engine<'t, R> {
    /// Build an engine over a table and tuning values, validating both.
    pub fn new(table: &'t PropertyTable, settings: EngineSettings, resolver: R) -> Result<Self> {
        table.validate()?;
        settings.validate()?;
        log::info!("engine ready with {} nuclide species", table.len());
        Ok(Self {
            table,
            settings,
            resolver,
            ids: IdAllocator::new(),
            timers: TimerScheduler::new(),
            nuclides: Vec::new(),
            neutrons: Vec::new(),
            events: Vec::new(),
            next_seq: 0,
            carry_ms: 0.0,
            tally: ScoreTally::new(),
            scorers: Vec::new(),
        })
    }

    /// Replace the entity id source
    pub fn with_ids(mut self, ids: IdAllocator) -> Self {
        self.ids = ids;
        self
    }

    /// Also report fissions to `scorer`
    pub fn add_scorer(&mut self, scorer: Box<dyn FissionScorer>) {
        self.scorers.push(scorer);
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Clear the lab and place a single starting nuclide.
    ///
    /// Fails only if `kind` has no table entry.
    pub fn spawn_seed_nuclide(&mut self, kind: NuclideType, pos: Vec2) -> Result<NuclideId> {
        self.table.try_lookup(kind)?;

        self.timers.clear();
        self.nuclides.clear();
        self.neutrons.clear();
        self.tally.reset();

        let id = self.spawn_nuclide(kind, pos, Provenance::Seed);
        log::info!("seeded {kind} as {id} at ({}, {})", pos.x, pos.y);
        Ok(id)
    }

    /// Add an idle neutron unless `pos` is inside a nuclide's capture radius
    pub fn place_neutron(&mut self, pos: Vec2) -> Option<NeutronId> {
        if !pos.is_finite() {
            log::debug!("rejected non-finite neutron placement");
            return None;
        }
        let radius = self.settings.capture_radius;
        if self.nuclides.iter().any(|n| n.pos.distance(pos) < radius) {
            log::debug!("rejected neutron placement at ({}, {})", pos.x, pos.y);
            return None;
        }
        Some(self.spawn_neutron(pos))
    }

    /// Send an idle neutron toward a nuclide. The hit resolves after the
    /// motion delay. Returns false if either id is stale or the neutron is
    /// already in flight.
    pub fn fire_neutron_at(&mut self, neutron: NeutronId, nuclide: NuclideId) -> bool {
        let Some(target) = self.nuclide(nuclide).map(|n| n.pos) else {
            log::debug!("fire at missing {nuclide} ignored");
            return false;
        };
        let Some(n) = self.neutrons.iter_mut().find(|n| n.id == neutron) else {
            log::debug!("fire of missing {neutron} ignored");
            return false;
        };
        if !n.is_idle() {
            return false;
        }

        n.motion = NeutronMotion::Moving { target };
        let delay = secs_to_millis(self.settings.motion_delay_secs);
        self.timers
            .schedule(delay, Task::ResolveCollision { neutron, nuclide });
        true
    }

    /// Fire the lowest-id idle neutron at the lowest-id nuclide
    pub fn fire_first_available_neutron(&mut self) -> bool {
        let neutron = self.neutrons.iter().find(|n| n.is_idle()).map(|n| n.id);
        let nuclide = self.nuclides.first().map(|n| n.id);
        match (neutron, nuclide) {
            (Some(neutron), Some(nuclide)) => self.fire_neutron_at(neutron, nuclide),
            _ => false,
        }
    }

    /// Settle a neutron striking a nuclide.
    ///
    /// The neutron is consumed whatever happens. Absorption takes precedence
    /// over fission; a failed roll or an inert target yields `FailedCollision`.
    /// If the nuclide is already gone the shot simply misses.
    pub fn resolve_collision(&mut self, neutron: NeutronId, nuclide: NuclideId) {
        let Some(index) = self.neutrons.iter().position(|n| n.id == neutron) else {
            return;
        };
        self.neutrons.remove(index);

        let Some((kind, pos)) = self.nuclide(nuclide).map(|n| (n.kind, n.pos)) else {
            log::debug!("{neutron} missed: {nuclide} no longer exists");
            return;
        };
        let table = self.table;
        let props = table.lookup(kind);

        if let (true, Some(to)) = (props.can_absorb, props.transform_target) {
            self.transmute(nuclide, to);
            self.emit(DomainEvent::NeutronAbsorption {
                nuclide,
                pos,
                from: kind,
                to,
            });
            return;
        }

        if props.can_fission && self.resolver.succeeds(props.probability) {
            self.fission(nuclide, kind, pos, props);
            return;
        }

        self.emit(DomainEvent::FailedCollision { nuclide, pos, kind });
    }

    /// Apply one decay step to a nuclide whose current type decays.
    ///
    /// Any pending decay timer is consumed. No-op for missing or
    /// non-decaying nuclides.
    pub fn tick_decay(&mut self, nuclide: NuclideId) {
        let Some((from, pos)) = self.nuclide(nuclide).map(|n| (n.kind, n.pos)) else {
            return;
        };
        let props = self.table.lookup(from);
        let Some(to) = props.decay_target.filter(|_| props.is_decaying) else {
            return;
        };

        self.transmute(nuclide, to);
        self.emit(DomainEvent::BetaDecay {
            nuclide,
            pos,
            from,
            to,
        });
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance virtual time by `dt` seconds, firing every timer that comes due
    pub fn advance(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.carry_ms += dt as f64 * 1000.0;
        let whole = self.carry_ms.floor();
        self.carry_ms -= whole;
        let until = self.timers.now().plus(whole as u64);
        self.run_until(until);
    }

    /// Fire timers in order until none remain. Returns how many fired.
    pub fn run_until_idle(&mut self) -> usize {
        let mut fired = 0;
        while let Some(at) = self.timers.next_fire_time() {
            fired += self.run_until(at);
        }
        fired
    }

    /// Current virtual time
    pub fn now(&self) -> VirtualTime {
        self.timers.now()
    }

    fn run_until(&mut self, until: VirtualTime) -> usize {
        let mut fired = 0;
        while let Some(due) = self.timers.pop_due(until) {
            self.dispatch(due);
            fired += 1;
        }
        self.timers.advance_clock(until);
        fired
    }

    fn dispatch(&mut self, fired: Fired<Task>) {
        match fired.task {
            Task::ResolveCollision { neutron, nuclide } => {
                self.resolve_collision(neutron, nuclide)
            }
            Task::SpawnFragments {
                origin,
                products,
                neutrons,
                energy,
            } => self.spawn_fragments(origin, &products, neutrons, energy),
            Task::Decay { nuclide } => {
                // Only the timer the nuclide is currently waiting on may decay it
                let current = self.nuclide(nuclide).and_then(Nuclide::decay_timer);
                if current == Some(fired.handle) {
                    self.tick_decay(nuclide);
                } else {
                    log::debug!("stale decay {} for {nuclide} ignored", fired.handle);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn nuclides(&self) -> &[Nuclide] {
        &self.nuclides
    }

    pub fn neutrons(&self) -> &[Neutron] {
        &self.neutrons
    }

    pub fn nuclide(&self, id: NuclideId) -> Option<&Nuclide> {
        self.nuclides.iter().find(|n| n.id == id)
    }

    pub fn neutron(&self, id: NeutronId) -> Option<&Neutron> {
        self.neutrons.iter().find(|n| n.id == id)
    }

    /// Outstanding timers
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Built-in fission totals since the last seed
    pub fn score(&self) -> &ScoreTally {
        &self.tally
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn table(&self) -> &'t PropertyTable {
        self.table
    }

    /// Events not yet drained
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Take every event emitted since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<TimedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> Snapshot {
        let nuclides = self
            .nuclides
            .iter()
            .map(|n| {
                let (decaying_into, remaining_decay_secs) = match n.state {
                    NuclideState::Decaying { target, timer } => (
                        Some(target),
                        self.timers.remaining(timer).map(|ms| ms as f32 / 1000.0),
                    ),
                    NuclideState::Stable => (None, None),
                };
                NuclideView {
                    id: n.id,
                    kind: n.kind,
                    pos: n.pos,
                    provenance: n.provenance,
                    decaying_into,
                    remaining_decay_secs,
                }
            })
            .collect();

        Snapshot {
            time_secs: self.timers.now().as_secs_f32(),
            nuclides,
            neutrons: self.neutrons.clone(),
            pending_timers: self.timers.len(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn spawn_nuclide(&mut self, kind: NuclideType, pos: Vec2, provenance: Provenance) -> NuclideId {
        let id = NuclideId(self.ids.next_id());
        self.nuclides.push(Nuclide {
            id,
            kind,
            pos,
            provenance,
            state: NuclideState::Stable,
        });
        self.settle(id);
        id
    }

    fn spawn_neutron(&mut self, pos: Vec2) -> NeutronId {
        let id = NeutronId(self.ids.next_id());
        self.neutrons.push(Neutron {
            id,
            pos,
            motion: NeutronMotion::Idle,
        });
        id
    }

    /// Change a nuclide's species in place, dropping any pending decay
    fn transmute(&mut self, id: NuclideId, to: NuclideType) {
        let Some(n) = self.nuclides.iter_mut().find(|n| n.id == id) else {
            return;
        };
        if let Some(timer) = n.decay_timer() {
            self.timers.cancel(timer);
        }
        n.kind = to;
        n.state = NuclideState::Stable;
        self.settle(id);
    }

    /// Derive state from the current species; start the decay clock if it decays
    fn settle(&mut self, id: NuclideId) {
        let table = self.table;
        let Some(n) = self.nuclides.iter_mut().find(|n| n.id == id) else {
            return;
        };
        let props = table.lookup(n.kind);
        if let (true, Some(target)) = (props.is_decaying, props.decay_target) {
            let delay = secs_to_millis(props.decay_delay_secs.unwrap_or(0.0));
            let timer = self.timers.schedule(delay, Task::Decay { nuclide: id });
            n.state = NuclideState::Decaying { target, timer };
        } else {
            n.state = NuclideState::Stable;
        }
    }

    /// Remove a nuclide, cancelling whatever decay it owns
    fn remove_nuclide(&mut self, id: NuclideId) -> Option<Nuclide> {
        let index = self.nuclides.iter().position(|n| n.id == id)?;
        let removed = self.nuclides.remove(index);
        if let Some(timer) = removed.decay_timer() {
            self.timers.cancel(timer);
        }
        Some(removed)
    }

    fn fission(&mut self, id: NuclideId, kind: NuclideType, pos: Vec2, props: &FissionProperties) {
        self.remove_nuclide(id);
        self.emit(DomainEvent::Explosion {
            nuclide: id,
            kind,
            pos,
            products: props.products.clone(),
            energy: props.energy_released,
            neutrons: props.neutrons_released,
        });

        let delay = secs_to_millis(self.settings.post_fission_delay_secs);
        self.timers.schedule(
            delay,
            Task::SpawnFragments {
                origin: pos,
                products: props.products.clone(),
                neutrons: props.neutrons_released,
                energy: props.energy_released,
            },
        );
    }

    fn spawn_fragments(
        &mut self,
        origin: Vec2,
        products: &[NuclideType],
        neutrons: u32,
        energy: f32,
    ) {
        for (kind, pos) in products
            .iter()
            .zip(ring_positions(origin, self.settings.product_radius, products.len()))
        {
            self.spawn_nuclide(*kind, pos, Provenance::Product);
        }

        for pos in ring_positions(origin, self.settings.neutron_radius, neutrons as usize) {
            self.spawn_neutron(pos);
        }

        let bursts = self.settings.energy_burst_count;
        if bursts > 0 {
            let share = energy / bursts as f32;
            for pos in ring_positions(origin, self.settings.neutron_radius, bursts as usize) {
                self.emit(DomainEvent::EnergyRelease { pos, energy: share });
            }
        }

        self.tally.on_fission(energy, neutrons);
        for scorer in &mut self.scorers {
            scorer.on_fission(energy, neutrons);
        }
    }

    fn emit(&mut self, event: DomainEvent) {
        log::debug!("{}: {event}", self.timers.now());
        self.events.push(TimedEvent {
            seq: self.next_seq,
            at: self.timers.now(),
            event,
        });
        self.next_seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::f32::consts::TAU;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::consts::SIM_DT;
    use crate::error::ConfigError;
    use crate::score::FissionReport;
    use crate::sim::resolver::FixedOutcome;
    use NuclideType::*;

    fn engine(table: &PropertyTable, hit: bool) -> Engine<'_, FixedOutcome> {
        Engine::new(table, EngineSettings::default(), FixedOutcome(hit)).unwrap()
    }

    fn names(events: &[TimedEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.event.name()).collect()
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    /// Fire a fresh neutron from below the first nuclide
    fn shoot(engine: &mut Engine<'_, impl OutcomeResolver>) -> NeutronId {
        let target = engine.nuclides()[0].clone();
        let neutron = engine
            .place_neutron(target.pos + Vec2::new(0.0, 60.0))
            .unwrap();
        assert!(engine.fire_neutron_at(neutron, target.id));
        neutron
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<FissionReport>>>);

    impl FissionScorer for Recorder {
        fn on_fission(&mut self, energy: f32, neutrons: u32) {
            self.0.borrow_mut().push(FissionReport { energy, neutrons });
        }
    }

    #[test]
    fn test_u235_fission_scenario() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        let recorder = Recorder::default();
        engine.add_scorer(Box::new(recorder.clone()));

        let origin = Vec2::new(100.0, 100.0);
        let u235 = engine.spawn_seed_nuclide(U235, origin).unwrap();
        let neutron = engine.place_neutron(Vec2::new(100.0, 160.0)).unwrap();
        assert!(engine.fire_neutron_at(neutron, u235));
        assert_eq!(
            engine.neutron(neutron).unwrap().motion,
            NeutronMotion::Moving { target: origin }
        );

        // Neutron in flight: nothing resolved yet
        engine.advance(0.4);
        assert!(engine.events().is_empty());

        engine.advance(0.1);
        let events = engine.drain_events();
        assert_eq!(names(&events), vec!["Explosion"]);
        assert_eq!(events[0].at, VirtualTime::from_millis(500));
        match &events[0].event {
            DomainEvent::Explosion {
                pos,
                products,
                energy,
                neutrons,
                ..
            } => {
                assert_eq!(*pos, origin);
                assert_eq!(products, &vec![Ba, Kr]);
                assert_eq!(*energy, 200.0);
                assert_eq!(*neutrons, 3);
            }
            other => panic!("expected explosion, got {other:?}"),
        }
        assert!(engine.nuclides().is_empty());
        assert!(engine.neutrons().is_empty());
        assert!(engine.score().last_fission().is_none());

        // Fragments appear after the post-fission delay
        engine.advance(0.3);
        let events = engine.drain_events();
        assert_eq!(
            names(&events),
            vec!["EnergyRelease", "EnergyRelease", "EnergyRelease"]
        );

        let products = engine.nuclides();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].kind, Ba);
        assert_eq!(products[1].kind, Kr);
        assert!(close(products[0].pos, Vec2::new(160.0, 100.0)));
        assert!(close(products[1].pos, Vec2::new(40.0, 100.0)));
        assert!(products.iter().all(|n| n.provenance == Provenance::Product));

        let released = engine.neutrons();
        assert_eq!(released.len(), 3);
        for (i, n) in released.iter().enumerate() {
            assert!(n.is_idle());
            let expected = origin + crate::polar_to_cartesian(80.0, TAU / 3.0 * i as f32);
            assert!(close(n.pos, expected));
        }

        let report = FissionReport {
            energy: 200.0,
            neutrons: 3,
        };
        assert_eq!(engine.score().last_fission(), Some(report));
        assert_eq!(recorder.0.borrow().as_slice(), &[report]);
        assert_eq!(engine.pending_timers(), 0);
    }

    #[test]
    fn test_u238_breeding_chain() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, false);
        let id = engine
            .spawn_seed_nuclide(U238, Vec2::new(100.0, 100.0))
            .unwrap();
        shoot(&mut engine);

        engine.advance(0.5);
        let n = engine.nuclide(id).unwrap();
        assert_eq!(n.kind, U239);
        assert!(n.is_decaying());
        assert_eq!(engine.pending_timers(), 1);
        assert!(engine.neutrons().is_empty());

        engine.advance(3.0);
        assert_eq!(engine.nuclide(id).unwrap().kind, Np239);

        engine.advance(5.0);
        let n = engine.nuclide(id).unwrap();
        assert_eq!(n.kind, Pu239);
        assert_eq!(n.state, NuclideState::Stable);
        assert_eq!(engine.pending_timers(), 0);

        let events = engine.drain_events();
        assert_eq!(
            names(&events),
            vec!["NeutronAbsorption", "BetaDecay", "BetaDecay"]
        );
        assert!(matches!(
            events[0].event,
            DomainEvent::NeutronAbsorption { from: U238, to: U239, .. }
        ));
        assert!(matches!(
            events[2].event,
            DomainEvent::BetaDecay { from: Np239, to: Pu239, .. }
        ));
        // Same identity through every transformation
        assert_eq!(engine.nuclides().len(), 1);
    }

    #[test]
    fn test_th232_breeding_chain() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, false);
        let id = engine
            .spawn_seed_nuclide(Th232, Vec2::new(100.0, 100.0))
            .unwrap();
        shoot(&mut engine);

        engine.advance(0.5);
        assert_eq!(engine.nuclide(id).unwrap().kind, Th233);
        assert!(engine.neutrons().is_empty());

        engine.advance(2.0);
        assert_eq!(engine.nuclide(id).unwrap().kind, Pa233);

        engine.advance(4.0);
        let n = engine.nuclide(id).unwrap();
        assert_eq!(n.kind, U233);
        assert_eq!(n.state, NuclideState::Stable);
        assert!(table.lookup(n.kind).can_fission);
        assert_eq!(engine.pending_timers(), 0);

        let events = engine.drain_events();
        assert_eq!(
            names(&events),
            vec!["NeutronAbsorption", "BetaDecay", "BetaDecay"]
        );
        let times: Vec<_> = events.iter().map(|e| e.at.millis()).collect();
        assert_eq!(times, vec![500, 2500, 6500]);
        assert!(matches!(
            events[2].event,
            DomainEvent::BetaDecay { from: Pa233, to: U233, .. }
        ));
    }

    #[test]
    fn test_absorption_cancels_pending_decay() {
        // Decays into Np239 unless it captures a neutron first
        let hybrid = FissionProperties {
            can_absorb: true,
            transform_target: Some(Pu239),
            ..FissionProperties::decaying(Np239, 3.0)
        };
        let table = PropertyTable::standard().with(U239, hybrid);
        let mut engine = engine(&table, true);
        let id = engine.spawn_seed_nuclide(U239, Vec2::ZERO).unwrap();
        assert!(engine.nuclide(id).unwrap().is_decaying());

        shoot(&mut engine);
        engine.run_until_idle();

        assert_eq!(names(engine.events()), vec!["NeutronAbsorption"]);
        let n = engine.nuclide(id).unwrap();
        assert_eq!(n.kind, Pu239);
        assert_eq!(n.state, NuclideState::Stable);
        assert_eq!(engine.pending_timers(), 0);
    }

    #[test]
    fn test_energy_burst_is_fixed_size() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U233, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        engine.run_until_idle();

        let bursts = names(engine.events())
            .into_iter()
            .filter(|name| *name == "EnergyRelease")
            .count();
        assert_eq!(bursts, engine.settings().energy_burst_count as usize);
        assert_eq!(engine.neutrons().len(), 2);
    }

    #[test]
    fn test_zero_probability_never_explodes() {
        let table = PropertyTable::standard().with(
            U235,
            FissionProperties::fissile(0.0, 200.0, 3, vec![Ba, Kr]),
        );
        let mut engine =
            Engine::new(&table, EngineSettings::default(), RngResolver::seeded(1)).unwrap();
        let id = engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        for _ in 0..20 {
            shoot(&mut engine);
            engine.run_until_idle();
        }
        let events = engine.drain_events();
        assert_eq!(events.len(), 20);
        assert!(events.iter().all(|e| e.event.name() == "FailedCollision"));
        assert_eq!(engine.nuclide(id).unwrap().kind, U235);
    }

    #[test]
    fn test_inert_fragment_is_a_dead_end() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        let id = engine.spawn_seed_nuclide(Kr, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        engine.run_until_idle();

        let events = engine.drain_events();
        assert!(matches!(
            events.as_slice(),
            [TimedEvent {
                event: DomainEvent::FailedCollision { kind: Kr, .. },
                ..
            }]
        ));
        assert_eq!(engine.nuclide(id).unwrap().kind, Kr);
        assert!(engine.neutrons().is_empty());
    }

    #[test]
    fn test_fission_cancels_pending_decay() {
        // Decays slowly but splits on contact
        let hybrid = FissionProperties {
            is_decaying: true,
            decay_target: Some(Np239),
            decay_delay_secs: Some(3.0),
            ..FissionProperties::fissile(1.0, 50.0, 1, vec![Ba])
        };
        let table = PropertyTable::standard().with(U239, hybrid);
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U239, Vec2::ZERO).unwrap();
        assert_eq!(engine.pending_timers(), 1);

        shoot(&mut engine);
        engine.run_until_idle();

        let events = engine.drain_events();
        assert!(!events.iter().any(|e| e.event.name() == "BetaDecay"));
        assert_eq!(events[0].event.name(), "Explosion");
        assert_eq!(engine.nuclides().len(), 1);
        assert_eq!(engine.nuclides()[0].kind, Ba);
    }

    #[test]
    fn test_decay_wins_race_then_collision_fails() {
        let table = PropertyTable::standard().with(U239, FissionProperties::decaying(Np239, 0.2));
        let mut engine = engine(&table, true);
        let id = engine.spawn_seed_nuclide(U239, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        engine.run_until_idle();

        // Decay at 0.2s, neutron lands on Np239 at 0.5s
        let events = engine.drain_events();
        assert_eq!(names(&events)[..2], ["BetaDecay", "FailedCollision"]);
        assert!(matches!(
            events[1].event,
            DomainEvent::FailedCollision { kind: Np239, .. }
        ));
        assert!(engine.nuclide(id).is_some());
    }

    #[test]
    fn test_second_neutron_misses_split_nuclide() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        let first = shoot(&mut engine);
        let second = engine.place_neutron(Vec2::new(0.0, -60.0)).unwrap();
        assert!(engine.fire_neutron_at(second, engine.nuclides()[0].id));

        engine.advance(0.5);
        assert!(engine.neutron(first).is_none());
        assert!(engine.neutron(second).is_none());
        assert_eq!(names(engine.events()), vec!["Explosion"]);
    }

    #[test]
    fn test_placement_inside_capture_radius_rejected() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine
            .spawn_seed_nuclide(U235, Vec2::new(100.0, 100.0))
            .unwrap();
        assert!(engine.place_neutron(Vec2::new(110.0, 110.0)).is_none());
        assert!(engine.neutrons().is_empty());
        assert!(engine.place_neutron(Vec2::new(100.0, 141.0)).is_some());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_non_finite_placement_rejected() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        assert!(engine.place_neutron(Vec2::new(f32::NAN, 0.0)).is_none());
        assert!(engine.place_neutron(Vec2::new(0.0, f32::INFINITY)).is_none());
        assert!(engine.neutrons().is_empty());
    }

    #[test]
    fn test_fire_preconditions() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        let id = engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        let neutron = engine.place_neutron(Vec2::new(0.0, 100.0)).unwrap();

        assert!(!engine.fire_neutron_at(neutron, NuclideId(999)));
        assert!(!engine.fire_neutron_at(NeutronId(999), id));
        assert!(engine.fire_neutron_at(neutron, id));
        // Already moving
        assert!(!engine.fire_neutron_at(neutron, id));
        assert_eq!(engine.pending_timers(), 1);
    }

    #[test]
    fn test_fire_first_available() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        assert!(!engine.fire_first_available_neutron());

        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        assert!(!engine.fire_first_available_neutron());

        let a = engine.place_neutron(Vec2::new(0.0, 100.0)).unwrap();
        let b = engine.place_neutron(Vec2::new(0.0, -100.0)).unwrap();
        assert!(engine.fire_first_available_neutron());
        assert!(!engine.neutron(a).unwrap().is_idle());
        assert!(engine.neutron(b).unwrap().is_idle());
        assert!(engine.fire_first_available_neutron());
        assert!(!engine.fire_first_available_neutron());
    }

    #[test]
    fn test_resolve_against_missing_nuclide_is_silent() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        let neutron = engine.place_neutron(Vec2::new(0.0, 100.0)).unwrap();

        engine.resolve_collision(neutron, NuclideId(999));
        assert!(engine.neutron(neutron).is_none());
        assert!(engine.events().is_empty());

        // Unknown neutron: nothing at all
        engine.resolve_collision(NeutronId(999), engine.nuclides()[0].id);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_tick_decay_directly() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        let id = engine.spawn_seed_nuclide(U239, Vec2::ZERO).unwrap();
        let first_timer = engine.nuclide(id).unwrap().decay_timer().unwrap();

        engine.tick_decay(id);
        let n = engine.nuclide(id).unwrap();
        assert_eq!(n.kind, Np239);
        assert_ne!(n.decay_timer(), Some(first_timer));
        // Old timer cancelled, new one pending
        assert_eq!(engine.pending_timers(), 1);

        // Stable types ignore the request
        engine.tick_decay(id);
        engine.tick_decay(id);
        assert_eq!(engine.nuclide(id).unwrap().kind, Pu239);
        engine.tick_decay(id);
        assert_eq!(engine.nuclide(id).unwrap().kind, Pu239);
        assert_eq!(names(engine.events()), vec!["BetaDecay", "BetaDecay"]);
        engine.tick_decay(NuclideId(999));
    }

    #[test]
    fn test_seed_resets_everything() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        engine.run_until_idle();
        assert_eq!(engine.score().fissions, 1);

        engine.place_neutron(Vec2::new(500.0, 500.0)).unwrap();
        engine.spawn_seed_nuclide(U239, Vec2::ZERO).unwrap();
        assert_eq!(engine.nuclides().len(), 1);
        assert!(engine.neutrons().is_empty());
        assert_eq!(engine.pending_timers(), 1);
        assert_eq!(engine.score().fissions, 0);
        assert_eq!(engine.nuclides()[0].provenance, Provenance::Seed);
    }

    #[test]
    fn test_seed_with_unregistered_type() {
        let table = PropertyTable::new().with(Ba, FissionProperties::inert());
        let mut engine = engine(&table, true);
        assert!(matches!(
            engine.spawn_seed_nuclide(U235, Vec2::ZERO),
            Err(ConfigError::UnknownNuclide(U235))
        ));
        assert!(engine.nuclides().is_empty());
    }

    #[test]
    fn test_invalid_table_rejected_at_construction() {
        let table = PropertyTable::new().with(U238, FissionProperties::absorber(U239));
        assert!(matches!(
            Engine::new(&table, EngineSettings::default(), FixedOutcome(true)),
            Err(ConfigError::UnknownNuclide(U239))
        ));
    }

    #[test]
    fn test_snapshot_reports_decay_countdown() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U239, Vec2::new(5.0, 5.0)).unwrap();
        engine.advance(1.0);

        let snap = engine.snapshot();
        assert_eq!(snap.time_secs, 1.0);
        assert_eq!(snap.pending_timers, 1);
        let view = &snap.nuclides[0];
        assert_eq!(view.decaying_into, Some(Np239));
        assert_eq!(view.remaining_decay_secs, Some(2.0));

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"U239\""));
    }

    #[test]
    fn test_fixed_step_loop_resolves_flight() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        for _ in 0..40 {
            engine.advance(SIM_DT);
        }
        assert_eq!(names(engine.events()), vec!["Explosion"]);
    }

    #[test]
    fn test_bad_dt_leaves_clock_alone() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, false);
        engine.advance(f32::INFINITY);
        engine.advance(f32::NEG_INFINITY);
        engine.advance(f32::NAN);
        engine.advance(-1.0);
        assert_eq!(engine.now(), VirtualTime::ZERO);

        // Timers still respect their delays afterwards
        engine.spawn_seed_nuclide(U238, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        engine.advance(0.4);
        assert!(engine.events().is_empty());
        engine.advance(0.1);
        assert_eq!(engine.now(), VirtualTime::from_millis(500));
        assert_eq!(names(engine.events()), vec!["NeutronAbsorption"]);
        assert_eq!(engine.pending_timers(), 1);
    }

    #[test]
    fn test_events_are_sequenced() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true);
        engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        shoot(&mut engine);
        engine.run_until_idle();
        let events = engine.drain_events();
        assert_eq!(events.len(), 4);
        for pair in events.windows(2) {
            assert!(pair[0].seq < pair[1].seq);
            assert!(pair[0].at <= pair[1].at);
        }
    }

    #[test]
    fn test_injected_ids() {
        let table = PropertyTable::standard();
        let mut engine = engine(&table, true).with_ids(IdAllocator::starting_at(500));
        let id = engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
        assert_eq!(id, NuclideId(500));
        assert_eq!(
            engine.place_neutron(Vec2::new(0.0, 100.0)),
            Some(NeutronId(501))
        );
    }

    #[test]
    fn test_same_seed_same_story() {
        fn run(seed: u64) -> Vec<TimedEvent> {
            let table = PropertyTable::standard();
            let mut engine =
                Engine::new(&table, EngineSettings::default(), RngResolver::seeded(seed))
                    .unwrap();
            engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
            for _ in 0..10 {
                if engine.nuclides().is_empty() {
                    break;
                }
                shoot(&mut engine);
                engine.run_until_idle();
            }
            engine.drain_events()
        }
        assert_eq!(run(42), run(42));
    }

    proptest! {
        #[test]
        fn prop_neutron_consumed_exactly_once(seed in any::<u64>(), p in 0.0f32..=1.0) {
            let table = PropertyTable::standard()
                .with(U235, FissionProperties::fissile(p, 200.0, 3, vec![Ba, Kr]));
            let mut engine =
                Engine::new(&table, EngineSettings::default(), RngResolver::seeded(seed)).unwrap();
            engine.spawn_seed_nuclide(U235, Vec2::ZERO).unwrap();
            let neutron = shoot(&mut engine);
            engine.advance(0.5);
            prop_assert!(engine.neutron(neutron).is_none());
            prop_assert_eq!(engine.events().len(), 1);
        }

        #[test]
        fn prop_certain_fission_yields_table_counts(
            kind in prop::sample::select(vec![U235, Pu239, U233])
        ) {
            let table = PropertyTable::standard();
            let props = table.lookup(kind).clone();
            let mut engine = engine(&table, true);
            engine.spawn_seed_nuclide(kind, Vec2::ZERO).unwrap();
            shoot(&mut engine);
            engine.run_until_idle();
            prop_assert_eq!(engine.events()[0].event.name(), "Explosion");
            prop_assert_eq!(engine.nuclides().len(), props.products.len());
            prop_assert_eq!(engine.neutrons().len(), props.neutrons_released as usize);
            let bursts = engine
                .events()
                .iter()
                .filter(|e| e.event.name() == "EnergyRelease")
                .count();
            prop_assert_eq!(bursts, engine.settings().energy_burst_count as usize);
        }

        #[test]
        fn prop_decay_chains_terminate(kind in prop::sample::select(NuclideType::ALL.to_vec())) {
            let table = PropertyTable::standard();
            let mut engine = engine(&table, true);
            let id = engine.spawn_seed_nuclide(kind, Vec2::ZERO).unwrap();
            engine.run_until_idle();
            let n = engine.nuclide(id).unwrap();
            prop_assert!(!table.lookup(n.kind).is_decaying);
            prop_assert_eq!(engine.pending_timers(), 0);
        }
    }
}

//! Fission Lab demo entry point
//!
//! Drives the engine with a fixed-timestep loop the way a host application
//! would and prints every domain event as a JSON line.
//!
//! Usage: `fission-lab [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .unwrap_or(12345);
    log::info!("Fission Lab (native) starting with seed {seed}");

    if let Err(e) = demo::run(seed) {
        log::error!("demo aborted: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly on the web
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use fission_lab::consts::{MAX_SUBSTEPS, SIM_DT};
    use fission_lab::sim::{Engine, NuclideType, OutcomeResolver, PropertyTable, RngResolver};
    use fission_lab::{EngineSettings, Result};
    use glam::Vec2;

    /// Seconds of lab time each scenario is given to play out
    const SCENARIO_SECS: f32 = 12.0;

    pub fn run(seed: u64) -> Result<()> {
        let table = PropertyTable::standard();
        let mut engine = Engine::new(&table, EngineSettings::default(), RngResolver::seeded(seed))?;

        println!("# U235: fire until it splits, then chase the fragments");
        engine.spawn_seed_nuclide(NuclideType::U235, Vec2::new(100.0, 100.0))?;
        engine.place_neutron(Vec2::new(100.0, 160.0));
        engine.fire_first_available_neutron();
        play(&mut engine, SCENARIO_SECS, true);
        report(&engine);

        println!("# U238: breed plutonium");
        engine.spawn_seed_nuclide(NuclideType::U238, Vec2::new(100.0, 100.0))?;
        engine.place_neutron(Vec2::new(100.0, 160.0));
        engine.fire_first_available_neutron();
        play(&mut engine, SCENARIO_SECS, false);
        report(&engine);

        Ok(())
    }

    /// Fixed-step host loop. With `auto_fire`, keeps shooting idle neutrons
    /// whenever nothing is in flight, like the lab's auto-fire toggle.
    fn play<R: OutcomeResolver>(engine: &mut Engine<'_, R>, secs: f32, auto_fire: bool) {
        let frame = SIM_DT * MAX_SUBSTEPS as f32;
        let mut elapsed = 0.0;
        while elapsed < secs {
            for _ in 0..MAX_SUBSTEPS {
                engine.advance(SIM_DT);
            }
            elapsed += frame;

            for event in engine.drain_events() {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => log::warn!("could not encode event {}: {e}", event.seq),
                }
            }

            if auto_fire && engine.pending_timers() == 0 {
                engine.fire_first_available_neutron();
            }
        }
    }

    fn report<R: OutcomeResolver>(engine: &Engine<'_, R>) {
        let score = engine.score();
        println!(
            "# {} fission(s), {} MeV, {} neutrons released",
            score.fissions, score.total_energy, score.total_neutrons
        );
        match serde_json::to_string(&engine.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => log::warn!("could not encode snapshot: {e}"),
        }
    }
}

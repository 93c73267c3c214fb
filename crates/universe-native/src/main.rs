use std::thread;
use std::time::Duration;

use anyhow::Context;
use instant::Instant;

use universe_core::{
    AudioContext, ForceFieldSpec, PhysicsParametersUpdate, Universe, UniverseConfig,
    UniverseEvent,
};

mod device;

use device::CpalDevice;

const FRAME: Duration = Duration::from_micros(16_667);
const SPAWN_EVERY: Duration = Duration::from_millis(120);
const REPORT_EVERY: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let run_for = match std::env::args().nth(1) {
        Some(arg) => Some(Duration::from_secs_f64(
            arg.parse::<f64>()
                .with_context(|| format!("run length must be a number of seconds, got `{arg}`"))?
                .max(0.0),
        )),
        None => None,
    };

    let device = CpalDevice::open_default()?;
    let ctx = AudioContext::new(device.sample_rate());
    let config = UniverseConfig::default();
    let bounds = config.bounds;
    let mut universe = Universe::new(config, ctx, Box::new(device))?;

    let _log_changes = universe.subscribe(|event| {
        if let UniverseEvent::AudioStateChanged(state) = event {
            log::info!("[universe] audio state → {state:?}");
        }
    });

    let center = (bounds.min + bounds.max) * 0.5;
    universe.add_force_field(ForceFieldSpec::vortex(center.x, center.y, 180.0, 400.0))?;
    universe.add_force_field(ForceFieldSpec::radial(
        bounds.min.x + 120.0,
        bounds.max.y - 100.0,
        150.0,
        -600.0,
    ))?;

    universe.initialize_audio()?;
    universe.start_transport();

    let started = Instant::now();
    let mut last = started;
    let mut since_spawn = Duration::ZERO;
    let mut since_report = Duration::ZERO;
    loop {
        let now = Instant::now();
        let dt = now - last;
        last = now;
        let elapsed = now - started;
        if run_for.is_some_and(|limit| elapsed >= limit) {
            break;
        }

        since_spawn += dt;
        if since_spawn >= SPAWN_EVERY {
            since_spawn = Duration::ZERO;
            universe.spawn_particle(center.x, bounds.min.y + 40.0, None, None);
        }

        // Slow gravity sweep so the mapped pitch and filter keep moving
        let t = elapsed.as_secs_f32();
        universe.update_parameters(PhysicsParametersUpdate {
            gravity: Some(10.0 + 8.0 * (t * 0.2).sin()),
            ..Default::default()
        });

        universe.tick(dt);

        since_report += dt;
        if since_report >= REPORT_EVERY {
            since_report = Duration::ZERO;
            let bands = universe.frequency_bands();
            log::info!(
                "[universe] t={t:.1}s particles={} bass={:.4} mid={:.4} treble={:.4}",
                universe.particle_count(),
                bands.bass,
                bands.mid,
                bands.treble
            );
        }

        thread::sleep(FRAME);
    }

    for failure in universe.dispose() {
        log::warn!("[universe] {failure}");
    }
    Ok(())
}

use bevy::log::LogPlugin;
use bevy::prelude::*;
use fluid3d::{FluidPlugin, ParticleOutput, SolverKind};

const FRAMES: u32 = 200;
const REPORT_EVERY: u32 = 20;

fn plugin_for(kind: SolverKind) -> FluidPlugin {
    match kind {
        SolverKind::Sph => FluidPlugin::sph(20_000, Vec3::new(0.5, 1.0, 0.5)),
        SolverKind::MlsMpm => FluidPlugin::mls_mpm(40_000, Vec3::new(40.0, 30.0, 60.0)),
    }
}

fn main() {
    let kind = match std::env::args().nth(1).as_deref() {
        Some("sph") => SolverKind::Sph,
        _ => SolverKind::MlsMpm,
    };

    let mut app = App::new();
    app.add_plugins((LogPlugin::default(), plugin_for(kind)));

    info!("running {kind} for {FRAMES} frames");
    for frame in 1..=FRAMES {
        app.update();

        if frame % REPORT_EVERY == 0 {
            let output = &app.world().resource::<ParticleOutput>().buffer;
            let records = output.records();
            let count = records.len().max(1) as f32;
            let mean_height = records.iter().map(|r| r.position[1]).sum::<f32>() / count;
            let max_speed = records
                .iter()
                .map(|r| r.velocity().length())
                .fold(0.0, f32::max);
            info!(
                "frame {frame}: {} particles, mean height {mean_height:.4}, max speed {max_speed:.4}",
                records.len()
            );
        }
    }
}

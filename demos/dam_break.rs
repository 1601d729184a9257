// Headless dam break printing per-frame statistics for both solvers.
//
//   cargo run --example dam_break -- [sph|mpm] [frames]
use std::time::Instant;

use bevy::math::Vec3;
use fluid3d::{
    MlsMpmSimulator, MpmParams, PosVelBuffer, SimulationError, Solver, SolverKind, SphParams,
    SphSimulator,
};

struct FrameStats {
    mean_height: f32,
    max_speed: f32,
    min: Vec3,
    max: Vec3,
}

fn frame_stats(output: &PosVelBuffer) -> FrameStats {
    let records = output.records();
    let mut stats = FrameStats {
        mean_height: 0.0,
        max_speed: 0.0,
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };
    for record in records {
        let position = Vec3::from_array(record.position);
        stats.mean_height += position.y;
        stats.max_speed = stats.max_speed.max(record.velocity().length());
        stats.min = stats.min.min(position);
        stats.max = stats.max.max(position);
    }
    stats.mean_height /= records.len().max(1) as f32;
    stats
}

fn build_solver(kind: SolverKind) -> Result<Box<dyn Solver>, SimulationError> {
    let solver: Box<dyn Solver> = match kind {
        SolverKind::Sph => {
            let mut sim = SphSimulator::new(SphParams::default().with_max_particles(10_000))?;
            sim.reset(10_000, Vec3::new(0.5, 1.0, 0.5))?;
            Box::new(sim)
        }
        SolverKind::MlsMpm => {
            let mut sim = MlsMpmSimulator::new(MpmParams::default().with_max_particles(30_000));
            sim.reset(30_000, Vec3::new(40.0, 30.0, 60.0))?;
            Box::new(sim)
        }
    };
    Ok(solver)
}

fn main() -> Result<(), SimulationError> {
    let mut args = std::env::args().skip(1);
    let kind = match args.next().as_deref() {
        Some("sph") => SolverKind::Sph,
        _ => SolverKind::MlsMpm,
    };
    let frames: u32 = args.next().and_then(|f| f.parse().ok()).unwrap_or(100);

    let mut solver = build_solver(kind)?;
    let mut output = PosVelBuffer::with_capacity(solver.num_particles() as usize);
    println!("{kind} dam break, {} particles", solver.num_particles());

    for frame in 0..frames {
        if kind == SolverKind::MlsMpm && frame == frames / 2 {
            let narrow = solver.box_size() * Vec3::new(1.0, 1.0, 0.5);
            solver.change_box_size(narrow);
            println!("[frame {:04}] walls moved to {}", frame, narrow);
        }

        let start = Instant::now();
        solver.compute(&mut output);
        let elapsed = start.elapsed().as_secs_f64() * 1000.0;

        let stats = frame_stats(&output);
        println!(
            "[frame {:04}] {:.2}ms | mean height {:.4} | max speed {:.4} | bounds {} .. {}",
            frame, elapsed, stats.mean_height, stats.max_speed, stats.min, stats.max
        );
    }

    Ok(())
}

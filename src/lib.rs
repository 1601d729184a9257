use bevy::prelude::*;

pub mod compute;
pub mod config;
pub mod core;
pub mod error;
pub mod grid;
pub mod math;
pub mod solver;

// Public re-exports for clean API
pub use config::{MpmParams, SphParams};
pub use crate::core::{PosVel, PosVelBuffer};
pub use error::{ScanError, SimulationError};
pub use solver::{MlsMpmSimulator, Solver, SolverKind, SphSimulator};

/// The active solver.
#[derive(Resource)]
pub struct FluidSimulation {
    solver: Box<dyn Solver>,
}

impl FluidSimulation {
    pub fn new(solver: impl Solver + 'static) -> Self {
        Self {
            solver: Box::new(solver),
        }
    }

    pub fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }

    pub fn solver_mut(&mut self) -> &mut dyn Solver {
        self.solver.as_mut()
    }
}

/// Renderer-visible positions and velocities, rewritten every frame.
#[derive(Resource)]
pub struct ParticleOutput {
    pub buffer: PosVelBuffer,
}

/// Particle count and box used by the startup reset.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct InitialScene {
    pub num_particles: u32,
    pub box_size: Vec3,
}

/// Pending wall move, applied before the next compute.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxSizeRequest(pub Option<Vec3>);

/// Runs one solver: resets it on `Startup`, then computes a frame every
/// `Update`. Solver parameters are taken from an [`SphParams`] or
/// [`MpmParams`] resource inserted before the plugin, or their defaults.
pub struct FluidPlugin {
    pub solver: SolverKind,
    pub scene: InitialScene,
}

impl FluidPlugin {
    /// SPH dam break in a box of the given half extents.
    pub fn sph(num_particles: u32, half_extents: Vec3) -> Self {
        Self {
            solver: SolverKind::Sph,
            scene: InitialScene {
                num_particles,
                box_size: half_extents,
            },
        }
    }

    /// MLS-MPM dam break in a box of the given size in grid cells.
    pub fn mls_mpm(num_particles: u32, box_size: Vec3) -> Self {
        Self {
            solver: SolverKind::MlsMpm,
            scene: InitialScene {
                num_particles,
                box_size,
            },
        }
    }
}

impl Plugin for FluidPlugin {
    fn build(&self, app: &mut App) {
        let (simulation, capacity) = match self.solver {
            SolverKind::Sph => {
                let params = app.world().get_resource::<SphParams>().cloned().unwrap_or_default();
                let capacity = params.max_particles;
                match SphSimulator::new(params) {
                    Ok(sim) => (FluidSimulation::new(sim), capacity),
                    Err(err) => {
                        error!("cannot create SPH solver: {err}");
                        return;
                    }
                }
            }
            SolverKind::MlsMpm => {
                let params = app.world().get_resource::<MpmParams>().cloned().unwrap_or_default();
                let capacity = params.max_particles;
                (FluidSimulation::new(MlsMpmSimulator::new(params)), capacity)
            }
        };

        app.insert_resource(simulation)
            .insert_resource(ParticleOutput {
                buffer: PosVelBuffer::with_capacity(capacity as usize),
            })
            .insert_resource(self.scene)
            .init_resource::<BoxSizeRequest>()
            .add_systems(Startup, reset_simulation)
            .add_systems(Update, (apply_box_size, compute_simulation).chain());
    }
}

fn reset_simulation(scene: Res<InitialScene>, mut simulation: ResMut<FluidSimulation>) {
    // Failures are logged by the solver and leave it empty.
    let _ = simulation
        .solver_mut()
        .reset(scene.num_particles, scene.box_size);
}

fn apply_box_size(mut request: ResMut<BoxSizeRequest>, mut simulation: ResMut<FluidSimulation>) {
    if let Some(size) = request.0.take() {
        simulation.solver_mut().change_box_size(size);
    }
}

fn compute_simulation(mut simulation: ResMut<FluidSimulation>, mut output: ResMut<ParticleOutput>) {
    simulation.solver_mut().compute(&mut output.buffer);
}

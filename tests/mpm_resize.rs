use bevy::math::Vec3;
use fluid3d::compute::ComputeBackend;
use fluid3d::grid::MpmGrid;
use fluid3d::solver::mpm::{PARTICLE_MASS, particle_to_grid_mass_momentum};
use fluid3d::{MlsMpmSimulator, MpmParams, PosVelBuffer, Solver};

const BOX: Vec3 = Vec3::new(40.0, 30.0, 60.0);

fn simulator(max_particles: u32) -> MlsMpmSimulator {
    MlsMpmSimulator::new(MpmParams::default().with_max_particles(max_particles))
}

#[test]
fn narrowing_z_reflects_particles_within_one_substep() {
    let mut sim = simulator(10_000);
    let mut output = PosVelBuffer::with_capacity(10_000);
    sim.reset(10_000, BOX).unwrap();
    assert_eq!(sim.num_particles(), 10_000);

    for _ in 0..5 {
        sim.compute(&mut output);
    }

    let real = Vec3::new(BOX.x, BOX.y, 20.0);
    sim.change_box_size(real);
    assert_eq!(sim.real_box_size(), real);

    let far_outside: Vec<usize> = sim
        .particles()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.position.z > real.z)
        .map(|(i, _)| i)
        .collect();
    assert!(!far_outside.is_empty());

    sim.step();

    let upper = real.z - 2.0;
    for p in sim.particles() {
        assert!(p.position.z <= upper + 1e-4);
        assert!(p.position.is_finite());
    }
    for &i in &far_outside {
        assert!(sim.particles()[i].velocity.z < 0.0);
    }
}

#[test]
fn p2g_conserves_particle_mass() {
    let mut sim = simulator(8000);
    let mut output = PosVelBuffer::with_capacity(8000);
    sim.reset(8000, BOX).unwrap();
    for _ in 0..3 {
        sim.compute(&mut output);
    }

    let fixed = sim.fixed_point();
    let mut grid = MpmGrid::with_capacity(sim.grid().capacity() as u32);
    grid.configure(sim.grid().dims());
    particle_to_grid_mass_momentum(&ComputeBackend::default(), fixed, sim.particles(), &grid);

    let expected = sim.num_particles() as f32 * PARTICLE_MASS;
    let bound = 27.0 * sim.num_particles() as f32 * fixed.resolution();
    assert!((grid.total_mass(fixed) - expected).abs() <= bound + 1e-2);
}

#[test]
fn refused_reset_keeps_running_state() {
    let mut sim = simulator(5000);
    let mut output = PosVelBuffer::with_capacity(5000);
    sim.reset(5000, BOX).unwrap();
    sim.compute(&mut output);
    let before = output.records().to_vec();

    assert!(sim.reset(5000, Vec3::new(65.0, 64.0, 64.0)).is_err());
    assert!(sim.reset(6000, BOX).is_err());
    assert_eq!(sim.num_particles(), 5000);
    assert_eq!(sim.box_size(), BOX);
    assert_eq!(output.records(), &before[..]);
}

/// Simple custom benchmarking without criterion
use std::time::Instant;

use bevy::math::Vec3;
use fluid3d::compute::{ComputeBackend, PrefixSum, ScanAddressing, ScanConfig, storage_buffer_from};
use fluid3d::{MlsMpmSimulator, MpmParams, PosVelBuffer, Solver, SphParams, SphSimulator};

fn time_it<F: FnMut()>(name: &str, iterations: usize, mut f: F) {
    // Warmup
    for _ in 0..3 {
        f();
    }

    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    let elapsed = start.elapsed();

    let avg_ms = elapsed.as_secs_f64() * 1000.0 / iterations as f64;
    println!("{}: {:.3}ms avg ({} iterations)", name, avg_ms, iterations);
}

fn main() {
    println!("\n=== fluid3d Benchmarks ===\n");

    println!("--- Prefix Sum ---");
    let backend = ComputeBackend::default();
    for &len in &[10_000usize, 100_000, 1_000_000] {
        for addressing in [ScanAddressing::Naive, ScanAddressing::AvoidBankConflicts] {
            let config = ScanConfig::default().with_addressing(addressing);
            let mut scan = PrefixSum::new(&backend, len, config).unwrap();
            let values: Vec<u32> = (0..len as u32).map(|i| i % 7).collect();
            let mut data = storage_buffer_from(&values);

            time_it(&format!("scan {:?} (n={})", addressing, len), 20, || {
                scan.dispatch(&backend, &mut data).unwrap();
            });
        }
    }

    println!("\n--- SPH Frame ---");
    for &count in &[5_000u32, 20_000] {
        let mut sim = SphSimulator::new(SphParams::default().with_max_particles(count)).unwrap();
        let mut output = PosVelBuffer::with_capacity(count as usize);
        sim.reset(count, Vec3::new(0.5, 1.0, 0.5)).unwrap();

        time_it(&format!("sph compute (n={})", count), 10, || {
            sim.compute(&mut output);
        });
    }

    println!("\n--- MLS-MPM Frame ---");
    for &count in &[10_000u32, 50_000] {
        let mut sim = MlsMpmSimulator::new(MpmParams::default().with_max_particles(count));
        let mut output = PosVelBuffer::with_capacity(count as usize);
        sim.reset(count, Vec3::new(40.0, 30.0, 60.0)).unwrap();

        time_it(&format!("mls-mpm compute (n={})", count), 10, || {
            sim.compute(&mut output);
        });
    }

    println!("\n=== Benchmark Complete ===\n");
}

use fluid3d::compute::{
    BackendLimits, ComputeBackend, ExecutionMode, PrefixSum, ScanAddressing, ScanConfig,
    exclusive_scan_cpu, read_buffer, storage_buffer_from,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn check(backend: &ComputeBackend, config: ScanConfig, values: &[u32]) {
    let mut expected = values.to_vec();
    let expected_total = exclusive_scan_cpu(&mut expected);

    let mut scan = PrefixSum::new(backend, values.len(), config).unwrap();
    let mut data = storage_buffer_from(values);
    scan.dispatch(backend, &mut data).unwrap();

    assert_eq!(read_buffer(&data), expected, "len {}", values.len());
    assert_eq!(scan.total(), expected_total);
}

#[test]
fn random_lengths_match_sequential_scan() {
    let mut rng = StdRng::seed_from_u64(0xc0ffee);
    let backend = ComputeBackend::default();
    for _ in 0..20 {
        let len = rng.random_range(1..5000);
        let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..64)).collect();
        check(&backend, ScanConfig::default(), &values);
    }
}

#[test]
fn three_level_scan() {
    let mut rng = StdRng::seed_from_u64(3);
    let backend = ComputeBackend::default();
    // One more element than two levels of 512-item workgroups can hold.
    let len = 512 * 512 + 1;
    let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..4)).collect();

    let scan = PrefixSum::new(&backend, len, ScanConfig::default()).unwrap();
    assert_eq!(scan.levels(), 3);
    check(&backend, ScanConfig::default(), &values);
}

#[test]
fn two_dimensional_dispatch_is_transparent() {
    let limits = BackendLimits {
        max_workgroups_per_dimension: 4,
    };
    let backend = ComputeBackend::new(limits, ExecutionMode::Parallel);
    let config = ScanConfig::default()
        .with_workgroup_size(4, 2)
        .with_addressing(ScanAddressing::AvoidBankConflicts);
    // 16 items per workgroup, 10 workgroups on the first level.
    let values: Vec<u32> = (0..160).map(|i| i % 3).collect();
    check(&backend, config, &values);
}

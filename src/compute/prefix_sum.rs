//! Work-efficient exclusive scan over `u32` storage buffers.
//!
//! Each workgroup scans `2 * threads` consecutive elements in shared memory
//! with an up-sweep/down-sweep tree and writes its pre-scan total to a block
//! sums buffer. When more than one workgroup was needed, the block sums are
//! scanned by the same routine and then added back onto every element of the
//! owning workgroup. The dispatch sequence is fixed when the scan is created.

use std::sync::atomic::{AtomicU32, Ordering};

use super::{ComputeBackend, DispatchSize, storage_buffer};
use crate::config::SCAN_WORKGROUP_SIZE;
use crate::error::ScanError;

/// Shared-memory layout used by the scan tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanAddressing {
    #[default]
    Naive,
    /// Pads one slot every 32 elements so that tree levels stride across
    /// memory banks.
    AvoidBankConflicts,
}

impl ScanAddressing {
    #[inline(always)]
    fn slot(self, index: usize) -> usize {
        match self {
            ScanAddressing::Naive => index,
            ScanAddressing::AvoidBankConflicts => index + (index >> 5),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    pub workgroup_size: (u32, u32),
    pub addressing: ScanAddressing,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workgroup_size: SCAN_WORKGROUP_SIZE,
            addressing: ScanAddressing::Naive,
        }
    }
}

impl ScanConfig {
    pub fn with_workgroup_size(mut self, x: u32, y: u32) -> Self {
        self.workgroup_size = (x, y);
        self
    }

    pub fn with_addressing(mut self, addressing: ScanAddressing) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn threads_per_workgroup(&self) -> u32 {
        self.workgroup_size.0 * self.workgroup_size.1
    }

    pub fn items_per_workgroup(&self) -> usize {
        2 * self.threads_per_workgroup() as usize
    }
}

#[derive(Debug)]
struct ScanLevel {
    dispatch: DispatchSize,
    block_sums: Vec<AtomicU32>,
}

/// A scan prepared for a buffer of fixed length.
#[derive(Debug)]
pub struct PrefixSum {
    config: ScanConfig,
    len: usize,
    levels: Vec<ScanLevel>,
}

impl PrefixSum {
    pub fn new(backend: &ComputeBackend, len: usize, config: ScanConfig) -> Result<Self, ScanError> {
        let threads = config.threads_per_workgroup();
        if !threads.is_power_of_two() {
            return Err(ScanError::WorkgroupNotPowerOfTwo(threads));
        }

        let mut scan = Self {
            config,
            len: 0,
            levels: Vec::new(),
        };
        scan.reset(backend, len);
        Ok(scan)
    }

    /// Rebuilds the block sum chain for buffers of `len` elements.
    pub fn reset(&mut self, backend: &ComputeBackend, len: usize) {
        let items = self.config.items_per_workgroup();
        self.len = len;
        self.levels.clear();

        let mut level_len = len;
        while level_len > 0 {
            let workgroups = level_len.div_ceil(items);
            self.levels.push(ScanLevel {
                dispatch: backend.optimal_dispatch_size(workgroups as u32),
                block_sums: storage_buffer(workgroups),
            });
            if workgroups == 1 {
                break;
            }
            level_len = workgroups;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn config(&self) -> ScanConfig {
        self.config
    }

    /// Number of scan levels, one per recursion depth.
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Replaces every element with the sum of the elements before it.
    pub fn dispatch(&mut self, backend: &ComputeBackend, data: &mut [AtomicU32]) -> Result<(), ScanError> {
        if data.len() != self.len {
            return Err(ScanError::LengthMismatch {
                expected: self.len,
                actual: data.len(),
            });
        }
        scan_level(backend, self.config, data, &mut self.levels);
        Ok(())
    }

    /// Sum of all input elements of the last [`PrefixSum::dispatch`].
    pub fn total(&self) -> u32 {
        self.levels
            .last()
            .map_or(0, |top| top.block_sums[0].load(Ordering::Relaxed))
    }
}

fn scan_level(backend: &ComputeBackend, config: ScanConfig, data: &mut [AtomicU32], levels: &mut [ScanLevel]) {
    let Some((level, rest)) = levels.split_first_mut() else {
        return;
    };

    let items = config.items_per_workgroup();
    backend.dispatch_workgroups_mut(
        "prefix_sum.reduce_downsweep",
        level.dispatch,
        data,
        items,
        &mut level.block_sums,
        |_, chunk, block_sum| reduce_downsweep(config, chunk, block_sum),
    );

    if rest.is_empty() {
        return;
    }

    scan_level(backend, config, &mut level.block_sums, rest);

    backend.dispatch_workgroups_mut(
        "prefix_sum.add_block_sums",
        level.dispatch,
        data,
        items,
        &mut level.block_sums,
        |_, chunk, block_sum| {
            let offset = *block_sum.get_mut();
            for value in chunk {
                *value.get_mut() += offset;
            }
        },
    );
}

/// One workgroup of the scan tree. Every loop over `thread` is one barrier
/// phase; within a phase threads touch disjoint slots.
fn reduce_downsweep(config: ScanConfig, chunk: &mut [AtomicU32], block_sum: &mut AtomicU32) {
    let threads = config.threads_per_workgroup() as usize;
    let items = 2 * threads;
    let at = |i: usize| config.addressing.slot(i);

    let mut temp = vec![0u32; at(items - 1) + 1];
    for thread in 0..threads {
        let (ai, bi) = (thread, thread + threads);
        temp[at(ai)] = chunk.get_mut(ai).map_or(0, |v| *v.get_mut());
        temp[at(bi)] = chunk.get_mut(bi).map_or(0, |v| *v.get_mut());
    }

    let mut offset = 1;
    let mut active = threads;
    while active > 0 {
        for thread in 0..active {
            let ai = offset * (2 * thread + 1) - 1;
            let bi = offset * (2 * thread + 2) - 1;
            temp[at(bi)] += temp[at(ai)];
        }
        offset *= 2;
        active >>= 1;
    }

    let last = at(items - 1);
    *block_sum.get_mut() = temp[last];
    temp[last] = 0;

    let mut active = 1;
    while active < items {
        offset >>= 1;
        for thread in 0..active {
            let ai = offset * (2 * thread + 1) - 1;
            let bi = offset * (2 * thread + 2) - 1;
            let left = temp[at(ai)];
            temp[at(ai)] = temp[at(bi)];
            temp[at(bi)] += left;
        }
        active *= 2;
    }

    for (index, value) in chunk.iter_mut().enumerate() {
        *value.get_mut() = temp[at(index)];
    }
}

/// Sequential in-place exclusive scan. Returns the sum of all inputs.
pub fn exclusive_scan_cpu(values: &mut [u32]) -> u32 {
    let mut running = 0u32;
    for value in values {
        let count = *value;
        *value = running;
        running += count;
    }
    running
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::compute::{read_buffer, storage_buffer_from};

    fn reference(values: &[u32]) -> (Vec<u32>, u32) {
        let mut scanned = values.to_vec();
        let total = exclusive_scan_cpu(&mut scanned);
        (scanned, total)
    }

    fn run(backend: &ComputeBackend, config: ScanConfig, values: &[u32]) -> (Vec<u32>, u32) {
        let mut scan = PrefixSum::new(backend, values.len(), config).unwrap();
        let mut data = storage_buffer_from(values);
        scan.dispatch(backend, &mut data).unwrap();
        (read_buffer(&data), scan.total())
    }

    #[test]
    fn single_workgroup_matches_reference() {
        let backend = ComputeBackend::default();
        let values: Vec<u32> = (0..512).map(|i| (i * 7 + 3) % 11).collect();
        assert_eq!(run(&backend, ScanConfig::default(), &values), reference(&values));
    }

    #[test]
    fn partial_last_workgroup() {
        let backend = ComputeBackend::default();
        for len in [1, 2, 3, 511, 513, 1000, 1025] {
            let values = vec![1u32; len];
            let (scanned, total) = run(&backend, ScanConfig::default(), &values);
            assert_eq!(total, len as u32);
            assert!(scanned.iter().enumerate().all(|(i, &v)| v == i as u32));
        }
    }

    #[test]
    fn deep_recursion_with_small_workgroups() {
        let mut rng = StdRng::seed_from_u64(7);
        let backend = ComputeBackend::default();
        let config = ScanConfig::default().with_workgroup_size(2, 2);
        for len in [8, 9, 64, 65, 4097] {
            let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..100)).collect();
            let scan = PrefixSum::new(&backend, len, config).unwrap();
            assert_eq!(scan.levels(), levels_for(len, 8));
            assert_eq!(run(&backend, config, &values), reference(&values));
        }
    }

    fn levels_for(mut len: usize, items: usize) -> usize {
        let mut levels = 1;
        while len > items {
            len = len.div_ceil(items);
            levels += 1;
        }
        levels
    }

    #[test]
    fn conflict_free_addressing_agrees() {
        let mut rng = StdRng::seed_from_u64(11);
        let backend = ComputeBackend::sequential();
        let values: Vec<u32> = (0..3000).map(|_| rng.random_range(0..16)).collect();
        let plain = run(&backend, ScanConfig::default(), &values);
        let padded = run(
            &backend,
            ScanConfig::default().with_addressing(ScanAddressing::AvoidBankConflicts),
            &values,
        );
        assert_eq!(plain, padded);
        assert_eq!(plain, reference(&values));
    }

    #[test]
    fn reset_rebuilds_levels_for_new_length() {
        let backend = ComputeBackend::default();
        let mut scan = PrefixSum::new(&backend, 100, ScanConfig::default()).unwrap();
        assert_eq!(scan.levels(), 1);

        scan.reset(&backend, 600);
        assert_eq!(scan.len(), 600);
        assert_eq!(scan.levels(), 2);

        let values: Vec<u32> = (0..600).map(|i| i % 5).collect();
        let mut data = storage_buffer_from(&values);
        scan.dispatch(&backend, &mut data).unwrap();
        assert_eq!((read_buffer(&data), scan.total()), reference(&values));
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let backend = ComputeBackend::default();
        let mut scan = PrefixSum::new(&backend, 0, ScanConfig::default()).unwrap();
        assert!(scan.is_empty());
        assert_eq!(scan.levels(), 0);
        scan.dispatch(&backend, &mut []).unwrap();
        assert_eq!(scan.total(), 0);
        assert_eq!(backend.dispatch_count(), 0);
    }

    #[test]
    fn rejects_bad_configuration() {
        let backend = ComputeBackend::default();
        let config = ScanConfig::default().with_workgroup_size(3, 4);
        assert_eq!(
            PrefixSum::new(&backend, 10, config).unwrap_err(),
            ScanError::WorkgroupNotPowerOfTwo(12)
        );

        let mut scan = PrefixSum::new(&backend, 10, ScanConfig::default()).unwrap();
        let mut short = storage_buffer_from(&[1; 9]);
        assert_eq!(
            scan.dispatch(&backend, &mut short),
            Err(ScanError::LengthMismatch { expected: 10, actual: 9 })
        );
    }
}

//! In-process data-parallel compute backend.
//!
//! Kernels are dispatched over fixed-size workgroups. Workgroups of one
//! dispatch run concurrently and in no particular order; returning from a
//! dispatch makes all of its writes visible to the next one. Buffers that more
//! than one invocation writes to are atomic slices, and the only
//! read-modify-write allowed on them is an integer `fetch_add`.
//!
//! # Modules
//!
//! - [`prefix_sum`]: multi-level work-efficient exclusive scan

/// Multi-level work-efficient exclusive scan.
pub mod prefix_sum;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bevy::log::trace;
use rayon::prelude::*;

use crate::config::MAX_WORKGROUPS_PER_DIMENSION;

pub use prefix_sum::{PrefixSum, ScanAddressing, ScanConfig, exclusive_scan_cpu};

/// How the workgroups of a dispatch are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Workgroups run concurrently on the rayon pool.
    #[default]
    Parallel,
    /// Workgroups and invocations run one after another in index order.
    Sequential,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendLimits {
    pub max_workgroups_per_dimension: u32,
}

impl Default for BackendLimits {
    fn default() -> Self {
        Self {
            max_workgroups_per_dimension: MAX_WORKGROUPS_PER_DIMENSION,
        }
    }
}

/// Workgroup grid of a dispatch. Linear workgroup id is `x + y * self.x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
}

impl DispatchSize {
    pub fn linear(x: u32) -> Self {
        Self { x, y: 1 }
    }

    pub fn workgroups(&self) -> u64 {
        self.x as u64 * self.y as u64
    }
}

#[derive(Debug, Default)]
pub struct ComputeBackend {
    limits: BackendLimits,
    mode: ExecutionMode,
    dispatches: AtomicU64,
}

impl ComputeBackend {
    pub fn new(limits: BackendLimits, mode: ExecutionMode) -> Self {
        Self {
            limits,
            mode,
            dispatches: AtomicU64::new(0),
        }
    }

    pub fn sequential() -> Self {
        Self::new(BackendLimits::default(), ExecutionMode::Sequential)
    }

    pub fn limits(&self) -> BackendLimits {
        self.limits
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Number of dispatches issued since creation.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Splits `workgroup_count` over two dimensions when it does not fit in
    /// one, keeping the grid close to square.
    pub fn optimal_dispatch_size(&self, workgroup_count: u32) -> DispatchSize {
        if workgroup_count <= self.limits.max_workgroups_per_dimension {
            return DispatchSize::linear(workgroup_count);
        }

        let x = (workgroup_count as f64).sqrt().floor() as u32;
        let y = workgroup_count.div_ceil(x);
        DispatchSize { x, y }
    }

    fn record(&self, label: &str, workgroups: u64) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        trace!("dispatch {label}: {workgroups} workgroups");
    }

    /// Runs `kernel` once per global invocation id in `0..invocations`.
    pub fn dispatch<F>(&self, label: &str, invocations: u32, workgroup_size: u32, kernel: F)
    where
        F: Fn(u32) + Send + Sync,
    {
        let workgroups = invocations.div_ceil(workgroup_size);
        self.record(label, workgroups as u64);

        match self.mode {
            ExecutionMode::Parallel => (0..workgroups).into_par_iter().for_each(|wg| {
                let first = wg * workgroup_size;
                let last = (first + workgroup_size).min(invocations);
                (first..last).for_each(&kernel);
            }),
            ExecutionMode::Sequential => (0..invocations).for_each(kernel),
        }
    }

    /// Runs `kernel` once per element of `data`, handing each invocation
    /// exclusive access to the element at its global id.
    pub fn dispatch_mut<T, F>(&self, label: &str, data: &mut [T], workgroup_size: u32, kernel: F)
    where
        T: Send,
        F: Fn(u32, &mut T) + Send + Sync,
    {
        let size = workgroup_size as usize;
        self.record(label, data.len().div_ceil(size) as u64);

        let run = |(wg, chunk): (usize, &mut [T])| {
            let first = (wg * size) as u32;
            for (local, item) in chunk.iter_mut().enumerate() {
                kernel(first + local as u32, item);
            }
        };

        match self.mode {
            ExecutionMode::Parallel => data.par_chunks_mut(size).enumerate().for_each(run),
            ExecutionMode::Sequential => data.chunks_mut(size).enumerate().for_each(run),
        }
    }

    /// Runs `kernel` once per workgroup of `dispatch`. Workgroup `w` owns
    /// `data[w * items_per_workgroup..][..items_per_workgroup]` and `side[w]`.
    /// Workgroups past the end of `data` have nothing to do and are skipped.
    pub fn dispatch_workgroups_mut<T, S, F>(
        &self,
        label: &str,
        dispatch: DispatchSize,
        data: &mut [T],
        items_per_workgroup: usize,
        side: &mut [S],
        kernel: F,
    ) where
        T: Send,
        S: Send,
        F: Fn(u32, &mut [T], &mut S) + Send + Sync,
    {
        debug_assert!(dispatch.x <= self.limits.max_workgroups_per_dimension);
        debug_assert!(dispatch.y <= self.limits.max_workgroups_per_dimension);
        debug_assert!(dispatch.workgroups() >= data.len().div_ceil(items_per_workgroup) as u64);
        self.record(label, dispatch.workgroups());

        let run = |(wg, (chunk, side)): (usize, (&mut [T], &mut S))| kernel(wg as u32, chunk, side);

        match self.mode {
            ExecutionMode::Parallel => data
                .par_chunks_mut(items_per_workgroup)
                .zip(side.par_iter_mut())
                .enumerate()
                .for_each(run),
            ExecutionMode::Sequential => data
                .chunks_mut(items_per_workgroup)
                .zip(side.iter_mut())
                .enumerate()
                .for_each(run),
        }
    }
}

/// Allocates a zeroed `u32` storage buffer.
pub fn storage_buffer(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

/// Allocates a `u32` storage buffer holding `values`.
pub fn storage_buffer_from(values: &[u32]) -> Vec<AtomicU32> {
    values.iter().map(|&v| AtomicU32::new(v)).collect()
}

/// Copies a storage buffer back into plain values.
pub fn read_buffer(buffer: &[AtomicU32]) -> Vec<u32> {
    buffer.iter().map(|v| v.load(Ordering::Relaxed)).collect()
}

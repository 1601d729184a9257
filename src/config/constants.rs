// Constants shared by both solvers and the compute backend

/// Threads per workgroup for the per-particle and per-cell kernels.
pub const WORKGROUP_SIZE: u32 = 64;

/// Scan workgroup shape (16×16 threads, two items per thread).
pub const SCAN_WORKGROUP_SIZE: (u32, u32) = (16, 16);

/// WebGPU default for `maxComputeWorkgroupsPerDimension`.
pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65_535;

/// Substeps run by one `compute` call.
pub const SUBSTEPS_PER_FRAME: u32 = 2;

/// Scale between real grid quantities and their `i32` accumulators.
pub const FIXED_POINT_MULTIPLIER: f32 = 1e7;

/// Capacity of the renderer-visible output buffer.
pub const DEFAULT_MAX_PARTICLES: u32 = 200_000;

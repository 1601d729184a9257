//! Particle records and the renderer-facing output buffer.
//!
//! Both solver particle layouts are 16-byte aligned so that a record can be
//! handed to a GPU-style storage buffer without repacking.

use bytemuck::{Pod, Zeroable};

use crate::math::{Matrix, Real, Vector, zero_matrix, zero_vector};

/// SPH particle, 64 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphParticle {
    pub position: Vector,
    pub velocity: Vector,
    /// Force density accumulated by the force stage.
    pub force: Vector,
    pub density: Real,
    pub near_density: Real,
    pub _padding: [Real; 2],
}

impl SphParticle {
    pub fn at_rest(position: Vector) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

impl Default for SphParticle {
    fn default() -> Self {
        Self {
            position: zero_vector(),
            velocity: zero_vector(),
            force: zero_vector(),
            density: 0.0,
            near_density: 0.0,
            _padding: [0.0; 2],
        }
    }
}

/// MLS-MPM particle, 80 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MpmParticle {
    pub position: Vector,
    pub velocity: Vector,
    pub c: Matrix, // APIC affine velocity field
}

impl MpmParticle {
    pub fn at_rest(position: Vector) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

impl Default for MpmParticle {
    fn default() -> Self {
        Self {
            position: zero_vector(),
            velocity: zero_vector(),
            c: zero_matrix(),
        }
    }
}

/// One renderer record: position and velocity, each padded to 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PosVel {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub velocity: [f32; 3],
    pub _pad1: f32,
}

impl PosVel {
    #[inline]
    pub fn new(position: Vector, velocity: Vector) -> Self {
        Self {
            position: position.to_array(),
            _pad0: 0.0,
            velocity: velocity.to_array(),
            _pad1: 0.0,
        }
    }

    #[inline]
    pub fn position(&self) -> Vector {
        Vector::from_array(self.position)
    }

    #[inline]
    pub fn velocity(&self) -> Vector {
        Vector::from_array(self.velocity)
    }
}

/// Position/velocity buffer read by the renderer.
///
/// The buffer always holds `capacity` records; only the first `len` are live
/// after a compute.
#[derive(Clone, Debug)]
pub struct PosVelBuffer {
    records: Vec<PosVel>,
    len: usize,
}

impl PosVelBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: vec![PosVel::default(); capacity],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live records.
    pub fn records(&self) -> &[PosVel] {
        &self.records[..self.len]
    }

    /// Sets the live length and returns the live records for writing.
    pub(crate) fn live_mut(&mut self, len: usize) -> &mut [PosVel] {
        self.len = len.min(self.records.len());
        &mut self.records[..self.len]
    }

    /// The whole buffer, live or not, as raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}

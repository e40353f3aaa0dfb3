//! Binary label volumes returned by the segmentation engine.

use serde::{Deserialize, Serialize};

/// Error type for volume operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VolumeError {
    /// Two volumes with different dimensions were combined.
    #[error("Volume shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        /// Dimensions of the accumulated volume.
        left: [usize; 3],
        /// Dimensions of the incoming volume.
        right: [usize; 3],
    },

    /// Voxel buffer length does not match the dimensions.
    #[error("Voxel buffer has {actual} entries, expected {expected}")]
    BufferLength {
        /// `dims[0] * dims[1] * dims[2]`.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
}

/// Dense binary voxel grid, one byte per voxel (0 = background).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVolume {
    dims: [usize; 3],
    voxels: Vec<u8>,
}

impl LabelVolume {
    /// All-background volume.
    pub fn zeros(dims: [usize; 3]) -> Self {
        Self {
            dims,
            voxels: vec![0; dims[0] * dims[1] * dims[2]],
        }
    }

    /// Wrap an existing voxel buffer.
    pub fn from_voxels(dims: [usize; 3], voxels: Vec<u8>) -> Result<Self, VolumeError> {
        let expected = dims[0] * dims[1] * dims[2];
        if voxels.len() != expected {
            return Err(VolumeError::BufferLength {
                expected,
                actual: voxels.len(),
            });
        }
        Ok(Self { dims, voxels })
    }

    /// Grid dimensions.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Raw voxels in x-fastest order.
    pub fn voxels(&self) -> &[u8] {
        &self.voxels
    }

    fn offset(&self, ijk: [usize; 3]) -> Option<usize> {
        if ijk[0] >= self.dims[0] || ijk[1] >= self.dims[1] || ijk[2] >= self.dims[2] {
            return None;
        }
        Some(ijk[0] + self.dims[0] * (ijk[1] + self.dims[1] * ijk[2]))
    }

    /// Voxel value, `None` out of bounds.
    pub fn get(&self, ijk: [usize; 3]) -> Option<u8> {
        self.offset(ijk).map(|o| self.voxels[o])
    }

    /// Set a voxel. Returns false out of bounds.
    pub fn set(&mut self, ijk: [usize; 3], value: u8) -> bool {
        match self.offset(ijk) {
            Some(o) => {
                self.voxels[o] = value;
                true
            }
            None => false,
        }
    }

    /// Number of foreground voxels.
    pub fn count_foreground(&self) -> usize {
        self.voxels.iter().filter(|v| **v != 0).count()
    }

    /// Voxel-wise logical OR with `other`, in place.
    ///
    /// Foreground voxels are normalized to 1.
    pub fn merge_or(&mut self, other: &LabelVolume) -> Result<(), VolumeError> {
        if self.dims != other.dims {
            return Err(VolumeError::ShapeMismatch {
                left: self.dims,
                right: other.dims,
            });
        }
        for (a, b) in self.voxels.iter_mut().zip(other.voxels.iter()) {
            *a = u8::from(*a != 0 || *b != 0);
        }
        Ok(())
    }
}

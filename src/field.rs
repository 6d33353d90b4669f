use std::ops::Mul;

use nalgebra::{Point3, Vector3};
use num_traits::Zero;

use crate::convert::{cast_i64, saturating_cast_f64_to_i64};
use crate::grid::{ContinuousIndex, GridError, GridGeometry, OutOfBounds, VoxelIndex};
use crate::tensor::SymmetricTensor;

/// Deformation field: per-voxel displacement vectors in world units.
pub type VectorField = Field<Vector3<f64>>;

/// Tensor volume: one symmetric diffusion tensor per voxel.
pub type TensorField = Field<SymmetricTensor>;

/// Integer label map produced by voxelization.
pub type LabelVolume = Field<i32>;

/// A regular 3D grid of values placed in world space by its geometry.
///
/// Values are stored x-fastest, see `GridGeometry::voxel_to_linear`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    geometry: GridGeometry,
    values: Vec<T>,
}

impl<T: Copy> Field<T> {
    pub fn new(geometry: GridGeometry, values: Vec<T>) -> Result<Self, GridError> {
        let expected = geometry.voxel_count();
        if values.len() != expected {
            return Err(GridError::ValueCountMismatch {
                expected,
                actual: values.len(),
            });
        }

        Ok(Field { geometry, values })
    }

    /// Creates a field with every voxel set to `value`.
    pub fn filled(geometry: GridGeometry, value: T) -> Self {
        let values = vec![value; geometry.voxel_count()];
        Field { geometry, values }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn value_at_voxel(&self, voxel: &VoxelIndex) -> Option<T> {
        self.geometry
            .voxel_to_linear(voxel)
            .map(|index| self.values[index])
    }

    pub fn set_value_at_voxel(&mut self, voxel: &VoxelIndex, value: T) -> Result<(), OutOfBounds> {
        let index = self.geometry.voxel_to_linear(voxel).ok_or(OutOfBounds)?;
        self.values[index] = value;

        Ok(())
    }

    /// Replaces every value with the result of `f`, which receives the voxel
    /// coordinate and the current value.
    pub fn map_voxels<F>(&mut self, mut f: F)
    where
        F: FnMut(&VoxelIndex, T) -> T,
    {
        for (linear, value) in self.values.iter_mut().enumerate() {
            if let Some(voxel) = self.geometry.linear_to_voxel(linear) {
                *value = f(&voxel, *value);
            }
        }
    }
}

impl<T> Field<T>
where
    T: Copy + Zero + Mul<f64, Output = T>,
{
    /// Trilinearly blends the 8 lattice values enclosing `index`.
    ///
    /// Each value is weighted by the product of its per-axis overlaps with the
    /// index. Neighbors past the last voxel are clamped to it, they only occur
    /// with zero weight on the upper faces of the grid.
    pub fn sample_at_continuous_index(&self, index: &ContinuousIndex) -> Result<T, OutOfBounds> {
        if !self.geometry.is_inside(index) {
            return Err(OutOfBounds);
        }

        let size = self.geometry.size();
        let base = index.map(|coordinate| saturating_cast_f64_to_i64(coordinate.floor()));
        let fraction = Vector3::new(
            index.x - base.x as f64,
            index.y - base.y as f64,
            index.z - base.z as f64,
        );

        let mut value = T::zero();
        for corner in 0..8 {
            let mut neighbor = base;
            let mut weight = 1.0;
            for axis in 0..3 {
                if corner & (1 << axis) == 0 {
                    weight *= 1.0 - fraction[axis];
                } else {
                    neighbor[axis] = (neighbor[axis] + 1).min(cast_i64(size[axis]) - 1);
                    weight *= fraction[axis];
                }
            }

            if weight == 0.0 {
                continue;
            }
            let corner_value = self.value_at_voxel(&neighbor).ok_or(OutOfBounds)?;
            value = value + corner_value * weight;
        }

        Ok(value)
    }

    /// Samples the field at a world point.
    pub fn sample_at_physical_point(&self, point: &Point3<f64>) -> Result<T, OutOfBounds> {
        let index = self.geometry.physical_to_inside_continuous_index(point)?;
        self.sample_at_continuous_index(&index)
    }
}

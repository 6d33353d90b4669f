use nalgebra::Point3;

use crate::field::{Field, LabelVolume};
use crate::grid::{GridGeometry, VoxelIndex};
use crate::report::{Diagnostic, RunReport};

/// What happens to a voxel hit by a fiber point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Set the voxel to a fixed label.
    Overwrite { label: i32 },
    /// Increment the voxel once per hit.
    CountFibers,
}

/// Rasterizes world points into an integer label volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Voxelizer {
    volume: LabelVolume,
    policy: CollisionPolicy,
}

impl Voxelizer {
    /// Creates a voxelizer over a zero filled label volume placed like
    /// `geometry`.
    pub fn new(geometry: &GridGeometry, policy: CollisionPolicy) -> Self {
        Voxelizer {
            volume: Field::filled(geometry.clone(), 0),
            policy,
        }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn volume(&self) -> &LabelVolume {
        &self.volume
    }

    pub fn into_volume(self) -> LabelVolume {
        self.volume
    }

    /// Marks the voxel nearest to `world`, ties broken towards even indices.
    ///
    /// Returns the marked voxel. Points snapping outside of the volume are
    /// skipped and recorded.
    pub fn rasterize(&mut self, world: &Point3<f64>, report: &mut RunReport) -> Option<VoxelIndex> {
        let geometry = self.volume.geometry();
        let voxel = geometry.nearest_voxel(&geometry.physical_to_continuous_index(world));

        let current = match self.volume.value_at_voxel(&voxel) {
            Some(current) => current,
            None => {
                report.record(Diagnostic::VoxelOutOfBounds { index: voxel });
                return None;
            }
        };

        let value = match self.policy {
            CollisionPolicy::Overwrite { label } => label,
            CollisionPolicy::CountFibers => current.saturating_add(1),
        };
        self.volume.set_value_at_voxel(&voxel, value).ok()?;

        Some(voxel)
    }
}

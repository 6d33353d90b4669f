use std::fmt;

use nalgebra::Point3;

use crate::grid::VoxelIndex;

/// Recoverable condition met while traversing the fibers. None of these stop
/// the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The point lies outside of the deformation field, its original position
    /// is used.
    DeformationOutOfBounds { world: Point3<f64> },
    /// The point lies outside of the tensor volume, its original data is kept.
    TensorOutOfBounds { world: Point3<f64> },
    /// The point snaps to a voxel outside of the label volume and is not
    /// rasterized.
    VoxelOutOfBounds { index: VoxelIndex },
    UnsupportedObject { kind: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::DeformationOutOfBounds { world } => write!(
                f,
                "Fiber point [{}, {}, {}] is outside of the deformation field, original position will be used",
                world.x, world.y, world.z
            ),
            Diagnostic::TensorOutOfBounds { world } => write!(
                f,
                "Fiber point [{}, {}, {}] is outside of the tensor volume, original point data will be kept",
                world.x, world.y, world.z
            ),
            Diagnostic::VoxelOutOfBounds { index } => write!(
                f,
                "Voxel index [{}, {}, {}] is not in the label volume, ignoring",
                index.x, index.y, index.z
            ),
            Diagnostic::UnsupportedObject { kind } => {
                write!(f, "Skipping unsupported spatial object of kind '{}'", kind)
            }
        }
    }
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub fibers: usize,
    pub points: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new() -> Self {
        Default::default()
    }

    /// Logs the diagnostic as a warning and keeps it for later inspection.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Diagnostic) -> bool,
    {
        self.diagnostics.iter().filter(|d| predicate(d)).count()
    }
}

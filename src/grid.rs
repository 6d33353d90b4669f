use std::convert::TryFrom;
use std::error;
use std::fmt;

use nalgebra::{Matrix3, Point3, Vector3};

use crate::convert::{cast_i64, cast_usize, round_half_to_even, saturating_cast_f64_to_i64};

/// Fractional coordinate into a regular grid.
pub type ContinuousIndex = Point3<f64>;

/// Discrete voxel coordinate. May lie outside of the grid, negative
/// coordinates included.
pub type VoxelIndex = Point3<i64>;

/// Marker returned when a grid is addressed outside of its extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds;

impl error::Error for OutOfBounds {}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Position is outside of the grid.")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    NonFiniteGeometry,
    NonPositiveSpacing(Vector3<f64>),
    SingularDirection,
    EmptyExtent([usize; 3]),
    ExtentTooLarge([usize; 3]),
    ValueCountMismatch { expected: usize, actual: usize },
}

impl error::Error for GridError {}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GridError::NonFiniteGeometry => write!(
                f,
                "Grid origin, spacing and direction must only contain finite numbers."
            ),
            GridError::NonPositiveSpacing(spacing) => write!(
                f,
                "Grid spacing must be strictly positive, got [{}, {}, {}].",
                spacing.x, spacing.y, spacing.z
            ),
            GridError::SingularDirection => write!(f, "Grid direction matrix is not invertible."),
            GridError::EmptyExtent(size) => write!(
                f,
                "Grid extent must be non-zero on each axis, got {:?}.",
                size
            ),
            GridError::ExtentTooLarge(size) => {
                write!(f, "Grid extent {:?} has too many voxels.", size)
            }
            GridError::ValueCountMismatch { expected, actual } => write!(
                f,
                "Grid expects {} values, got {}.",
                expected, actual
            ),
        }
    }
}

/// Placement of a regularly sampled volume in world space.
///
/// A continuous index `i` maps to the world point
/// `origin + direction * diag(spacing) * i`. The inverse mapping is computed
/// once at construction, so both directions are a single matrix product.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    origin: Point3<f64>,
    spacing: Vector3<f64>,
    direction: Matrix3<f64>,
    size: [usize; 3],
    voxel_count: usize,
    index_to_physical: Matrix3<f64>,
    physical_to_index: Matrix3<f64>,
}

impl GridGeometry {
    pub fn new(
        origin: Point3<f64>,
        spacing: Vector3<f64>,
        direction: Matrix3<f64>,
        size: [usize; 3],
    ) -> Result<Self, GridError> {
        let finite = origin
            .iter()
            .chain(spacing.iter())
            .chain(direction.iter())
            .all(|component| component.is_finite());
        if !finite {
            return Err(GridError::NonFiniteGeometry);
        }
        if !spacing.iter().all(|s| *s > 0.0) {
            return Err(GridError::NonPositiveSpacing(spacing));
        }
        if size.iter().any(|s| *s == 0) {
            return Err(GridError::EmptyExtent(size));
        }

        // Voxel coordinates are signed, every extent has to fit.
        if size.iter().any(|s| i64::try_from(*s).is_err()) {
            return Err(GridError::ExtentTooLarge(size));
        }
        let voxel_count = size
            .iter()
            .try_fold(1usize, |count, s| count.checked_mul(*s))
            .ok_or(GridError::ExtentTooLarge(size))?;

        let index_to_physical = direction * Matrix3::from_diagonal(&spacing);
        let physical_to_index = index_to_physical
            .try_inverse()
            .ok_or(GridError::SingularDirection)?;

        Ok(GridGeometry {
            origin,
            spacing,
            direction,
            size,
            voxel_count,
            index_to_physical,
            physical_to_index,
        })
    }

    /// Axis aligned geometry with identity direction cosines.
    pub fn axis_aligned(
        origin: Point3<f64>,
        spacing: Vector3<f64>,
        size: [usize; 3],
    ) -> Result<Self, GridError> {
        GridGeometry::new(origin, spacing, Matrix3::identity(), size)
    }

    pub fn origin(&self) -> &Point3<f64> {
        &self.origin
    }

    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    pub fn direction(&self) -> &Matrix3<f64> {
        &self.direction
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Number of voxels in the grid.
    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    pub fn physical_to_continuous_index(&self, point: &Point3<f64>) -> ContinuousIndex {
        Point3::from(self.physical_to_index * (point - self.origin))
    }

    pub fn continuous_index_to_physical(&self, index: &ContinuousIndex) -> Point3<f64> {
        self.origin + self.index_to_physical * index.coords
    }

    /// Checks that every coordinate lies within `[0, size - 1]` on its axis.
    pub fn is_inside(&self, index: &ContinuousIndex) -> bool {
        index
            .iter()
            .zip(self.size.iter())
            .all(|(coordinate, size)| *coordinate >= 0.0 && *coordinate <= (*size - 1) as f64)
    }

    /// Maps a world point to a continuous index that is known to be inside
    /// the grid.
    pub fn physical_to_inside_continuous_index(
        &self,
        point: &Point3<f64>,
    ) -> Result<ContinuousIndex, OutOfBounds> {
        let index = self.physical_to_continuous_index(point);
        if self.is_inside(&index) {
            Ok(index)
        } else {
            Err(OutOfBounds)
        }
    }

    /// Snaps a continuous index to the nearest voxel, breaking ties towards
    /// even coordinates. The result is not bounds checked.
    pub fn nearest_voxel(&self, index: &ContinuousIndex) -> VoxelIndex {
        index.map(|coordinate| saturating_cast_f64_to_i64(round_half_to_even(coordinate)))
    }

    pub fn is_voxel_inside(&self, voxel: &VoxelIndex) -> bool {
        voxel
            .iter()
            .zip(self.size.iter())
            .all(|(coordinate, size)| *coordinate >= 0 && *coordinate < cast_i64(*size))
    }

    /// Computes an index to the linear, x-fastest representation of the voxel
    /// block.
    ///
    /// Returns None if out of bounds.
    pub fn voxel_to_linear(&self, voxel: &VoxelIndex) -> Option<usize> {
        if self.is_voxel_inside(voxel) {
            let x = cast_usize(voxel.x);
            let y = cast_usize(voxel.y);
            let z = cast_usize(voxel.z);
            Some(z * self.size[0] * self.size[1] + y * self.size[0] + x)
        } else {
            None
        }
    }

    /// Computes a voxel coordinate from an index to the linear representation
    /// of the voxel block.
    ///
    /// Returns None if out of bounds.
    pub fn linear_to_voxel(&self, linear: usize) -> Option<VoxelIndex> {
        if linear < self.voxel_count() {
            let horizontal_area = self.size[0] * self.size[1];
            let z = linear / horizontal_area;
            let y = (linear % horizontal_area) / self.size[0];
            let x = linear % self.size[0];
            Some(Point3::new(cast_i64(x), cast_i64(y), cast_i64(z)))
        } else {
            None
        }
    }

    pub fn voxel_to_physical(&self, voxel: &VoxelIndex) -> Point3<f64> {
        self.continuous_index_to_physical(&voxel.map(|coordinate| coordinate as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oblique_geometry() -> GridGeometry {
        // Axes permuted and the first one flipped.
        let direction = Matrix3::new(0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        GridGeometry::new(
            Point3::new(10.0, -4.0, 2.5),
            Vector3::new(0.5, 2.0, 1.25),
            direction,
            [4, 5, 6],
        )
        .unwrap()
    }

    #[test]
    fn test_grid_geometry_rejects_non_positive_spacing() {
        let result = GridGeometry::axis_aligned(
            Point3::origin(),
            Vector3::new(1.0, 0.0, 1.0),
            [2, 2, 2],
        );

        assert_eq!(
            result,
            Err(GridError::NonPositiveSpacing(Vector3::new(1.0, 0.0, 1.0)))
        );
    }

    #[test]
    fn test_grid_geometry_rejects_singular_direction() {
        let result = GridGeometry::new(
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
            Matrix3::zeros(),
            [2, 2, 2],
        );

        assert_eq!(result, Err(GridError::SingularDirection));
    }

    #[test]
    fn test_grid_geometry_rejects_empty_extent() {
        let result = GridGeometry::axis_aligned(
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
            [2, 0, 2],
        );

        assert_eq!(result, Err(GridError::EmptyExtent([2, 0, 2])));
    }

    #[test]
    fn test_grid_geometry_rejects_overflowing_voxel_count() {
        let size = [1 << 32, 1 << 32, 1];

        let result = GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), size);

        assert_eq!(result, Err(GridError::ExtentTooLarge(size)));
    }

    #[test]
    fn test_grid_geometry_rejects_extent_beyond_signed_voxel_range() {
        let size = [usize::MAX, 1, 1];

        let result = GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), size);

        assert_eq!(result, Err(GridError::ExtentTooLarge(size)));
    }

    #[test]
    fn test_grid_geometry_rejects_non_finite_origin() {
        let result = GridGeometry::axis_aligned(
            Point3::new(f64::NAN, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            [2, 2, 2],
        );

        assert_eq!(result, Err(GridError::NonFiniteGeometry));
    }

    #[test]
    fn test_grid_geometry_rejects_infinite_spacing() {
        let result = GridGeometry::axis_aligned(
            Point3::origin(),
            Vector3::new(1.0, f64::INFINITY, 1.0),
            [2, 2, 2],
        );

        assert_eq!(result, Err(GridError::NonFiniteGeometry));
    }

    #[test]
    fn test_grid_geometry_rejects_non_finite_direction() {
        let mut direction = Matrix3::identity();
        direction[(1, 2)] = f64::NAN;

        let result = GridGeometry::new(
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
            direction,
            [2, 2, 2],
        );

        assert_eq!(result, Err(GridError::NonFiniteGeometry));
    }

    #[test]
    fn test_grid_geometry_axis_aligned_physical_to_continuous_index() {
        let geometry = GridGeometry::axis_aligned(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(2.0, 0.5, 4.0),
            [10, 10, 10],
        )
        .unwrap();

        let index = geometry.physical_to_continuous_index(&Point3::new(4.0, 3.0, 11.0));

        approx::assert_relative_eq!(index, Point3::new(1.5, 2.0, 2.0));
    }

    #[test]
    fn test_grid_geometry_oblique_physical_and_back() {
        let geometry = oblique_geometry();
        let index = Point3::new(1.25, 3.5, 0.75);

        let physical = geometry.continuous_index_to_physical(&index);
        let back = geometry.physical_to_continuous_index(&physical);

        approx::assert_relative_eq!(back, index, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_geometry_oblique_direction_applies_to_spacing_scaled_index() {
        let geometry = oblique_geometry();

        let physical = geometry.continuous_index_to_physical(&Point3::new(1.0, 1.0, 1.0));

        // x <- -z * 1.25, y <- x * 0.5, z <- y * 2.0
        approx::assert_relative_eq!(physical, Point3::new(8.75, -3.5, 4.5));
    }

    #[test]
    fn test_grid_geometry_is_inside_includes_both_ends() {
        let geometry =
            GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), [3, 4, 5])
                .unwrap();

        assert!(geometry.is_inside(&Point3::new(0.0, 0.0, 0.0)));
        assert!(geometry.is_inside(&Point3::new(2.0, 3.0, 4.0)));
        assert!(!geometry.is_inside(&Point3::new(2.0001, 3.0, 4.0)));
        assert!(!geometry.is_inside(&Point3::new(0.0, -0.0001, 0.0)));
    }

    #[test]
    fn test_grid_geometry_physical_to_inside_continuous_index_out_of_bounds() {
        let geometry =
            GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), [3, 3, 3])
                .unwrap();

        assert_eq!(
            geometry.physical_to_inside_continuous_index(&Point3::new(5.0, 1.0, 1.0)),
            Err(OutOfBounds)
        );
        assert_eq!(
            geometry.physical_to_inside_continuous_index(&Point3::new(1.0, 1.0, 1.0)),
            Ok(Point3::new(1.0, 1.0, 1.0))
        );
    }

    #[test]
    fn test_grid_geometry_nearest_voxel_rounds_half_to_even() {
        let geometry =
            GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), [8, 1, 1])
                .unwrap();

        assert_eq!(
            geometry.nearest_voxel(&Point3::new(2.5, 0.0, 0.0)),
            Point3::new(2, 0, 0)
        );
        assert_eq!(
            geometry.nearest_voxel(&Point3::new(3.5, 0.0, 0.0)),
            Point3::new(4, 0, 0)
        );
        assert_eq!(
            geometry.nearest_voxel(&Point3::new(-0.6, 0.4, 0.5)),
            Point3::new(-1, 0, 0)
        );
    }

    #[test]
    fn test_grid_geometry_linear_to_voxel_and_back() {
        let geometry =
            GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.5, 2.5, 3.5), [3, 4, 5])
                .unwrap();

        for linear in 0..geometry.voxel_count() {
            let voxel = geometry.linear_to_voxel(linear).unwrap();
            assert_eq!(geometry.voxel_to_linear(&voxel), Some(linear));
        }
        assert_eq!(geometry.linear_to_voxel(geometry.voxel_count()), None);
    }

    #[test]
    fn test_grid_geometry_voxel_to_linear_is_x_fastest() {
        let geometry =
            GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), [3, 4, 5])
                .unwrap();

        assert_eq!(geometry.voxel_to_linear(&Point3::new(1, 0, 0)), Some(1));
        assert_eq!(geometry.voxel_to_linear(&Point3::new(0, 1, 0)), Some(3));
        assert_eq!(geometry.voxel_to_linear(&Point3::new(0, 0, 1)), Some(12));
        assert_eq!(geometry.voxel_to_linear(&Point3::new(-1, 0, 0)), None);
        assert_eq!(geometry.voxel_to_linear(&Point3::new(0, 4, 0)), None);
    }
}

use std::error;
use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader};
use std::path::Path;

use nalgebra::{Matrix3, Point3, Vector3};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fiber::FiberBundle;
use crate::field::{Field, LabelVolume, TensorField, VectorField};
use crate::grid::{GridError, GridGeometry};
use crate::tensor::SymmetricTensor;

#[derive(Debug, Clone, PartialEq)]
pub enum IoError {
    SerializingError(String),
    DeserializingError(String),
    InvalidGrid(GridError),
    FileNotFound,
    PermissionDenied,
    UnexpectedError(String),
}

impl error::Error for IoError {}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IoError::SerializingError(err) => {
                write!(f, "An error occurred while serializing file: {}", err)
            }
            IoError::DeserializingError(err) => {
                write!(f, "An error occurred while deserializing file: {}", err)
            }
            IoError::InvalidGrid(err) => write!(f, "File contains an invalid grid: {}", err),
            IoError::FileNotFound => write!(f, "File was not found."),
            IoError::PermissionDenied => write!(f, "Permission denied while accessing the file."),
            IoError::UnexpectedError(err) => write!(f, "An unexpected error occurred: {}", err),
        }
    }
}

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => IoError::FileNotFound,
            io::ErrorKind::PermissionDenied => IoError::PermissionDenied,
            _ => IoError::UnexpectedError(err.to_string()),
        }
    }
}

impl From<GridError> for IoError {
    fn from(err: GridError) -> Self {
        IoError::InvalidGrid(err)
    }
}

/// How the vectors of a deformation field file are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeformationKind {
    /// Vectors are displacements in world units.
    Displacement,
    /// Vectors are the absolute world positions each voxel maps to.
    HField,
}

/// File collaborators of the pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait Io {
    fn read_fiber_bundle(&self, path: &Path) -> Result<FiberBundle, IoError>;

    /// Reads a deformation field, always yielding displacements.
    fn read_deformation_field(
        &self,
        path: &Path,
        kind: DeformationKind,
    ) -> Result<VectorField, IoError>;

    fn read_tensor_volume(&self, path: &Path) -> Result<TensorField, IoError>;

    fn write_fiber_bundle(&self, path: &Path, bundle: &FiberBundle) -> Result<(), IoError>;

    fn write_label_volume(&self, path: &Path, volume: &LabelVolume) -> Result<(), IoError>;
}

/// Serialized grid placement. Direction cosines are stored row by row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeometryRecord {
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub direction: [[f64; 3]; 3],
    pub size: [usize; 3],
}

impl GeometryRecord {
    pub fn from_geometry(geometry: &GridGeometry) -> Self {
        let origin = geometry.origin();
        let spacing = geometry.spacing();
        let direction = geometry.direction();
        let mut rows = [[0.0; 3]; 3];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = direction[(r, c)];
            }
        }

        GeometryRecord {
            origin: [origin.x, origin.y, origin.z],
            spacing: [spacing.x, spacing.y, spacing.z],
            direction: rows,
            size: geometry.size(),
        }
    }

    pub fn to_geometry(&self) -> Result<GridGeometry, GridError> {
        let d = &self.direction;
        GridGeometry::new(
            Point3::new(self.origin[0], self.origin[1], self.origin[2]),
            Vector3::new(self.spacing[0], self.spacing[1], self.spacing[2]),
            Matrix3::new(
                d[0][0], d[0][1], d[0][2], d[1][0], d[1][1], d[1][2], d[2][0], d[2][1], d[2][2],
            ),
            self.size,
        )
    }
}

/// On-disk volume: a placement and its x-fastest values.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeFile<T> {
    pub geometry: GeometryRecord,
    pub values: Vec<T>,
}

impl<T: Copy> VolumeFile<T> {
    pub fn from_field(field: &Field<T>) -> Self {
        VolumeFile {
            geometry: GeometryRecord::from_geometry(field.geometry()),
            values: field.values().to_vec(),
        }
    }

    pub fn into_field(self) -> Result<Field<T>, GridError> {
        let geometry = self.geometry.to_geometry()?;
        Field::new(geometry, self.values)
    }
}

/// Converts an H-field, which stores the world position each voxel maps to,
/// into a displacement field.
pub fn h_field_to_displacement(mut field: VectorField) -> VectorField {
    let geometry = field.geometry().clone();
    field.map_voxels(|voxel, position| position - geometry.voxel_to_physical(voxel).coords);

    field
}

/// RON backed implementation of the file collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct RonFiles;

impl Io for RonFiles {
    fn read_fiber_bundle(&self, path: &Path) -> Result<FiberBundle, IoError> {
        open(path)
    }

    fn read_deformation_field(
        &self,
        path: &Path,
        kind: DeformationKind,
    ) -> Result<VectorField, IoError> {
        let file: VolumeFile<[f64; 3]> = open(path)?;
        let geometry = file.geometry.to_geometry()?;
        let values = file
            .values
            .into_iter()
            .map(|v| Vector3::new(v[0], v[1], v[2]))
            .collect();
        let field = Field::new(geometry, values)?;

        match kind {
            DeformationKind::Displacement => Ok(field),
            DeformationKind::HField => Ok(h_field_to_displacement(field)),
        }
    }

    fn read_tensor_volume(&self, path: &Path) -> Result<TensorField, IoError> {
        let file: VolumeFile<SymmetricTensor> = open(path)?;

        Ok(file.into_field()?)
    }

    fn write_fiber_bundle(&self, path: &Path, bundle: &FiberBundle) -> Result<(), IoError> {
        save(path, bundle)
    }

    fn write_label_volume(&self, path: &Path, volume: &LabelVolume) -> Result<(), IoError> {
        save(path, &VolumeFile::from_field(volume))
    }
}

/// Writes a vector field as displacements.
pub fn write_vector_field(path: &Path, field: &VectorField) -> Result<(), IoError> {
    let file = VolumeFile {
        geometry: GeometryRecord::from_geometry(field.geometry()),
        values: field
            .values()
            .iter()
            .map(|v| [v.x, v.y, v.z])
            .collect::<Vec<_>>(),
    };

    save(path, &file)
}

pub fn write_tensor_volume(path: &Path, field: &TensorField) -> Result<(), IoError> {
    save(path, &VolumeFile::from_field(field))
}

pub fn read_label_volume(path: &Path) -> Result<LabelVolume, IoError> {
    let file: VolumeFile<i32> = open(path)?;

    Ok(file.into_field()?)
}

pub fn save<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let pretty_config = ron::ser::PrettyConfig::default();
    let contents = ron::ser::to_string_pretty(value, pretty_config)
        .map_err(|err| IoError::SerializingError(err.to_string()))?;
    let mut file = File::create(path)?;

    file.write_all(contents.as_bytes())?;

    Ok(())
}

pub fn open<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let file = File::open(path)?;
    let buf_reader = BufReader::new(file);

    ron::de::from_reader(buf_reader).map_err(|err| IoError::DeserializingError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_record_keeps_direction_rows() {
        let direction = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let geometry = GridGeometry::new(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.5, 1.0, 2.0),
            direction,
            [2, 3, 4],
        )
        .unwrap();

        let record = GeometryRecord::from_geometry(&geometry);

        assert_eq!(
            record.direction,
            [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert_eq!(record.to_geometry(), Ok(geometry));
    }

    #[test]
    fn test_volume_file_with_wrong_value_count_is_rejected() {
        let file = VolumeFile {
            geometry: GeometryRecord {
                origin: [0.0; 3],
                spacing: [1.0; 3],
                direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                size: [2, 2, 1],
            },
            values: vec![0i32; 3],
        };

        assert_eq!(
            file.into_field(),
            Err(GridError::ValueCountMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_h_field_of_identity_map_is_zero_displacement() {
        let geometry = GridGeometry::axis_aligned(
            Point3::new(-1.0, 0.0, 2.0),
            Vector3::new(2.0, 1.0, 0.5),
            [3, 2, 2],
        )
        .unwrap();
        let mut field: VectorField = Field::filled(geometry.clone(), Vector3::zeros());
        field.map_voxels(|voxel, _| geometry.voxel_to_physical(voxel).coords);

        let displacement = h_field_to_displacement(field);

        assert!(displacement.values().iter().all(|v| *v == Vector3::zeros()));
    }

    #[test]
    fn test_h_field_shifted_map_is_constant_displacement() {
        let geometry =
            GridGeometry::axis_aligned(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), [2, 2, 2])
                .unwrap();
        let shift = Vector3::new(0.5, -1.0, 3.0);
        let mut field: VectorField = Field::filled(geometry.clone(), Vector3::zeros());
        field.map_voxels(|voxel, _| geometry.voxel_to_physical(voxel).coords + shift);

        let displacement = h_field_to_displacement(field);

        assert!(displacement.values().iter().all(|v| *v == shift));
    }

    #[test]
    fn test_read_tensor_volume_with_overflowing_extent_is_invalid_grid() {
        let path = std::env::temp_dir().join(format!(
            "fiberprocess-huge-extent-{}.volume.ron",
            std::process::id()
        ));
        let size = [1 << 32, 1 << 32, 1];
        let file: VolumeFile<SymmetricTensor> = VolumeFile {
            geometry: GeometryRecord {
                origin: [0.0; 3],
                spacing: [1.0; 3],
                direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                size,
            },
            values: vec![],
        };
        save(&path, &file).unwrap();

        let result = RonFiles.read_tensor_volume(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(
            result,
            Err(IoError::InvalidGrid(GridError::ExtentTooLarge(size)))
        );
    }

    #[test]
    fn test_volume_file_with_non_finite_spacing_is_rejected() {
        let file = VolumeFile {
            geometry: GeometryRecord {
                origin: [0.0; 3],
                spacing: [1.0, f64::INFINITY, 1.0],
                direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                size: [1, 1, 1],
            },
            values: vec![0i32],
        };

        assert_eq!(file.into_field(), Err(GridError::NonFiniteGeometry));
    }

    #[test]
    fn test_open_missing_file_is_file_not_found() {
        let result: Result<FiberBundle, IoError> =
            open("this/path/does/not/exist.fibers.ron");

        assert_eq!(result, Err(IoError::FileNotFound));
    }
}

use std::error;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::fiber::FiberBundle;
use crate::field::{LabelVolume, TensorField, VectorField};
use crate::io::{DeformationKind, Io, IoError};
use crate::report::RunReport;
use crate::voxelize::{CollisionPolicy, Voxelizer};
use crate::warp::{FiberWarper, WarpOptions};

pub const DEFAULT_VOXEL_LABEL: i32 = 1;
pub const DEFAULT_TENSOR_POINT_RADIUS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingFiberInput,
    VoxelizeWithoutTensorVolume,
    InvalidTensorPointRadius(f64),
}

impl error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingFiberInput => write!(f, "A fiber file has to be specified."),
            ConfigError::VoxelizeWithoutTensorVolume => write!(
                f,
                "A tensor volume has to be specified to copy the label volume geometry for fiber voxelization."
            ),
            ConfigError::InvalidTensorPointRadius(radius) => write!(
                f,
                "Tensor point radius must not be negative, got {}.",
                radius
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Config(ConfigError),
    Io { path: PathBuf, err: IoError },
}

impl error::Error for PipelineError {}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Config(err) => write!(f, "Invalid configuration: {}", err),
            PipelineError::Io { path, err } => write!(f, "{}: {}", path.display(), err),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

/// Everything a run is allowed to do. Optional paths left as `None` disable
/// the corresponding input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fiber_input: Option<PathBuf>,
    pub fiber_output: Option<PathBuf>,
    /// Deformation field storing absolute positions. Takes precedence over
    /// `displacement_field`.
    pub h_field: Option<PathBuf>,
    pub displacement_field: Option<PathBuf>,
    pub tensor_volume: Option<PathBuf>,
    pub no_warp: bool,
    /// Keep the original point data even if a tensor volume is given.
    pub no_data_change: bool,
    pub voxelize: Option<PathBuf>,
    pub voxelize_count_fibers: bool,
    pub voxel_label: i32,
    pub tensor_point_radius: f64,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fiber_input: None,
            fiber_output: None,
            h_field: None,
            displacement_field: None,
            tensor_volume: None,
            no_warp: false,
            no_data_change: false,
            voxelize: None,
            voxelize_count_fibers: false,
            voxel_label: DEFAULT_VOXEL_LABEL,
            tensor_point_radius: DEFAULT_TENSOR_POINT_RADIUS,
            verbose: false,
        }
    }
}

impl Config {
    /// Checks the preconditions of the requested modes. Returns the fiber
    /// input path.
    pub fn validate(&self) -> Result<&Path, ConfigError> {
        let fiber_input = self
            .fiber_input
            .as_deref()
            .ok_or(ConfigError::MissingFiberInput)?;
        if self.voxelize.is_some() && self.tensor_volume.is_none() {
            return Err(ConfigError::VoxelizeWithoutTensorVolume);
        }
        if !(self.tensor_point_radius >= 0.0) {
            return Err(ConfigError::InvalidTensorPointRadius(
                self.tensor_point_radius,
            ));
        }

        Ok(fiber_input)
    }

    /// The deformation field to read, if any.
    pub fn deformation_source(&self) -> Option<(&Path, DeformationKind)> {
        match (&self.h_field, &self.displacement_field) {
            (Some(path), _) => Some((path.as_path(), DeformationKind::HField)),
            (None, Some(path)) => Some((path.as_path(), DeformationKind::Displacement)),
            (None, None) => None,
        }
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        if self.voxelize_count_fibers {
            CollisionPolicy::CountFibers
        } else {
            CollisionPolicy::Overwrite {
                label: self.voxel_label,
            }
        }
    }

    fn warp_options(&self) -> WarpOptions {
        WarpOptions {
            no_warp: self.no_warp,
            attach_tensor_data: self.fiber_output.is_some() && !self.no_data_change,
            tensor_point_radius: self.tensor_point_radius,
        }
    }
}

/// Loaded inputs of a run.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub bundle: FiberBundle,
    pub deformation: Option<VectorField>,
    pub tensors: Option<TensorField>,
}

#[derive(Debug, Clone)]
pub struct Outputs {
    pub bundle: FiberBundle,
    pub labels: Option<LabelVolume>,
    pub report: RunReport,
}

/// Runs the fiber traversal on loaded inputs.
///
/// Each point is warped once and the same warped world point is both
/// rasterized and used to build the output point.
pub fn process(config: &Config, inputs: &Inputs) -> Result<Outputs, ConfigError> {
    let mut voxelizer = match config.voxelize {
        Some(_) => {
            let tensors = inputs
                .tensors
                .as_ref()
                .ok_or(ConfigError::VoxelizeWithoutTensorVolume)?;
            Some(Voxelizer::new(
                tensors.geometry(),
                config.collision_policy(),
            ))
        }
        None => None,
    };

    let warper = FiberWarper::new(
        inputs.deformation.as_ref(),
        inputs.tensors.as_ref(),
        config.warp_options(),
    );
    log::debug!(
        "Input bundle spacing: {:?}, offset: {:?}",
        inputs.bundle.spacing(),
        inputs.bundle.offset()
    );
    if !warper.warps_geometry() {
        log::debug!("Fiber geometry will not be warped");
    }

    let mut report = RunReport::new();
    log::debug!("Starting fiber loop");
    let bundle = warper.warp_bundle(&inputs.bundle, &mut report, |world, report| {
        if let Some(voxelizer) = voxelizer.as_mut() {
            if let Some(voxel) = voxelizer.rasterize(world, report) {
                log::trace!("Fiber point {:?} marks voxel {:?}", world, voxel);
            }
        }
    });
    log::debug!(
        "Ending fiber loop, processed {} fibers with {} points",
        report.fibers,
        report.points
    );

    Ok(Outputs {
        bundle,
        labels: voxelizer.map(Voxelizer::into_volume),
        report,
    })
}

/// Validates the configuration, reads the inputs, processes them and writes
/// the requested outputs.
///
/// Nothing is read or written if the configuration is invalid.
pub fn run<I: Io>(config: &Config, io: &I) -> Result<RunReport, PipelineError> {
    let fiber_input = config.validate()?;

    log::info!("Reading fiber bundle {}", fiber_input.display());
    let bundle = io
        .read_fiber_bundle(fiber_input)
        .map_err(|err| io_error(fiber_input, err))?;

    let deformation = match config.deformation_source() {
        Some((path, kind)) => {
            log::info!("Reading deformation field {} as {:?}", path.display(), kind);
            Some(
                io.read_deformation_field(path, kind)
                    .map_err(|err| io_error(path, err))?,
            )
        }
        None => None,
    };

    let tensors = match config.tensor_volume.as_deref() {
        Some(path) => {
            log::info!("Reading tensor volume {}", path.display());
            Some(
                io.read_tensor_volume(path)
                    .map_err(|err| io_error(path, err))?,
            )
        }
        None => None,
    };

    let inputs = Inputs {
        bundle,
        deformation,
        tensors,
    };
    let outputs = process(config, &inputs)?;

    if let Some(path) = config.fiber_output.as_deref() {
        log::info!("Writing fiber bundle {}", path.display());
        io.write_fiber_bundle(path, &outputs.bundle)
            .map_err(|err| io_error(path, err))?;
    }
    if let (Some(path), Some(labels)) = (config.voxelize.as_deref(), outputs.labels.as_ref()) {
        log::info!("Writing label volume {}", path.display());
        io.write_label_volume(path, labels)
            .map_err(|err| io_error(path, err))?;
    }

    if !outputs.report.diagnostics.is_empty() {
        log::warn!(
            "{} recoverable problems were encountered",
            outputs.report.diagnostics.len()
        );
    }

    Ok(outputs.report)
}

fn io_error(path: &Path, err: IoError) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        err,
    }
}

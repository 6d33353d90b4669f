use std::path::PathBuf;
use std::process;

use clap::Parser;

use fiberprocess::io::RonFiles;
use fiberprocess::logger;
use fiberprocess::pipeline::{self, Config, DEFAULT_TENSOR_POINT_RADIUS, DEFAULT_VOXEL_LABEL};

/// Warps fiber bundles through a deformation field, samples diffusion
/// tensors along them and voxelizes them into a label volume.
#[derive(Debug, Parser)]
#[clap(name = "fiberprocess", version)]
struct Options {
    /// Input fiber bundle.
    fiber_file: PathBuf,

    /// Where to write the processed fiber bundle.
    #[clap(short = 'o', long)]
    fiber_output: Option<PathBuf>,

    /// Deformation field storing absolute positions. Takes precedence over
    /// --displacement-field.
    #[clap(short = 'H', long)]
    h_field: Option<PathBuf>,

    /// Deformation field storing displacements.
    #[clap(short = 'd', long)]
    displacement_field: Option<PathBuf>,

    /// Do not warp the geometry, only sample data.
    #[clap(short = 'n', long)]
    no_warp: bool,

    /// Keep the original point data.
    #[clap(long)]
    no_data_change: bool,

    /// Diffusion tensor volume sampled at the fiber points.
    #[clap(short = 'T', long)]
    tensor_volume: Option<PathBuf>,

    /// Where to write the label volume. Requires --tensor-volume.
    #[clap(short = 'V', long)]
    voxelize: Option<PathBuf>,

    /// Count the fiber points falling into each voxel instead of labeling.
    #[clap(long)]
    voxelize_count_fibers: bool,

    /// Label written into voxels hit by a fiber.
    #[clap(short = 'l', long, default_value_t = DEFAULT_VOXEL_LABEL, allow_hyphen_values = true)]
    voxel_label: i32,

    /// Radius stored with every point that receives tensor data.
    #[clap(long, default_value_t = DEFAULT_TENSOR_POINT_RADIUS)]
    tensor_point_radius: f64,

    /// Log debug information.
    #[clap(short = 'v', long)]
    verbose: bool,
}

impl From<Options> for Config {
    fn from(options: Options) -> Self {
        Config {
            fiber_input: Some(options.fiber_file),
            fiber_output: options.fiber_output,
            h_field: options.h_field,
            displacement_field: options.displacement_field,
            tensor_volume: options.tensor_volume,
            no_warp: options.no_warp,
            no_data_change: options.no_data_change,
            voxelize: options.voxelize,
            voxelize_count_fibers: options.voxelize_count_fibers,
            voxel_label: options.voxel_label,
            tensor_point_radius: options.tensor_point_radius,
            verbose: options.verbose,
        }
    }
}

fn main() {
    let options = Options::parse();
    let config = Config::from(options);

    if let Err(err) = logger::init(config.verbose) {
        eprintln!("Failed to initialize logger: {}", err);
    }

    log::debug!("Running with {:?}", config);

    match pipeline::run(&config, &RonFiles) {
        Ok(report) => log::info!(
            "Processed {} fibers with {} points",
            report.fibers,
            report.points
        ),
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    }
}

use nalgebra::{Point3, Vector3};

use crate::fiber::{FiberBundle, FiberPoint, SpatialObject};
use crate::field::{TensorField, VectorField};
use crate::report::{Diagnostic, RunReport};
use crate::tensor::TensorMetrics;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpOptions {
    /// Keep the original geometry even if a deformation field is present.
    pub no_warp: bool,
    /// Sample the tensor volume and attach the tensor and its metrics to each
    /// point. Without it the original point data is copied through.
    pub attach_tensor_data: bool,
    /// Radius given to points that receive tensor data.
    pub tensor_point_radius: f64,
}

/// Rebuilds fiber bundles with deformation corrected positions and
/// resampled tensor data.
///
/// All lookups happen in world space: a point is mapped out of its bundle's
/// object space, displaced by the deformation field sampled there, and the
/// tensor volume is sampled at the displaced location.
#[derive(Debug, Clone, Copy)]
pub struct FiberWarper<'a> {
    deformation: Option<&'a VectorField>,
    tensors: Option<&'a TensorField>,
    options: WarpOptions,
}

impl<'a> FiberWarper<'a> {
    pub fn new(
        deformation: Option<&'a VectorField>,
        tensors: Option<&'a TensorField>,
        options: WarpOptions,
    ) -> Self {
        FiberWarper {
            deformation,
            tensors,
            options,
        }
    }

    /// Whether output positions are warped world coordinates. Without a
    /// deformation field there is nothing to warp with and the original
    /// geometry is kept.
    pub fn warps_geometry(&self) -> bool {
        !self.options.no_warp && self.deformation.is_some()
    }

    /// Displaces a world point by the deformation field.
    ///
    /// Points outside of the field keep their position and a diagnostic is
    /// recorded.
    pub fn warp_world_point(&self, world: &Point3<f64>, report: &mut RunReport) -> Point3<f64> {
        let deformation = match self.deformation {
            Some(deformation) if !self.options.no_warp => deformation,
            _ => return *world,
        };

        match deformation.sample_at_physical_point(world) {
            Ok(displacement) => world + displacement,
            Err(_) => {
                report.record(Diagnostic::DeformationOutOfBounds { world: *world });
                *world
            }
        }
    }

    /// Creates the output counterpart of `original` whose warped world
    /// position is `warped_world`.
    pub fn rebuild_point(
        &self,
        original: &FiberPoint,
        warped_world: &Point3<f64>,
        report: &mut RunReport,
    ) -> FiberPoint {
        let mut point = original.clone();
        if self.warps_geometry() {
            point.position = *warped_world;
        }

        if !self.options.attach_tensor_data {
            return point;
        }
        if let Some(tensors) = self.tensors {
            match tensors.sample_at_physical_point(warped_world) {
                Ok(tensor) => {
                    let metrics = TensorMetrics::from_tensor(&tensor);
                    point.radius = Some(self.options.tensor_point_radius);
                    point.tensor = Some(tensor);
                    for (name, value) in metrics.fields().iter() {
                        point.fields.insert((*name).to_string(), *value);
                    }
                }
                Err(_) => report.record(Diagnostic::TensorOutOfBounds {
                    world: *warped_world,
                }),
            }
        }

        point
    }

    /// Creates the empty output bundle. Warped bundles hold world coordinates,
    /// so they get unit spacing and no offset.
    pub fn output_bundle(&self, input: &FiberBundle) -> FiberBundle {
        if self.warps_geometry() {
            FiberBundle::new(Vector3::new(1.0, 1.0, 1.0), Vector3::zeros())
        } else {
            FiberBundle::new(*input.spacing(), *input.offset())
        }
    }

    /// Warps every fiber of `input` into a new bundle.
    ///
    /// `visit` receives each warped world point before its output point is
    /// built, in fiber and point order. Output fibers are numbered from 1.
    pub fn warp_bundle<F>(
        &self,
        input: &FiberBundle,
        report: &mut RunReport,
        mut visit: F,
    ) -> FiberBundle
    where
        F: FnMut(&Point3<f64>, &mut RunReport),
    {
        let mut output = self.output_bundle(input);
        let mut id = 1;

        for object in input.objects() {
            let fiber = match object {
                SpatialObject::Fiber(fiber) => fiber,
                SpatialObject::Unsupported { kind } => {
                    report.record(Diagnostic::UnsupportedObject { kind: kind.clone() });
                    continue;
                }
            };

            let mut points = Vec::with_capacity(fiber.points().len());
            for original in fiber.points() {
                let world = input.object_to_world(fiber, &original.position);
                let warped_world = self.warp_world_point(&world, report);
                visit(&warped_world, report);
                points.push(self.rebuild_point(original, &warped_world, report));
            }

            report.fibers += 1;
            report.points += points.len();
            output.push_fiber(id, points);
            id += 1;
        }

        output
    }
}

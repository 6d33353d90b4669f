use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};

use crate::tensor::SymmetricTensor;

/// A single sample along a fiber.
///
/// The position is in the object space of the owning bundle unless the bundle
/// was produced by warping, in which case it is a world coordinate and the
/// bundle has unit spacing and zero offset.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FiberPoint {
    pub position: Point3<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    /// RGB color, each channel in `[0, 1]`.
    #[serde(default)]
    pub color: Option<[f64; 3]>,
    #[serde(default)]
    pub tensor: Option<SymmetricTensor>,
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
}

impl FiberPoint {
    pub fn new(position: Point3<f64>) -> Self {
        FiberPoint {
            position,
            radius: None,
            color: None,
            tensor: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

/// An ordered polyline traced through the white matter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fiber {
    id: u32,
    spacing: Vector3<f64>,
    points: Vec<FiberPoint>,
}

impl Fiber {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    pub fn points(&self) -> &[FiberPoint] {
        &self.points
    }
}

/// Child of a fiber bundle. Only fibers carry data this tool processes, other
/// kinds are kept so that they can be reported and skipped explicitly.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SpatialObject {
    Fiber(Fiber),
    Unsupported { kind: String },
}

/// Ordered set of fibers sharing a spacing and an object-to-parent offset.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FiberBundle {
    spacing: Vector3<f64>,
    offset: Vector3<f64>,
    objects: Vec<SpatialObject>,
}

impl FiberBundle {
    pub fn new(spacing: Vector3<f64>, offset: Vector3<f64>) -> Self {
        FiberBundle {
            spacing,
            offset,
            objects: Vec::new(),
        }
    }

    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    pub fn objects(&self) -> &[SpatialObject] {
        &self.objects
    }

    pub fn fibers(&self) -> impl Iterator<Item = &Fiber> {
        self.objects.iter().filter_map(|object| match object {
            SpatialObject::Fiber(fiber) => Some(fiber),
            SpatialObject::Unsupported { .. } => None,
        })
    }

    /// Appends a new fiber. The fiber inherits the bundle spacing.
    pub fn push_fiber(&mut self, id: u32, points: Vec<FiberPoint>) {
        self.objects.push(SpatialObject::Fiber(Fiber {
            id,
            spacing: self.spacing,
            points,
        }));
    }

    pub fn push_unsupported(&mut self, kind: &str) {
        self.objects.push(SpatialObject::Unsupported {
            kind: kind.to_string(),
        });
    }

    /// Maps a fiber point position from the object space of `fiber` to world
    /// space.
    pub fn object_to_world(&self, fiber: &Fiber, position: &Point3<f64>) -> Point3<f64> {
        Point3::from(position.coords.component_mul(&fiber.spacing) + self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiber_bundle_push_fiber_inherits_spacing() {
        let mut bundle = FiberBundle::new(Vector3::new(2.0, 2.0, 3.0), Vector3::zeros());
        bundle.push_fiber(4, vec![FiberPoint::new(Point3::origin())]);

        let fiber = bundle.fibers().next().unwrap();

        assert_eq!(fiber.id(), 4);
        assert_eq!(fiber.spacing(), &Vector3::new(2.0, 2.0, 3.0));
        assert_eq!(fiber.points().len(), 1);
    }

    #[test]
    fn test_fiber_bundle_fibers_skips_unsupported_objects() {
        let mut bundle = FiberBundle::new(Vector3::new(1.0, 1.0, 1.0), Vector3::zeros());
        bundle.push_fiber(1, vec![]);
        bundle.push_unsupported("ellipse");
        bundle.push_fiber(2, vec![]);

        let ids: Vec<u32> = bundle.fibers().map(|fiber| fiber.id()).collect();

        assert_eq!(bundle.objects().len(), 3);
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_fiber_bundle_object_to_world_scales_then_offsets() {
        let mut bundle = FiberBundle::new(Vector3::new(2.0, 0.5, 1.0), Vector3::new(10.0, 0.0, -1.0));
        bundle.push_fiber(1, vec![]);
        let fiber = bundle.fibers().next().unwrap();

        let world = bundle.object_to_world(fiber, &Point3::new(1.0, 4.0, 3.0));

        assert_eq!(world, Point3::new(12.0, 2.0, 2.0));
    }
}

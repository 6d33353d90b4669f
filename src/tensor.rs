use std::cmp::Ordering;
use std::ops::{Add, Mul};

use nalgebra::Matrix3;
use num_traits::Zero;

pub const FIELD_FA: &str = "fa";
pub const FIELD_MD: &str = "md";
pub const FIELD_FRO: &str = "fro";
pub const FIELD_L1: &str = "l1";
pub const FIELD_L2: &str = "l2";
pub const FIELD_L3: &str = "l3";

/// Symmetric 3x3 tensor stored as its 6 independent components in the fixed
/// order xx, xy, xz, yy, yz, zz.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct SymmetricTensor(pub [f64; 6]);

impl SymmetricTensor {
    pub fn new(xx: f64, xy: f64, xz: f64, yy: f64, yz: f64, zz: f64) -> Self {
        SymmetricTensor([xx, xy, xz, yy, yz, zz])
    }

    /// Tensor with `value` on the diagonal and zeros elsewhere.
    pub fn isotropic(value: f64) -> Self {
        SymmetricTensor::new(value, 0.0, 0.0, value, 0.0, value)
    }

    pub fn components(&self) -> &[f64; 6] {
        &self.0
    }

    pub fn xx(&self) -> f64 {
        self.0[0]
    }

    pub fn xy(&self) -> f64 {
        self.0[1]
    }

    pub fn xz(&self) -> f64 {
        self.0[2]
    }

    pub fn yy(&self) -> f64 {
        self.0[3]
    }

    pub fn yz(&self) -> f64 {
        self.0[4]
    }

    pub fn zz(&self) -> f64 {
        self.0[5]
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.xx(),
            self.xy(),
            self.xz(),
            self.xy(),
            self.yy(),
            self.yz(),
            self.xz(),
            self.yz(),
            self.zz(),
        )
    }

    pub fn trace(&self) -> f64 {
        self.xx() + self.yy() + self.zz()
    }

    /// Inner product of the tensor with itself, counting the off-diagonal
    /// entries twice.
    pub fn inner_product(&self) -> f64 {
        let [xx, xy, xz, yy, yz, zz] = self.0;
        xx * xx + 2.0 * xy * xy + 2.0 * xz * xz + yy * yy + 2.0 * yz * yz + zz * zz
    }

    pub fn mean_diffusivity(&self) -> f64 {
        self.trace() / 3.0
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.inner_product().sqrt()
    }

    /// Computes fractional anisotropy, 0 for isotropic tensors and approaching
    /// 1 for linear ones. A zero tensor has no anisotropy.
    pub fn fractional_anisotropy(&self) -> f64 {
        let inner_product = self.inner_product();
        if inner_product <= 0.0 {
            return 0.0;
        }

        let trace = self.trace();
        let anisotropy = 3.0 * inner_product - trace * trace;
        // Rounding can push a nearly isotropic tensor slightly negative.
        (anisotropy.max(0.0) / (2.0 * inner_product)).sqrt()
    }

    /// Eigenvalues in ascending order.
    pub fn eigenvalues(&self) -> [f64; 3] {
        let eigenvalues = self.to_matrix().symmetric_eigenvalues();
        let mut sorted = [eigenvalues[0], eigenvalues[1], eigenvalues[2]];
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        sorted
    }
}

impl Add for SymmetricTensor {
    type Output = SymmetricTensor;

    fn add(self, other: SymmetricTensor) -> SymmetricTensor {
        let mut components = self.0;
        for (component, other_component) in components.iter_mut().zip(other.0.iter()) {
            *component += other_component;
        }

        SymmetricTensor(components)
    }
}

impl Mul<f64> for SymmetricTensor {
    type Output = SymmetricTensor;

    fn mul(self, weight: f64) -> SymmetricTensor {
        let mut components = self.0;
        for component in components.iter_mut() {
            *component *= weight;
        }

        SymmetricTensor(components)
    }
}

impl Zero for SymmetricTensor {
    fn zero() -> Self {
        SymmetricTensor([0.0; 6])
    }

    fn is_zero(&self) -> bool {
        self.0.iter().all(|component| *component == 0.0)
    }
}

/// Scalar quantities derived from a diffusion tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensorMetrics {
    pub fa: f64,
    pub md: f64,
    pub fro: f64,
    /// Ascending, `eigenvalues[0]` is reported as l1.
    pub eigenvalues: [f64; 3],
}

impl TensorMetrics {
    pub fn from_tensor(tensor: &SymmetricTensor) -> Self {
        TensorMetrics {
            fa: tensor.fractional_anisotropy(),
            md: tensor.mean_diffusivity(),
            fro: tensor.frobenius_norm(),
            eigenvalues: tensor.eigenvalues(),
        }
    }

    /// Named point fields in the order they are attached to fiber points.
    pub fn fields(&self) -> [(&'static str, f64); 6] {
        [
            (FIELD_FA, self.fa),
            (FIELD_MD, self.md),
            (FIELD_FRO, self.fro),
            (FIELD_L1, self.eigenvalues[0]),
            (FIELD_L2, self.eigenvalues[1]),
            (FIELD_L3, self.eigenvalues[2]),
        ]
    }
}

//! Workload generation and ground-truth computation.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use mb_store::{ArtifactRole, ArtifactStore};
use mb_tensor::{CpuBackend, Matrix, Shape};

use crate::error::Result;

/// Produces matrices with entries drawn uniformly from `[0.0, 1.0)`.
///
/// With a seed, generation is reproducible; without one, the RNG is seeded
/// from the operating system and only shapes and ranges are stable.
pub struct WorkloadGenerator {
    rng: StdRng,
    dist: Uniform<f64>,
}

impl WorkloadGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        WorkloadGenerator {
            rng,
            dist: Uniform::new(0.0, 1.0),
        }
    }

    /// A matrix of the given shape with i.i.d. uniform entries.
    pub fn random_matrix(&mut self, shape: Shape) -> Matrix {
        Matrix::from_fn(shape, |_, _| self.dist.sample(&mut self.rng))
    }

    /// Two independent `n x n` operands.
    pub fn generate(&mut self, n: usize) -> (Matrix, Matrix) {
        let a = self.random_matrix(Shape::square(n));
        let b = self.random_matrix(Shape::square(n));
        (a, b)
    }
}

/// The ground-truth product, computed by the reference backend.
pub fn compute_reference(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    Ok(CpuBackend::new().matmul(a, b)?)
}

/// A generated workload together with its ground truth.
#[derive(Debug, Clone)]
pub struct Workload {
    pub a: Matrix,
    pub b: Matrix,
    pub reference: Matrix,
}

impl Workload {
    pub fn generate(n: usize, seed: Option<u64>) -> Result<Workload> {
        let (a, b) = WorkloadGenerator::new(seed).generate(n);
        let reference = compute_reference(&a, &b)?;
        Ok(Workload { a, b, reference })
    }

    /// Persist `A`, `B` and `C_reference`.
    pub fn save(&self, store: &ArtifactStore) -> Result<()> {
        for (role, matrix) in [
            (ArtifactRole::A, &self.a),
            (ArtifactRole::B, &self.b),
            (ArtifactRole::Reference, &self.reference),
        ] {
            let path = store.save(role.name(), matrix)?;
            info!(artifact = %role, shape = %matrix.shape(), path = %path.display(), "saved");
        }
        Ok(())
    }
}

/// Generate an `n x n` workload, compute its reference product and store
/// all three artifacts.
pub fn generate_artifacts(store: &ArtifactStore, n: usize, seed: Option<u64>) -> Result<Workload> {
    info!(n, seeded = seed.is_some(), "generating workload");
    let workload = Workload::generate(n, seed)?;
    workload.save(store)?;
    Ok(workload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shapes() {
        let mut g = WorkloadGenerator::new(None);
        for n in [1, 4, 17] {
            let (a, b) = g.generate(n);
            assert_eq!(a.shape(), Shape::square(n));
            assert_eq!(b.shape(), Shape::square(n));
        }
    }

    #[test]
    fn test_values_in_unit_interval() {
        let (a, b) = WorkloadGenerator::new(None).generate(32);
        assert!(a.data().iter().chain(b.data()).all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let first = WorkloadGenerator::new(Some(7)).generate(8);
        let second = WorkloadGenerator::new(Some(7)).generate(8);
        assert_eq!(first, second);
        let other = WorkloadGenerator::new(Some(8)).generate(8);
        assert_ne!(first.0, other.0);
    }

    #[test]
    fn test_operands_are_independent() {
        let (a, b) = WorkloadGenerator::new(Some(1)).generate(8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_reference_shape() {
        let w = Workload::generate(5, Some(3)).unwrap();
        assert_eq!(w.reference.shape(), Shape::square(5));
    }
}

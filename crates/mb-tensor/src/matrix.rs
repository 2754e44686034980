use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// A dense, row-major matrix of f64 values.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    shape: Shape,
}

impl Matrix {
    /// Create a matrix from row-major data and a shape.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `data.len()` is not `rows * cols`.
    pub fn new(data: Vec<f64>, shape: Shape) -> Result<Self> {
        if shape.checked_numel() != Some(data.len()) {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Matrix { data, shape })
    }

    /// Create a matrix with every element set to `value`.
    pub fn filled(shape: Shape, value: f64) -> Self {
        Matrix {
            data: vec![value; shape.numel()],
            shape,
        }
    }

    /// Create a matrix whose element `(i, j)` is `f(i, j)`, filled in
    /// row-major order.
    pub fn from_fn(shape: Shape, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(shape.numel());
        for i in 0..shape.rows() {
            for j in 0..shape.cols() {
                data.push(f(i, j));
            }
        }
        Matrix { data, shape }
    }

    /// Create a zero-filled matrix with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Create a matrix filled with ones with the given shape.
    pub fn ones(shape: Shape) -> Self {
        Self::filled(shape, 1.0)
    }

    /// Create the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(Shape::square(n));
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Returns the matrix shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    pub fn cols(&self) -> usize {
        self.shape.cols()
    }

    /// Returns the underlying row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Element at row `i`, column `j`, or `None` if out of bounds.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.rows() && j < self.cols() {
            Some(self.data[i * self.cols() + j])
        } else {
            None
        }
    }

    /// Row `i` as a slice, or `None` if out of bounds.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i < self.rows() {
            let cols = self.cols();
            Some(&self.data[i * cols..(i + 1) * cols])
        } else {
            None
        }
    }

    /// The first `count` values of the first row (fewer if the matrix is
    /// narrower, empty if it has no rows).
    pub fn sample(&self, count: usize) -> &[f64] {
        match self.row(0) {
            Some(row) => &row[..count.min(row.len())],
            None => &[],
        }
    }

    /// Matrix product `self @ other` on the given backend.
    pub fn matmul(&self, other: &Matrix, backend: &mut dyn ComputeBackend) -> Result<Matrix> {
        backend.multiply(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;

    #[test]
    fn test_new_matrix() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::new(2, 3)).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.row(1), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn test_new_shape_mismatch() {
        let err = Matrix::new(vec![1.0, 2.0], Shape::new(3, 1)).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_zeros_ones_identity() {
        let z = Matrix::zeros(Shape::new(2, 3));
        assert_eq!(z.data(), &[0.0; 6]);

        let o = Matrix::ones(Shape::new(1, 3));
        assert_eq!(o.data(), &[1.0, 1.0, 1.0]);

        let i = Matrix::identity(3);
        let f = Matrix::from_fn(Shape::new(2, 2), |i, j| (i * 10 + j) as f64);
        assert_eq!(f.data(), &[0.0, 1.0, 10.0, 11.0]);
        assert_eq!(i.data(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_sample() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(2, 2)).unwrap();
        assert_eq!(m.sample(2), &[1.0, 2.0]);
        let narrow = Matrix::new(vec![7.0, 8.0], Shape::new(2, 1)).unwrap();
        assert_eq!(narrow.sample(2), &[7.0]);
        let empty = Matrix::zeros(Shape::new(0, 4));
        assert!(empty.sample(2).is_empty());
    }

    #[test]
    fn test_matmul() {
        let mut backend = CpuBackend::new();
        let a = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(2, 2)).unwrap();
        let b = Matrix::new(vec![5.0, 6.0, 7.0, 8.0], Shape::new(2, 2)).unwrap();
        let c = a.matmul(&b, &mut backend).unwrap();
        assert_eq!(c.shape(), Shape::new(2, 2));
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let mut backend = CpuBackend::new();
        let a = Matrix::new(vec![1.0, 2.0, 3.0], Shape::new(1, 3)).unwrap();
        let b = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(2, 2)).unwrap();
        assert!(matches!(
            a.matmul(&b, &mut backend),
            Err(TensorError::MatmulMismatch { m: 1, k: 3, k2: 2, n: 2 })
        ));
    }
}

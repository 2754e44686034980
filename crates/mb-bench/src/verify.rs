//! Comparison of a backend's product against the ground truth.

use mb_tensor::Matrix;

/// Relative and absolute thresholds for approximate equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Tolerance { rtol, atol }
    }

    /// `|x - y| <= atol + rtol * |y|`, with `y` the reference value.
    ///
    /// Identical values (including equal infinities) always match; NaN never
    /// does.
    pub fn admits(&self, x: f64, y: f64) -> bool {
        x == y || (x - y).abs() <= self.atol + self.rtol * y.abs()
    }
}

/// True if both matrices have the same shape and identical elements.
pub fn exact_equals(x: &Matrix, y: &Matrix) -> bool {
    x.shape() == y.shape() && x.data().iter().zip(y.data()).all(|(a, b)| a == b)
}

/// True if both matrices have the same shape and every element pair is
/// admitted by `tolerance`.
pub fn approx_equals(x: &Matrix, y: &Matrix, tolerance: Tolerance) -> bool {
    x.shape() == y.shape()
        && x
            .data()
            .iter()
            .zip(y.data())
            .all(|(&a, &b)| tolerance.admits(a, b))
}

/// Largest element-wise absolute difference, `None` if the shapes differ.
pub fn max_abs_diff(x: &Matrix, y: &Matrix) -> Option<f64> {
    if x.shape() != y.shape() {
        return None;
    }
    Some(
        x.data()
            .iter()
            .zip(y.data())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max),
    )
}

/// Both verdicts for one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub exact: bool,
    pub approximate: bool,
    pub tolerance: Tolerance,
    pub max_abs_diff: Option<f64>,
}

pub fn verify(computed: &Matrix, reference: &Matrix, tolerance: Tolerance) -> Verdict {
    Verdict {
        exact: exact_equals(computed, reference),
        approximate: approx_equals(computed, reference, tolerance),
        tolerance,
        max_abs_diff: max_abs_diff(computed, reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_tensor::Shape;

    fn m(data: Vec<f64>, rows: usize, cols: usize) -> Matrix {
        Matrix::new(data, Shape::new(rows, cols)).unwrap()
    }

    #[test]
    fn test_exact() {
        let x = m(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        assert!(exact_equals(&x, &x.clone()));
        let y = m(vec![1.0, 2.0, 3.0, 4.0 + f64::EPSILON * 4.0], 2, 2);
        assert!(!exact_equals(&x, &y));
    }

    #[test]
    fn test_shape_mismatch_is_never_equal() {
        let x = m(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let y = m(vec![1.0, 2.0, 3.0, 4.0], 1, 4);
        assert!(!exact_equals(&x, &y));
        assert!(!approx_equals(&x, &y, Tolerance::default()));
        assert_eq!(max_abs_diff(&x, &y), None);
    }

    #[test]
    fn test_approx_relative() {
        let reference = m(vec![1000.0], 1, 1);
        let close = m(vec![1000.0 + 0.009], 1, 1);
        let far = m(vec![1000.0 + 0.011], 1, 1);
        assert!(approx_equals(&close, &reference, Tolerance::default()));
        assert!(!approx_equals(&far, &reference, Tolerance::default()));
    }

    #[test]
    fn test_approx_absolute_near_zero() {
        let reference = m(vec![0.0], 1, 1);
        assert!(approx_equals(&m(vec![5e-9], 1, 1), &reference, Tolerance::default()));
        assert!(!approx_equals(&m(vec![5e-8], 1, 1), &reference, Tolerance::default()));
    }

    #[test]
    fn test_tolerance_is_asymmetric() {
        // The reference magnitude scales the bound.
        let t = Tolerance::new(0.1, 0.0);
        assert!(t.admits(1.0, 1.1));
        assert!(!t.admits(1.1, 1.0 - 1e-12));
    }

    #[test]
    fn test_non_finite() {
        let t = Tolerance::default();
        assert!(t.admits(f64::INFINITY, f64::INFINITY));
        assert!(!t.admits(f64::INFINITY, f64::NEG_INFINITY));
        assert!(!t.admits(f64::NAN, f64::NAN));
        let nan = m(vec![f64::NAN], 1, 1);
        assert!(!exact_equals(&nan, &nan.clone()));
    }

    #[test]
    fn test_verdict() {
        let x = m(vec![1.0, 2.0], 1, 2);
        let y = m(vec![1.0, 2.0 + 1e-9], 1, 2);
        let v = verify(&y, &x, Tolerance::default());
        assert!(!v.exact);
        assert!(v.approximate);
        let diff = v.max_abs_diff.unwrap();
        assert!(diff > 0.0 && diff < 2e-9);
    }
}

use std::fmt;

/// The shape of a dense two-dimensional matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a new `rows x cols` shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Create an `n x n` shape.
    pub fn square(n: usize) -> Self {
        Shape { rows: n, cols: n }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements, or `None` if `rows * cols` overflows.
    pub fn checked_numel(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Returns the dimensions as `[rows, cols]`.
    pub fn dims(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Shape of `self @ other`, or `None` if the inner dimensions disagree.
    pub fn matmul_shape(&self, other: &Shape) -> Option<Shape> {
        if self.cols == other.rows {
            Some(Shape::new(self.rows, other.cols))
        } else {
            None
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

//! Dense matrix adapter for the Kronos solvers.
//!
//! Wraps [`nalgebra`] behind a small surface so the solver crates never
//! touch the backing matrix engine directly. Everything here operates on
//! dynamically sized `f64` matrices; element-wise arithmetic and products
//! come from the re-exported types themselves.

pub use nalgebra::{DMatrix, DVector};

/// Owned dense matrix used throughout the workspace.
pub type Matrix = DMatrix<f64>;

/// Owned dense column vector used throughout the workspace.
pub type Vector = DVector<f64>;

/// Identity matrix of size `k`.
pub fn eye(k: usize) -> Matrix {
    Matrix::identity(k, k)
}

/// Zero matrix of shape `rows x cols`.
pub fn zeros(rows: usize, cols: usize) -> Matrix {
    Matrix::zeros(rows, cols)
}

/// All-ones matrix of shape `rows x cols`.
pub fn ones(rows: usize, cols: usize) -> Matrix {
    Matrix::from_element(rows, cols, 1.0)
}

/// Determinant of a square matrix.
pub fn det(m: &Matrix) -> f64 {
    m.determinant()
}

/// Inverse of a square matrix, or `None` if singular.
pub fn inv(m: &Matrix) -> Option<Matrix> {
    m.clone().try_inverse()
}

/// Extracts the submatrix selected by explicit row and column index lists.
///
/// # Panics
///
/// Panics if any index is out of bounds.
pub fn submatrix(m: &Matrix, rows: &[usize], cols: &[usize]) -> Matrix {
    Matrix::from_fn(rows.len(), cols.len(), |i, j| m[(rows[i], cols[j])])
}

/// Builds a `k x k` matrix in which every row equals `v`.
pub fn replicate_rows(v: &[f64], k: usize) -> Matrix {
    Matrix::from_fn(k, v.len(), |_, j| v[j])
}

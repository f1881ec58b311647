//! Transition matrix resolution and inverse-CDF sampling.
//!
//! User input arrives in one of four shapes (rate amplitudes, an
//! upper-triangular probability list, a dense matrix, or a sparse keyed
//! map over a product state space) and is normalized here into a single
//! row-stochastic [`TransitionMatrix`].

use std::collections::BTreeMap;

use kronos_linalg::Matrix;
use kronos_numeric::mixed_radix_index;

use crate::error::ChainError;

/// Row-sum tolerance accepted on user-supplied probabilities.
pub const ROW_SUM_TOL: f64 = 1e-3;

/// How the one-step transition law is specified.
#[derive(Debug, Clone)]
pub enum TransitionSpec {
    /// `K(K-1)/2` jump-rate amplitudes; normalized to probabilities and
    /// then treated like [`TransitionSpec::UpperTriangular`].
    Rates(Vec<f64>),
    /// `K(K-1)/2` upper-triangular transition probabilities, row-major
    /// over pairs `(i, j)` with `j > i`. Mirrored below the diagonal;
    /// diagonals close each row to 1.
    UpperTriangular(Vec<f64>),
    /// A dense `K x K` row-stochastic matrix, accepted as-is.
    Dense(Vec<Vec<f64>>),
    /// A sparse keyed map. Keys are composite indices like `"0,1"` into
    /// the product state space described by `dims` (least-significant
    /// part first), or plain indices when `dims` is absent. Unspecified
    /// diagonal entries close each row to 1.
    Sparse {
        /// Total number of states.
        states: usize,
        /// `from-key -> (to-key -> probability)`.
        entries: BTreeMap<String, BTreeMap<String, f64>>,
        /// Optional grid dimensions for composite keys.
        dims: Option<Vec<usize>>,
    },
}

/// A `K x K` row-stochastic transition matrix.
///
/// Each row `i` holds the probabilities of moving from state `i` to every
/// state `j`. Rows are renormalized at resolution time, so sums hold to
/// machine precision rather than the looser input tolerance.
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    probs: Matrix,
}

impl TransitionMatrix {
    /// Resolves a [`TransitionSpec`] into a validated transition matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the input shape is inconsistent, an
    /// entry is non-finite or out of range, or a row misses 1 by more
    /// than [`ROW_SUM_TOL`].
    pub fn resolve(spec: &TransitionSpec) -> Result<Self, ChainError> {
        let probs = match spec {
            TransitionSpec::Rates(alpha) => {
                let total: f64 = alpha.iter().sum();
                if total <= 0.0 || !total.is_finite() {
                    return Err(ChainError::RowSumViolation {
                        row: 0,
                        sum: total,
                        tol: ROW_SUM_TOL,
                    });
                }
                let p: Vec<f64> = alpha.iter().map(|a| a / total).collect();
                from_upper_triangular(&p)?
            }
            TransitionSpec::UpperTriangular(p) => from_upper_triangular(p)?,
            TransitionSpec::Dense(rows) => from_dense(rows)?,
            TransitionSpec::Sparse {
                states,
                entries,
                dims,
            } => from_sparse(*states, entries, dims.as_deref())?,
        };
        let tm = Self { probs };
        tm.validate(ROW_SUM_TOL)?;
        Ok(tm.renormalized())
    }

    /// Wraps an already row-stochastic matrix, validating it first.
    pub fn from_matrix(probs: Matrix) -> Result<Self, ChainError> {
        if probs.nrows() != probs.ncols() {
            return Err(ChainError::NotSquare {
                rows: probs.nrows(),
                cols: probs.ncols(),
            });
        }
        let tm = Self { probs };
        tm.validate(ROW_SUM_TOL)?;
        Ok(tm.renormalized())
    }

    /// Number of states.
    pub fn k(&self) -> usize {
        self.probs.nrows()
    }

    /// The probability of moving from `from` to `to`.
    pub fn prob(&self, from: usize, to: usize) -> f64 {
        self.probs[(from, to)]
    }

    /// The full probability matrix.
    pub fn probs(&self) -> &Matrix {
        &self.probs
    }

    /// One row as an owned vector.
    pub fn row(&self, from: usize) -> Vec<f64> {
        (0..self.k()).map(|j| self.probs[(from, j)]).collect()
    }

    /// Validates that the matrix is row-stochastic.
    ///
    /// Checks that every value is finite and in `[0, 1]`, and that each
    /// row sums to 1 within `tol`.
    pub fn validate(&self, tol: f64) -> Result<(), ChainError> {
        let k = self.k();
        if k == 0 {
            return Err(ChainError::EmptyMatrix);
        }
        for i in 0..k {
            let mut sum = 0.0;
            for j in 0..k {
                let p = self.probs[(i, j)];
                if !p.is_finite() {
                    return Err(ChainError::NonFiniteEntry {
                        row: i,
                        col: j,
                        value: p,
                    });
                }
                if !(-tol..=1.0 + tol).contains(&p) {
                    return Err(ChainError::OutOfRangeEntry {
                        row: i,
                        col: j,
                        value: p,
                    });
                }
                sum += p;
            }
            if (sum - 1.0).abs() > tol {
                return Err(ChainError::RowSumViolation { row: i, sum, tol });
            }
        }
        Ok(())
    }

    /// Returns the row-wise cumulative form used for inverse-CDF draws.
    pub fn cumulative(&self) -> CumulativeRows {
        let k = self.k();
        let mut rows = Vec::with_capacity(k);
        for i in 0..k {
            let mut row = self.row(i);
            kronos_numeric::cumsum_in_place(&mut row);
            // Pin the final cumulant so rounding can never lose the last state.
            if let Some(last) = row.last_mut() {
                *last = 1.0;
            }
            rows.push(row);
        }
        CumulativeRows { rows }
    }

    /// Rescales each row by its exact sum.
    fn renormalized(mut self) -> Self {
        let k = self.k();
        for i in 0..k {
            let sum: f64 = (0..k).map(|j| self.probs[(i, j)]).sum();
            if sum > 0.0 {
                for j in 0..k {
                    self.probs[(i, j)] /= sum;
                }
            }
        }
        self
    }
}

/// Row-wise cumulative transition probabilities.
///
/// Each row is weakly monotone and ends exactly at 1.
#[derive(Debug, Clone)]
pub struct CumulativeRows {
    rows: Vec<Vec<f64>>,
}

impl CumulativeRows {
    /// Number of states.
    pub fn k(&self) -> usize {
        self.rows.len()
    }

    /// The cumulative row for a source state.
    pub fn row(&self, from: usize) -> &[f64] {
        &self.rows[from]
    }

    /// Samples the next state from `from` by inverse-CDF.
    ///
    /// Draws `u ~ Uniform(0, 1)` and returns the smallest `j` whose
    /// cumulative mass exceeds `u`, clamped to the last state.
    pub fn sample(&self, from: usize, rng: &mut impl rand::Rng) -> usize {
        let u: f64 = rng.random();
        pick(&self.rows[from], u)
    }
}

/// Smallest index whose cumulative mass exceeds `u`, clamped to the end.
pub fn pick(cumulative: &[f64], u: f64) -> usize {
    for (j, &c) in cumulative.iter().enumerate() {
        if c > u {
            return j;
        }
    }
    cumulative.len().saturating_sub(1)
}

/// Recovers `K` from an upper-triangular entry count `n = K(K-1)/2`.
fn state_count_from_pairs(n: usize) -> Result<usize, ChainError> {
    let k = ((1.0 + (1.0 + 8.0 * n as f64).sqrt()) / 2.0).round() as usize;
    if k < 2 || k * (k - 1) / 2 != n {
        return Err(ChainError::RateCountMismatch { n });
    }
    Ok(k)
}

fn from_upper_triangular(p: &[f64]) -> Result<Matrix, ChainError> {
    let k = state_count_from_pairs(p.len())?;
    let mut m = Matrix::zeros(k, k);
    let mut idx = 0;
    for i in 0..k {
        for j in (i + 1)..k {
            m[(i, j)] = p[idx];
            m[(j, i)] = p[idx];
            idx += 1;
        }
    }
    close_diagonals(&mut m)?;
    Ok(m)
}

fn from_dense(rows: &[Vec<f64>]) -> Result<Matrix, ChainError> {
    let k = rows.len();
    if k == 0 {
        return Err(ChainError::EmptyMatrix);
    }
    for row in rows {
        if row.len() != k {
            return Err(ChainError::NotSquare {
                rows: k,
                cols: row.len(),
            });
        }
    }
    Ok(Matrix::from_fn(k, k, |i, j| rows[i][j]))
}

fn from_sparse(
    states: usize,
    entries: &BTreeMap<String, BTreeMap<String, f64>>,
    dims: Option<&[usize]>,
) -> Result<Matrix, ChainError> {
    if states == 0 {
        return Err(ChainError::EmptyMatrix);
    }
    if let Some(d) = dims {
        let product: usize = d.iter().product();
        if product != states {
            return Err(ChainError::DimensionMismatch { product, states });
        }
    }

    let mut m = Matrix::zeros(states, states);
    for (from_key, row) in entries {
        let from = parse_key(from_key, dims, states)?;
        for (to_key, &p) in row {
            let to = parse_key(to_key, dims, states)?;
            if to != from {
                m[(from, to)] = p;
            }
        }
    }
    close_diagonals(&mut m)?;
    Ok(m)
}

/// Parses a composite key into a flat state index.
///
/// A key with several comma-separated parts is a mixed-radix index over
/// `dims` (least-significant part first) and must match the dimension
/// count exactly; a single-part key is a plain index.
fn parse_key(key: &str, dims: Option<&[usize]>, states: usize) -> Result<usize, ChainError> {
    let parts: Result<Vec<usize>, _> = key.split(',').map(|s| s.trim().parse()).collect();
    let parts = parts.map_err(|_| ChainError::BadCompositeKey {
        key: key.to_string(),
    })?;

    let index = match (parts.len(), dims) {
        (1, _) => parts[0],
        (arity, Some(d)) if arity == d.len() => {
            for (&part, &radix) in parts.iter().zip(d.iter()) {
                if part >= radix {
                    return Err(ChainError::StateIndexOutOfBounds {
                        index: part,
                        states: radix,
                    });
                }
            }
            mixed_radix_index(&parts, d)
        }
        (arity, Some(d)) => {
            return Err(ChainError::KeyArityMismatch {
                key: key.to_string(),
                arity,
                expected: d.len(),
            });
        }
        (arity, None) => {
            return Err(ChainError::KeyArityMismatch {
                key: key.to_string(),
                arity,
                expected: 1,
            });
        }
    };

    if index >= states {
        return Err(ChainError::StateIndexOutOfBounds { index, states });
    }
    Ok(index)
}

/// Sets each diagonal so its row sums to 1, rejecting overfull rows.
fn close_diagonals(m: &mut Matrix) -> Result<(), ChainError> {
    let k = m.nrows();
    for i in 0..k {
        let off_sum: f64 = (0..k).filter(|&j| j != i).map(|j| m[(i, j)]).sum();
        if off_sum > 1.0 + ROW_SUM_TOL {
            return Err(ChainError::RowSumViolation {
                row: i,
                sum: off_sum,
                tol: ROW_SUM_TOL,
            });
        }
        m[(i, i)] = (1.0 - off_sum).max(0.0);
    }
    Ok(())
}

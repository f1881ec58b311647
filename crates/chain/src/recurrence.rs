//! Mean recurrence times and the equilibrium distribution.
//!
//! Derives the equilibrium probabilities and the matrix of mean first-passage
//! times from a row-stochastic transition matrix via the fundamental matrix
//! `Z = (I - P + W)^-1`, where `W` replicates the equilibrium row-wise.

use kronos_linalg::{Matrix, det, eye, inv, replicate_rows, submatrix, zeros};
use tracing::warn;

use crate::transition::TransitionMatrix;

/// Determinant magnitude below which the chain is declared non-ergodic.
pub const ERGODICITY_TOL: f64 = 1e-3;

/// Mean recurrence solution for a transition matrix.
#[derive(Debug, Clone)]
pub struct Recurrence {
    /// `H[i][j]`: expected time to first reach `j` starting at `i`.
    /// All zeros when the chain is not ergodic.
    pub times: Matrix,
    /// Equilibrium state probabilities. Uniform fallback when non-ergodic.
    pub eq_probs: Vec<f64>,
    /// Whether the ergodicity test passed.
    pub ergodic: bool,
}

impl Recurrence {
    fn non_ergodic(k: usize) -> Self {
        Self {
            times: zeros(k, k),
            eq_probs: vec![1.0 / k as f64; k],
            ergodic: false,
        }
    }
}

/// Solves for mean recurrence times and the equilibrium distribution.
///
/// A chain whose reduced generator has `|det| <` [`ERGODICITY_TOL`] (or a
/// singular fundamental matrix) is reported non-ergodic: the solver warns,
/// zeroes the recurrence times, and falls back to a uniform equilibrium.
pub fn solve_recurrence(tm: &TransitionMatrix) -> Recurrence {
    let k = tm.k();
    let p = tm.probs();

    if k == 1 {
        return Recurrence {
            times: Matrix::from_element(1, 1, 1.0),
            eq_probs: vec![1.0],
            ergodic: true,
        };
    }

    // Partition off the first state: Pu is the top row minus its first
    // entry, Pk the lower-right (K-1) x (K-1) block.
    let rest: Vec<usize> = (1..k).collect();
    let p_u = submatrix(p, &[0], &rest);
    let p_k = submatrix(p, &rest, &rest);

    let a = &p_k - eye(k - 1);
    let det_a = det(&a);
    if det_a.abs() < ERGODICITY_TOL {
        warn!(det = det_a, "chain is not ergodic; recurrence times zeroed");
        return Recurrence::non_ergodic(k);
    }
    let Some(a_inv) = inv(&a) else {
        warn!(det = det_a, "reduced generator is singular; recurrence times zeroed");
        return Recurrence::non_ergodic(k);
    };

    // Unnormalized equilibrium: w = [1, -Pu * A^-1], then rescale to sum 1.
    let w_tail = -(&p_u * &a_inv);
    let mut w = Vec::with_capacity(k);
    w.push(1.0);
    for j in 0..(k - 1) {
        w.push(w_tail[(0, j)]);
    }
    let total: f64 = w.iter().sum();
    if total.abs() < f64::MIN_POSITIVE {
        warn!("equilibrium mass vanished; recurrence times zeroed");
        return Recurrence::non_ergodic(k);
    }
    for x in w.iter_mut() {
        *x /= total;
    }

    // Fundamental matrix Z = (I - P + W)^-1.
    let w_mat = replicate_rows(&w, k);
    let Some(z) = inv(&(eye(k) - p + w_mat)) else {
        warn!("fundamental matrix is singular; recurrence times zeroed");
        return Recurrence::non_ergodic(k);
    };

    let times = Matrix::from_fn(k, k, |i, j| {
        if i == j {
            1.0 / w[j]
        } else {
            (z[(j, j)] - z[(i, j)]) / w[j]
        }
    });

    Recurrence {
        times,
        eq_probs: w,
        ergodic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::TransitionSpec;

    fn resolve(rows: &[&[f64]]) -> TransitionMatrix {
        TransitionMatrix::resolve(&TransitionSpec::Dense(
            rows.iter().map(|r| r.to_vec()).collect(),
        ))
        .unwrap()
    }

    // 1. single_state
    #[test]
    fn single_state() {
        let tm = resolve(&[&[1.0]]);
        let r = solve_recurrence(&tm);
        assert!(r.ergodic);
        assert!((r.times[(0, 0)] - 1.0).abs() < 1e-12);
        assert_eq!(r.eq_probs, vec![1.0]);
    }

    // 2. three_state_textbook
    #[test]
    fn three_state_textbook() {
        let tm = resolve(&[&[0.5, 0.25, 0.25], &[0.5, 0.0, 0.5], &[0.25, 0.25, 0.5]]);
        let r = solve_recurrence(&tm);
        assert!(r.ergodic);
        assert!((r.eq_probs[0] - 0.4).abs() < 1e-9, "eq {:?}", r.eq_probs);
        assert!((r.eq_probs[1] - 0.2).abs() < 1e-9);
        assert!((r.eq_probs[2] - 0.4).abs() < 1e-9);
        assert!((r.times[(0, 0)] - 2.5).abs() < 1e-9);
        assert!((r.times[(1, 1)] - 5.0).abs() < 1e-9);
        assert!((r.times[(2, 2)] - 2.5).abs() < 1e-9);
    }

    // 3. diagonal_is_inverse_equilibrium
    #[test]
    fn diagonal_is_inverse_equilibrium() {
        let tm = resolve(&[&[0.3, 0.7], &[0.6, 0.4]]);
        let r = solve_recurrence(&tm);
        assert!(r.ergodic);
        for i in 0..2 {
            assert!((r.times[(i, i)] - 1.0 / r.eq_probs[i]).abs() < 1e-9);
        }
    }

    // 4. two_state_symmetric
    #[test]
    fn two_state_symmetric() {
        let tm = resolve(&[&[0.5, 0.5], &[0.5, 0.5]]);
        let r = solve_recurrence(&tm);
        assert!(r.ergodic);
        assert!((r.eq_probs[0] - 0.5).abs() < 1e-9);
        assert!((r.times[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((r.times[(0, 1)] - 2.0).abs() < 1e-9);
    }

    // 5. non_ergodic_absorbing_state
    #[test]
    fn non_ergodic_absorbing_state() {
        // State 2 is absorbing, so the reduced generator is singular.
        let tm = resolve(&[&[0.1, 0.8, 0.1], &[0.1, 0.9, 0.0], &[0.0, 0.0, 1.0]]);
        let r = solve_recurrence(&tm);
        assert!(!r.ergodic);
        assert!(r.times.iter().all(|&x| x == 0.0));
        // Uniform fallback.
        for &p in &r.eq_probs {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    // 6. equilibrium_sums_to_one
    #[test]
    fn equilibrium_sums_to_one() {
        let tm = resolve(&[&[0.2, 0.5, 0.3], &[0.3, 0.2, 0.5], &[0.5, 0.3, 0.2]]);
        let r = solve_recurrence(&tm);
        let sum: f64 = r.eq_probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}

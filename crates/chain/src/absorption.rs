//! Expected first-absorption times and destination probabilities.

use kronos_linalg::{Matrix, Vector, eye, inv, submatrix, zeros};
use tracing::warn;

use crate::transition::TransitionMatrix;

/// First-absorption solution over the transient states of a chain.
///
/// `times[r]` and `probs.row(r)` describe the `r`-th transient state in
/// `transient` order. `states` lists the absorbing destinations using
/// one-based indices, the form handed to downstream consumers; everything
/// else in the crate stays zero-based.
#[derive(Debug, Clone)]
pub struct Absorption {
    /// Expected steps until absorption, per transient state.
    pub times: Vec<f64>,
    /// Probability of ending in each absorbing state, transient x absorbing.
    pub probs: Matrix,
    /// One-based absorbing state indices.
    pub states: Vec<usize>,
    /// Zero-based transient state indices.
    pub transient: Vec<usize>,
}

impl Absorption {
    fn empty() -> Self {
        Self {
            times: Vec::new(),
            probs: zeros(0, 0),
            states: Vec::new(),
            transient: Vec::new(),
        }
    }

    /// True when the chain has no transient/absorbing split.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Solves the first-absorption problem for a transition matrix.
///
/// States with `P[k][k] = 1` are absorbing; the rest are transient. With
/// both sets non-empty, computes `N = (I - Q)^-1`, expected absorption
/// times `N * 1`, and destination probabilities `N * R` on the transient
/// blocks. Returns an empty result when either set is empty or the
/// transient block is singular.
pub fn solve_absorption(tm: &TransitionMatrix) -> Absorption {
    let k = tm.k();
    let p = tm.probs();

    let absorbing: Vec<usize> = (0..k).filter(|&i| (p[(i, i)] - 1.0).abs() < 1e-9).collect();
    let transient: Vec<usize> = (0..k).filter(|&i| (p[(i, i)] - 1.0).abs() >= 1e-9).collect();

    if absorbing.is_empty() || transient.is_empty() {
        return Absorption::empty();
    }

    let q = submatrix(p, &transient, &transient);
    let r = submatrix(p, &transient, &absorbing);

    let Some(n) = inv(&(eye(transient.len()) - q)) else {
        warn!("transient block is singular; absorption left empty");
        return Absorption::empty();
    };

    let times_vec = &n * Vector::from_element(transient.len(), 1.0);
    let probs = &n * r;

    Absorption {
        times: times_vec.iter().copied().collect(),
        probs,
        states: absorbing.iter().map(|&i| i + 1).collect(),
        transient,
    }
}

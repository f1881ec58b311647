//! Per-variant state-transition kernels.
//!
//! Categorical kernels (`markov_step`, `gillespie_step`, `metropolis_step`)
//! draw the next state of one ensemble member from engine-owned tables.
//! Stateless kernels ([`GaussField`], [`WienerWalk`], [`OrnsteinProcess`])
//! produce a real-valued intensity or displacement for the current time.

use std::f64::consts::PI;

use kronos_chain::{CumulativeRows, pick};
use kronos_linalg::Matrix;
use num_complex::Complex;
use rand_distr::StandardNormal;

use crate::error::ProcessError;

/// Draws the next state by inverse-CDF over the cumulative row.
pub fn markov_step(cum: &CumulativeRows, from: usize, rng: &mut impl rand::Rng) -> usize {
    cum.sample(from, rng)
}

/// Draws the next state from holding-time ratios.
///
/// Builds the temporary row `Q[j] = hold[j][j] / hold[from][from]` for
/// `j != from` (zero at `from`), cumulates, normalizes by the final
/// cumulant, and draws by inverse-CDF. A vanishing row keeps the member
/// in place.
pub fn gillespie_step(holding: &Matrix, from: usize, rng: &mut impl rand::Rng) -> usize {
    let k = holding.nrows();
    let pivot = holding[(from, from)];
    if pivot.abs() < f64::MIN_POSITIVE {
        return from;
    }

    let mut q: Vec<f64> = (0..k)
        .map(|j| {
            if j == from {
                0.0
            } else {
                (holding[(j, j)] / pivot).max(0.0)
            }
        })
        .collect();
    kronos_numeric::cumsum_in_place(&mut q);

    let total = q[k - 1];
    if total <= 0.0 || !total.is_finite() {
        return from;
    }
    for x in q.iter_mut() {
        *x /= total;
    }

    let u: f64 = rng.random();
    pick(&q, u)
}

/// Metropolis-Hastings draw against a target density.
///
/// Proposes from the cumulative row of `proposal`, then accepts with
/// `min(1, (target[to]/target[from]) * (q(to,from)/q(from,to)))`; a
/// rejected proposal keeps the member in its current state.
pub fn metropolis_step(
    cum: &CumulativeRows,
    proposal: &Matrix,
    target: &[f64],
    from: usize,
    rng: &mut impl rand::Rng,
) -> usize {
    let to = cum.sample(from, rng);
    if to == from {
        return from;
    }

    let forward = proposal[(from, to)];
    let backward = proposal[(to, from)];
    if forward <= 0.0 || target[from] <= 0.0 {
        // Proposal mass arrived through rounding only; treat as accepted.
        return to;
    }

    let ratio = (target[to] / target[from]) * (backward / forward);
    let alpha = ratio.min(1.0);
    let u: f64 = rng.random();
    if u <= alpha { to } else { from }
}

/// Karhunen-Loeve Gaussian intensity generator.
///
/// Superposes eigenmode coefficients with random phases and returns the
/// squared modulus as the expected event count in one sample interval.
#[derive(Debug, Clone)]
pub struct GaussField {
    values: Vec<f64>,
    vectors: Vec<Vec<f64>>,
    reference: f64,
    dim: usize,
    mean: f64,
}

impl GaussField {
    /// Builds the generator from an eigendecomposition.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when value/vector counts disagree, a
    /// vector is shorter than `dim`, or `reference` is zero.
    pub fn new(
        values: Vec<f64>,
        vectors: Vec<Vec<f64>>,
        reference: f64,
        dim: usize,
        mean: f64,
    ) -> Result<Self, ProcessError> {
        if values.len() != vectors.len() {
            return Err(ProcessError::EigenShapeMismatch {
                values: values.len(),
                vectors: vectors.len(),
            });
        }
        for (index, v) in vectors.iter().enumerate() {
            if v.len() < dim {
                return Err(ProcessError::EigenvectorTooShort {
                    index,
                    len: v.len(),
                    dim,
                });
            }
        }
        if reference == 0.0 || !reference.is_finite() {
            return Err(ProcessError::BadParameter {
                name: "reference",
                value: reference,
                reason: "must be finite and non-zero",
            });
        }
        Ok(Self {
            values,
            vectors,
            reference,
            dim,
            mean,
        })
    }

    /// Expected events for the sample interval at step `step_index`.
    ///
    /// Past the temporal dimension the field is exhausted and the
    /// configured mean is returned directly.
    pub fn intensity(&self, step_index: usize, dt: f64, rng: &mut impl rand::Rng) -> f64 {
        if step_index >= self.dim {
            return self.mean;
        }
        let mut acc = Complex::new(0.0, 0.0);
        for (lambda, vector) in self.values.iter().zip(self.vectors.iter()) {
            let magnitude = (self.mean * lambda / self.reference).exp().sqrt();
            let phase: f64 = rng.random::<f64>() * PI;
            acc += Complex::from_polar(magnitude, phase) * vector[step_index];
        }
        acc.norm_sqr() * dt
    }

    /// The configured mean event count.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// The temporal dimension of the eigenbasis.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

/// Wiener (Brownian) walk sampled on a refined grid.
///
/// Each call folds `floor(M * t)` standard normal increments into the
/// caller's accumulated walk and reports the rescaled position
/// `walk / sqrt(M)`, with `M` the number of sub-steps per unit time.
#[derive(Debug, Clone, Copy)]
pub struct WienerWalk {
    steps_per_unit: f64,
}

impl WienerWalk {
    /// Creates the walk sampler.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::BadParameter`] unless `steps_per_unit` is
    /// finite and positive.
    pub fn new(steps_per_unit: f64) -> Result<Self, ProcessError> {
        if !steps_per_unit.is_finite() || steps_per_unit <= 0.0 {
            return Err(ProcessError::BadParameter {
                name: "steps_per_unit",
                value: steps_per_unit,
                reason: "must be finite and positive",
            });
        }
        Ok(Self { steps_per_unit })
    }

    /// Advances the accumulated walk for time `t` and returns the
    /// rescaled position.
    pub fn step(&self, walk: &mut f64, t: f64, rng: &mut impl rand::Rng) -> f64 {
        let count = (self.steps_per_unit * t).floor().max(0.0) as usize;
        for _ in 0..count {
            let z: f64 = rng.sample(StandardNormal);
            *walk += z;
        }
        *walk / self.steps_per_unit.sqrt()
    }
}

/// Ornstein-Uhlenbeck displacement via a time-changed Brownian walk.
///
/// Maintains its own driving walk history; each step appends one normal
/// increment, looks the history up at the exponentially dilated index
/// `floor(e^{2 theta t} - 1)`, and damps by `a e^{-theta t}` with
/// `a = sigma / sqrt(2 theta)`.
#[derive(Debug, Clone)]
pub struct OrnsteinProcess {
    theta: f64,
    amplitude: f64,
    walk: f64,
    history: Vec<f64>,
}

impl OrnsteinProcess {
    /// Creates the process from the reversion rate and noise scale.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::BadParameter`] unless both parameters are
    /// finite and positive.
    pub fn new(theta: f64, sigma: f64) -> Result<Self, ProcessError> {
        if !theta.is_finite() || theta <= 0.0 {
            return Err(ProcessError::BadParameter {
                name: "theta",
                value: theta,
                reason: "must be finite and positive",
            });
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(ProcessError::BadParameter {
                name: "sigma",
                value: sigma,
                reason: "must be finite and positive",
            });
        }
        Ok(Self {
            theta,
            amplitude: sigma / (2.0 * theta).sqrt(),
            walk: 0.0,
            history: Vec::new(),
        })
    }

    /// The stationary amplitude `sigma / sqrt(2 theta)`.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Advances the driving walk and returns the displacement at `t`.
    pub fn step(&mut self, t: f64, rng: &mut impl rand::Rng) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.walk += z;
        self.history.push(self.walk);

        let dilated = ((2.0 * self.theta * t).exp() - 1.0).floor();
        let w = if dilated >= 0.0 && (dilated as usize) < self.history.len() {
            self.history[dilated as usize]
        } else {
            0.0
        };
        self.amplitude * (-self.theta * t).exp() * w
    }
}

//! Per-state observation emission: multivariate normal mixtures over a
//! product-space grid.

use kronos_linalg::{Matrix, Vector};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::ProcessError;

/// Diagonal bump applied when a user covariance narrowly fails to factor.
const CHOLESKY_JITTER: f64 = 1e-9;
const CHOLESKY_RETRIES: usize = 3;

/// A multivariate normal sampler backed by a Cholesky factor.
#[derive(Debug, Clone)]
pub struct MvNormal {
    mu: Vector,
    chol: Matrix,
}

impl MvNormal {
    /// Builds the sampler from a mean and full covariance.
    ///
    /// A covariance that narrowly fails to factor gets a tiny diagonal
    /// bump before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::NotPositiveDefinite`] when the covariance
    /// cannot be factorized, or a shape error when `sigma` is not square
    /// of the mean's dimension.
    pub fn new(component: usize, mu: Vec<f64>, sigma: Vec<Vec<f64>>) -> Result<Self, ProcessError> {
        let d = mu.len();
        if sigma.len() != d || sigma.iter().any(|row| row.len() != d) {
            return Err(ProcessError::MomentShapeMismatch {
                reason: format!("component {component}: mean has dimension {d}, covariance does not"),
            });
        }

        let mut cov = Matrix::from_fn(d, d, |i, j| sigma[i][j]);
        for attempt in 0..=CHOLESKY_RETRIES {
            if let Some(chol) = cov.clone().cholesky() {
                return Ok(Self {
                    mu: Vector::from_vec(mu),
                    chol: chol.l(),
                });
            }
            let bump = CHOLESKY_JITTER * 10f64.powi(attempt as i32);
            debug!(component, bump, "covariance failed to factor; bumping diagonal");
            for i in 0..d {
                cov[(i, i)] += bump;
            }
        }
        Err(ProcessError::NotPositiveDefinite { component })
    }

    /// Builds the sampler directly from a lower-triangular factor.
    pub(crate) fn from_factor(mu: Vector, chol: Matrix) -> Self {
        Self { mu, chol }
    }

    /// Dimension of the observation space.
    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// The mean vector.
    pub fn mu(&self) -> &[f64] {
        self.mu.as_slice()
    }

    /// Draws one observation: `mu + L z` with `z` standard normal.
    pub fn sample(&self, rng: &mut impl rand::Rng) -> Vec<f64> {
        let d = self.dim();
        let z = Vector::from_fn(d, |_, _| rng.sample::<f64, _>(StandardNormal));
        (&self.mu + &self.chol * z).iter().copied().collect()
    }
}

/// One multivariate normal sampler per discrete state.
#[derive(Debug, Clone)]
pub struct EmissionModel {
    components: Vec<MvNormal>,
    dims: Option<Vec<usize>>,
}

impl EmissionModel {
    /// Builds default emission moments over a product-space grid.
    ///
    /// The grid enumerates `[0, dims[0]) x [0, dims[1]) x …`; state `k`
    /// emits around the `k`-th grid point offset to its cell centre
    /// (`+ 1/2` per coordinate). Covariances are `(L L^T)` scaled
    /// element-wise by `w w^T`, with `L` random lower-triangular in
    /// `[0, 1)` and `w` the user weights, drawn fresh per state. The
    /// product is assembled directly as the factor `diag(w) L`, with the
    /// diagonal of `L` kept away from zero so every factor is regular.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::WeightDimensionMismatch`] when the weight
    /// count differs from the grid dimensionality.
    pub fn from_grid(
        dims: &[usize],
        weights: &[f64],
        rng: &mut impl rand::Rng,
    ) -> Result<Self, ProcessError> {
        if weights.len() != dims.len() {
            return Err(ProcessError::WeightDimensionMismatch {
                weights: weights.len(),
                dims: dims.len(),
            });
        }
        let d = dims.len();
        let grid = kronos_numeric::permutations(dims);

        let mut components = Vec::with_capacity(grid.len());
        for point in &grid {
            let mu = Vector::from_fn(d, |i, _| point[i] as f64 + 0.5);
            let mut factor = Matrix::zeros(d, d);
            for i in 0..d {
                for j in 0..=i {
                    let draw: f64 = rng.random();
                    let entry = if i == j { draw.max(1e-3) } else { draw };
                    factor[(i, j)] = weights[i] * entry;
                }
            }
            components.push(MvNormal::from_factor(mu, factor));
        }
        Ok(Self {
            components,
            dims: Some(dims.to_vec()),
        })
    }

    /// Builds the model from explicit per-state moments.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the moment shapes disagree or a
    /// covariance is not positive definite.
    pub fn from_moments(
        mu: Vec<Vec<f64>>,
        sigma: Vec<Vec<Vec<f64>>>,
    ) -> Result<Self, ProcessError> {
        if mu.len() != sigma.len() {
            return Err(ProcessError::MomentShapeMismatch {
                reason: format!("{} means but {} covariances", mu.len(), sigma.len()),
            });
        }
        let components = mu
            .into_iter()
            .zip(sigma)
            .enumerate()
            .map(|(k, (m, s))| MvNormal::new(k, m, s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            components,
            dims: None,
        })
    }

    /// Number of emitting states.
    pub fn k(&self) -> usize {
        self.components.len()
    }

    /// Dimension of the observation space, 0 when empty.
    pub fn dim(&self) -> usize {
        self.components.first().map_or(0, MvNormal::dim)
    }

    /// The grid dimensions, when the model was grid-built.
    pub fn dims(&self) -> Option<&[usize]> {
        self.dims.as_deref()
    }

    /// The sampler for one state.
    pub fn component(&self, state: usize) -> &MvNormal {
        &self.components[state]
    }

    /// Draws one observation for the given state.
    pub fn sample(&self, state: usize, rng: &mut impl rand::Rng) -> Vec<f64> {
        self.components[state].sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // 1. grid_component_count_and_centres
    #[test]
    fn grid_component_count_and_centres() {
        let mut rng = StdRng::seed_from_u64(42);
        let model = EmissionModel::from_grid(&[2, 3], &[1.0, 1.0], &mut rng).unwrap();
        assert_eq!(model.k(), 6);
        assert_eq!(model.dim(), 2);
        assert_eq!(model.dims(), Some(&[2usize, 3][..]));

        // State 0 sits at the centre of cell (0, 0).
        assert!((model.component(0).mu()[0] - 0.5).abs() < 1e-12);
        assert!((model.component(0).mu()[1] - 0.5).abs() < 1e-12);
        // State 1 advances the least-significant coordinate first.
        assert!((model.component(1).mu()[0] - 1.5).abs() < 1e-12);
        assert!((model.component(1).mu()[1] - 0.5).abs() < 1e-12);
    }

    // 2. grid_weight_mismatch
    #[test]
    fn grid_weight_mismatch() {
        let mut rng = StdRng::seed_from_u64(42);
        let err = EmissionModel::from_grid(&[2, 3], &[1.0], &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::WeightDimensionMismatch { weights: 1, dims: 2 }
        ));
    }

    // 3. samples_cluster_around_mean
    #[test]
    fn samples_cluster_around_mean() {
        let model = EmissionModel::from_moments(
            vec![vec![5.0, -2.0]],
            vec![vec![vec![0.04, 0.0], vec![0.0, 0.04]]],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let n = 5000;
        let mut sums = [0.0f64; 2];
        for _ in 0..n {
            let x = model.sample(0, &mut rng);
            sums[0] += x[0];
            sums[1] += x[1];
        }
        assert!((sums[0] / n as f64 - 5.0).abs() < 0.05);
        assert!((sums[1] / n as f64 + 2.0).abs() < 0.05);
    }

    // 4. moments_shape_mismatch
    #[test]
    fn moments_shape_mismatch() {
        let err =
            EmissionModel::from_moments(vec![vec![0.0]], vec![]).unwrap_err();
        assert!(matches!(err, ProcessError::MomentShapeMismatch { .. }));

        let err = EmissionModel::from_moments(
            vec![vec![0.0, 0.0]],
            vec![vec![vec![1.0]]],
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::MomentShapeMismatch { .. }));
    }

    // 5. non_positive_definite_rejected
    #[test]
    fn non_positive_definite_rejected() {
        // Negative-definite covariance cannot be rescued by jitter.
        let err = EmissionModel::from_moments(
            vec![vec![0.0, 0.0]],
            vec![vec![vec![-1.0, 0.0], vec![0.0, -1.0]]],
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::NotPositiveDefinite { component: 0 }));
    }

    // 6. sample_variance_tracks_covariance
    #[test]
    fn sample_variance_tracks_covariance() {
        let model = EmissionModel::from_moments(
            vec![vec![0.0]],
            vec![vec![vec![4.0]]],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(31);
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| model.sample(0, &mut rng)[0]).collect();
        let mean: f64 = xs.iter().sum::<f64>() / n as f64;
        let var: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64;
        assert!((var - 4.0).abs() < 0.2, "sample variance {var}, expected ~4");
    }
}

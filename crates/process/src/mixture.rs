//! Gaussian-mixture fitting over accumulated observations.
//!
//! Expectation-maximization with diagonal covariances. The component
//! count comes from the caller (one component per discrete state when
//! fitting emission mixtures).

use statrs::distribution::{Continuous, Normal};

use crate::error::ProcessError;

/// Smallest variance a component dimension may collapse to.
const VARIANCE_FLOOR: f64 = 1e-6;
/// Relative log-likelihood change below which iteration stops.
const CONVERGENCE_TOL: f64 = 1e-8;

/// One fitted mixture component with diagonal covariance.
#[derive(Debug, Clone)]
pub struct MixtureComponent {
    /// Mixing weight; the weights of a fit sum to 1.
    pub weight: f64,
    /// Component mean, one entry per observation dimension.
    pub mean: Vec<f64>,
    /// Per-dimension variance.
    pub variance: Vec<f64>,
}

/// Fits a `k`-component Gaussian mixture to the observations.
///
/// Components are initialized on evenly spaced observations (after
/// sorting by first coordinate) with the global per-dimension variance,
/// then refined by EM until the log-likelihood stabilizes or `max_iter`
/// passes complete.
///
/// # Errors
///
/// Returns [`ProcessError`] when the observation list is empty, the
/// dimensions are inconsistent, or `k` exceeds the observation count.
pub fn fit_mixture(
    observations: &[Vec<f64>],
    k: usize,
    max_iter: usize,
) -> Result<Vec<MixtureComponent>, ProcessError> {
    let n = observations.len();
    if n == 0 {
        return Err(ProcessError::EmptyObservations);
    }
    if k == 0 || k > n {
        return Err(ProcessError::BadComponentCount { k, n });
    }
    let d = observations[0].len();
    for (index, obs) in observations.iter().enumerate() {
        if obs.len() != d {
            return Err(ProcessError::ObservationDimensionMismatch {
                index,
                got: obs.len(),
                expected: d,
            });
        }
    }

    let mut components = initialize(observations, k, d);
    let mut responsibilities = vec![vec![0.0; k]; n];
    let mut last_loglik = f64::NEG_INFINITY;

    for _ in 0..max_iter {
        // E-step: posterior responsibility of each component per point.
        let mut loglik = 0.0;
        for (obs, resp) in observations.iter().zip(responsibilities.iter_mut()) {
            let mut total = 0.0;
            for (c, r) in components.iter().zip(resp.iter_mut()) {
                *r = c.weight * density(c, obs);
                total += *r;
            }
            if total <= 0.0 {
                // Point unreachable by every component; spread it evenly.
                resp.fill(1.0 / k as f64);
                total = f64::MIN_POSITIVE;
            } else {
                for r in resp.iter_mut() {
                    *r /= total;
                }
            }
            loglik += total.ln();
        }

        // M-step: reweight, recentre, respread.
        for (j, c) in components.iter_mut().enumerate() {
            let mass: f64 = responsibilities.iter().map(|r| r[j]).sum();
            c.weight = mass / n as f64;
            if mass <= 0.0 {
                continue;
            }
            for dim in 0..d {
                let mean = observations
                    .iter()
                    .zip(responsibilities.iter())
                    .map(|(obs, r)| r[j] * obs[dim])
                    .sum::<f64>()
                    / mass;
                let var = observations
                    .iter()
                    .zip(responsibilities.iter())
                    .map(|(obs, r)| r[j] * (obs[dim] - mean) * (obs[dim] - mean))
                    .sum::<f64>()
                    / mass;
                c.mean[dim] = mean;
                c.variance[dim] = var.max(VARIANCE_FLOOR);
            }
        }

        if (loglik - last_loglik).abs() < CONVERGENCE_TOL * (1.0 + loglik.abs()) {
            break;
        }
        last_loglik = loglik;
    }

    Ok(components)
}

/// Product of per-dimension normal densities.
fn density(c: &MixtureComponent, obs: &[f64]) -> f64 {
    let mut p = 1.0;
    for ((&x, &m), &v) in obs.iter().zip(c.mean.iter()).zip(c.variance.iter()) {
        // Variances are floored, so the constructor cannot fail.
        let normal = Normal::new(m, v.sqrt()).expect("variance is positive");
        p *= normal.pdf(x);
    }
    p
}

fn initialize(observations: &[Vec<f64>], k: usize, d: usize) -> Vec<MixtureComponent> {
    let n = observations.len();

    // Global per-dimension variance as the starting spread.
    let mut global_mean = vec![0.0; d];
    for obs in observations {
        for (g, &x) in global_mean.iter_mut().zip(obs.iter()) {
            *g += x / n as f64;
        }
    }
    let mut global_var = vec![0.0; d];
    for obs in observations {
        for (g, (&x, &m)) in global_var.iter_mut().zip(obs.iter().zip(global_mean.iter())) {
            *g += (x - m) * (x - m) / n as f64;
        }
    }
    for v in global_var.iter_mut() {
        *v = v.max(VARIANCE_FLOOR);
    }

    // Seed means on evenly spaced points of the first-coordinate ordering.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        observations[a][0]
            .partial_cmp(&observations[b][0])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    (0..k)
        .map(|j| {
            let pick = order[j * (n - 1) / k.max(1)];
            MixtureComponent {
                weight: 1.0 / k as f64,
                mean: observations[pick].clone(),
                variance: global_var.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    fn two_cluster_data(seed: u64, n_per: usize) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let lo = NormalDist::new(0.0, 0.5).unwrap();
        let hi = NormalDist::new(10.0, 0.5).unwrap();
        let mut data = Vec::with_capacity(2 * n_per);
        for _ in 0..n_per {
            data.push(vec![lo.sample(&mut rng)]);
            data.push(vec![hi.sample(&mut rng)]);
        }
        data
    }

    // 1. recovers_two_separated_clusters
    #[test]
    fn recovers_two_separated_clusters() {
        let data = two_cluster_data(42, 500);
        let mut comps = fit_mixture(&data, 2, 200).unwrap();
        comps.sort_by(|a, b| a.mean[0].partial_cmp(&b.mean[0]).unwrap());

        assert!((comps[0].mean[0] - 0.0).abs() < 0.2, "low mean {}", comps[0].mean[0]);
        assert!((comps[1].mean[0] - 10.0).abs() < 0.2, "high mean {}", comps[1].mean[0]);
        assert!((comps[0].weight - 0.5).abs() < 0.05);
        let weight_sum: f64 = comps.iter().map(|c| c.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    // 2. single_component_matches_moments
    #[test]
    fn single_component_matches_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = NormalDist::new(3.0, 2.0).unwrap();
        let data: Vec<Vec<f64>> = (0..2000).map(|_| vec![dist.sample(&mut rng)]).collect();
        let comps = fit_mixture(&data, 1, 50).unwrap();

        assert!((comps[0].weight - 1.0).abs() < 1e-9);
        assert!((comps[0].mean[0] - 3.0).abs() < 0.2);
        assert!((comps[0].variance[0] - 4.0).abs() < 0.5);
    }

    // 3. rejects_bad_inputs
    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            fit_mixture(&[], 2, 10),
            Err(ProcessError::EmptyObservations)
        ));
        assert!(matches!(
            fit_mixture(&[vec![1.0]], 2, 10),
            Err(ProcessError::BadComponentCount { k: 2, n: 1 })
        ));
        assert!(matches!(
            fit_mixture(&[vec![1.0], vec![1.0, 2.0]], 1, 10),
            Err(ProcessError::ObservationDimensionMismatch { index: 1, .. })
        ));
    }

    // 4. degenerate_data_hits_variance_floor
    #[test]
    fn degenerate_data_hits_variance_floor() {
        let data = vec![vec![2.0]; 50];
        let comps = fit_mixture(&data, 1, 20).unwrap();
        assert!((comps[0].mean[0] - 2.0).abs() < 1e-9);
        assert!(comps[0].variance[0] >= VARIANCE_FLOOR);
    }

    // 5. multivariate_fit
    #[test]
    fn multivariate_fit() {
        let mut rng = StdRng::seed_from_u64(99);
        let a = NormalDist::new(0.0, 0.3).unwrap();
        let b = NormalDist::new(5.0, 0.3).unwrap();
        let data: Vec<Vec<f64>> = (0..600)
            .map(|i| {
                if i % 2 == 0 {
                    vec![a.sample(&mut rng), a.sample(&mut rng)]
                } else {
                    vec![b.sample(&mut rng), b.sample(&mut rng)]
                }
            })
            .collect();
        let mut comps = fit_mixture(&data, 2, 100).unwrap();
        comps.sort_by(|x, y| x.mean[0].partial_cmp(&y.mean[0]).unwrap());
        assert!(comps[0].mean.iter().all(|m| m.abs() < 0.3));
        assert!(comps[1].mean.iter().all(|m| (m - 5.0).abs() < 0.3));
    }
}

//! Batch and end-of-run statistics: histograms, MLEs, coherence.

use kronos_chain::TransitionMatrix;
use kronos_linalg::Matrix;

/// Histogram of floored member counts.
///
/// `F[m]` counts the members whose accumulated count floors to `m`; the
/// histogram spans `0 ..= floor(max)`. Negative or non-finite counts are
/// clamped to bin 0.
pub fn count_frequency(counts: &[f64]) -> Vec<u64> {
    let top = kronos_numeric::max(counts).floor().max(0.0) as usize;
    let mut freq = vec![0u64; top + 1];
    for &c in counts {
        let bin = if c.is_finite() && c > 0.0 {
            (c.floor() as usize).min(top)
        } else {
            0
        };
        freq[bin] += 1;
    }
    freq
}

/// The histogram normalized to probabilities. Empty input stays empty.
pub fn count_probability(freq: &[u64]) -> Vec<f64> {
    let total: u64 = freq.iter().sum();
    if total == 0 {
        return vec![0.0; freq.len()];
    }
    freq.iter().map(|&f| f as f64 / total as f64).collect()
}

/// Holding-time MLE per (from, to): accumulated hold over jump count.
///
/// Cells with no observed jumps, and the diagonal, are zero.
pub fn holding_mle(cum_hold: &Matrix, cum_jumps: &Matrix) -> Vec<Vec<f64>> {
    let k = cum_hold.nrows();
    (0..k)
        .map(|i| {
            (0..k)
                .map(|j| {
                    let n = cum_jumps[(i, j)];
                    if i == j || n <= 0.0 {
                        0.0
                    } else {
                        cum_hold[(i, j)] / n
                    }
                })
                .collect()
        })
        .collect()
}

/// Transition-probability MLE: pair counts normalized per source row.
///
/// A source state that was never observed yields a zero row.
pub fn transition_mle(transitions: &Matrix) -> Vec<Vec<f64>> {
    let k = transitions.nrows();
    (0..k)
        .map(|i| {
            let row_sum: f64 = (0..k).map(|j| transitions[(i, j)]).sum();
            (0..k)
                .map(|j| {
                    if row_sum > 0.0 {
                        transitions[(i, j)] / row_sum
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Relative error of the MLE against the declared law, probed at the
/// `(0, 0)` cell. `None` without a declared law or with a zero anchor.
pub fn relative_error(mle: &[Vec<f64>], declared: Option<&TransitionMatrix>) -> Option<f64> {
    let tm = declared?;
    if tm.k() == 0 || mle.is_empty() {
        return None;
    }
    let anchor = tm.prob(0, 0);
    if anchor == 0.0 {
        return None;
    }
    Some((mle[0][0] - anchor).abs() / anchor)
}

/// Integrated normalized autocorrelation.
///
/// `Tc = (dt / (2 gamma[0])) * Σ_τ |gamma[τ]| (1 - τ/T)` over the
/// recorded trace of length `T`. Zero when the trace is empty or the
/// zero-lag value vanishes.
pub fn coherence_time(gamma: &[f64], dt: f64) -> f64 {
    let t = gamma.len();
    if t == 0 || gamma[0] == 0.0 {
        return 0.0;
    }
    let weighted: f64 = gamma
        .iter()
        .enumerate()
        .map(|(tau, g)| g.abs() * (1.0 - tau as f64 / t as f64))
        .sum();
    dt / (2.0 * gamma[0]) * weighted
}

/// Rounds a count matrix into nested integer rows for serialization.
pub fn matrix_to_counts(m: &Matrix) -> Vec<Vec<u64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)].round() as u64).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kronos_chain::TransitionSpec;

    // 1. count_frequency_bins
    #[test]
    fn count_frequency_bins() {
        let freq = count_frequency(&[0.0, 0.9, 1.1, 2.0, 2.7]);
        assert_eq!(freq, vec![2, 1, 2]);
        // Length is floor(max) + 1.
        assert_eq!(freq.len(), 3);
    }

    // 2. count_frequency_all_zero
    #[test]
    fn count_frequency_all_zero() {
        assert_eq!(count_frequency(&[0.0, 0.0]), vec![2]);
        assert_eq!(count_frequency(&[]), vec![0]);
    }

    // 3. count_probability_normalizes
    #[test]
    fn count_probability_normalizes() {
        let prob = count_probability(&[2, 1, 1]);
        assert!((prob[0] - 0.5).abs() < 1e-12);
        let total: f64 = prob.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    // 4. holding_mle_ratios
    #[test]
    fn holding_mle_ratios() {
        let mut hold = Matrix::zeros(2, 2);
        let mut jumps = Matrix::zeros(2, 2);
        hold[(0, 1)] = 6.0;
        jumps[(0, 1)] = 3.0;
        hold[(1, 1)] = 99.0; // diagonal is ignored
        jumps[(1, 1)] = 1.0;

        let mle = holding_mle(&hold, &jumps);
        assert!((mle[0][1] - 2.0).abs() < 1e-12);
        assert_eq!(mle[1][1], 0.0);
        // Unobserved cell degrades to zero rather than dividing by zero.
        assert_eq!(mle[1][0], 0.0);
    }

    // 5. transition_mle_normalizes_rows
    #[test]
    fn transition_mle_normalizes_rows() {
        let mut t = Matrix::zeros(2, 2);
        t[(0, 0)] = 10.0;
        t[(0, 1)] = 90.0;
        let mle = transition_mle(&t);
        assert!((mle[0][0] - 0.1).abs() < 1e-12);
        assert!((mle[0][1] - 0.9).abs() < 1e-12);
        // Empty source row stays zero.
        assert_eq!(mle[1], vec![0.0, 0.0]);
    }

    // 6. relative_error_anchor
    #[test]
    fn relative_error_anchor() {
        let tm = TransitionMatrix::resolve(&TransitionSpec::Dense(vec![
            vec![0.1, 0.9],
            vec![0.1, 0.9],
        ]))
        .unwrap();
        let mle = vec![vec![0.11, 0.89], vec![0.1, 0.9]];
        let err = relative_error(&mle, Some(&tm)).unwrap();
        assert!((err - 0.1).abs() < 1e-9);
        assert!(relative_error(&mle, None).is_none());
    }

    // 7. coherence_time_of_flat_trace
    #[test]
    fn coherence_time_of_flat_trace() {
        // Constant gamma = 1 over T steps: sum of (1 - tau/T) = (T+1)/2.
        let gamma = vec![1.0; 10];
        let tc = coherence_time(&gamma, 0.5);
        let expected = 0.5 / 2.0 * (10.0 + 1.0) / 2.0 * 1.0;
        assert!((tc - expected).abs() < 1e-9, "tc = {tc}, expected {expected}");
    }

    // 8. coherence_time_guards
    #[test]
    fn coherence_time_guards() {
        assert_eq!(coherence_time(&[], 1.0), 0.0);
        assert_eq!(coherence_time(&[0.0, 1.0], 1.0), 0.0);
    }

    // 9. matrix_to_counts_rounds
    #[test]
    fn matrix_to_counts_rounds() {
        let mut m = Matrix::zeros(1, 2);
        m[(0, 0)] = 3.0;
        m[(0, 1)] = 4.0;
        assert_eq!(matrix_to_counts(&m), vec![vec![3, 4]]);
    }
}

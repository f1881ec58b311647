//! Numeric helper functions for the Kronos process engine.

/// Draws an exponential deviate with the given mean via inverse transform.
///
/// Uses `-mean * ln(U)` with `U ~ Uniform(0, 1)`. The uniform draw is
/// nudged away from zero so the logarithm stays finite.
pub fn exp_deviate(mean: f64, rng: &mut impl rand::Rng) -> f64 {
    let u: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    -mean * u.ln()
}

/// Sum of a slice. Returns 0.0 if empty.
pub fn sum(data: &[f64]) -> f64 {
    data.iter().sum()
}

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    sum(data) / data.len() as f64
}

/// Maximum of a slice, ignoring NaN. Returns 0.0 if empty or all-NaN.
pub fn max(data: &[f64]) -> f64 {
    let m = data
        .iter()
        .copied()
        .filter(|x| !x.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);
    if m == f64::NEG_INFINITY { 0.0 } else { m }
}

/// Replaces each element with the running sum of the prefix ending there.
pub fn cumsum_in_place(data: &mut [f64]) {
    let mut acc = 0.0;
    for x in data.iter_mut() {
        acc += *x;
        *x = acc;
    }
}

/// Converts mixed-radix digits (least-significant first) to a flat index.
///
/// `index = Σ_d digits[d] · Π_{d' < d} radices[d']`.
///
/// # Panics
///
/// Panics if `digits` and `radices` differ in length.
pub fn mixed_radix_index(digits: &[usize], radices: &[usize]) -> usize {
    assert_eq!(
        digits.len(),
        radices.len(),
        "digit count {} does not match radix count {}",
        digits.len(),
        radices.len()
    );
    let mut index = 0;
    let mut stride = 1;
    for (&d, &r) in digits.iter().zip(radices.iter()) {
        index += d * stride;
        stride *= r;
    }
    index
}

/// Decomposes a flat index into mixed-radix digits (least-significant first).
pub fn mixed_radix_digits(mut index: usize, radices: &[usize]) -> Vec<usize> {
    let mut digits = Vec::with_capacity(radices.len());
    for &r in radices {
        digits.push(index % r);
        index /= r;
    }
    digits
}

/// Enumerates the Cartesian product `[0, radices[0]) × [0, radices[1]) × …`.
///
/// Points are returned in mixed-radix order: the first coordinate varies
/// fastest. An empty radix list yields a single empty point.
pub fn permutations(radices: &[usize]) -> Vec<Vec<usize>> {
    let total: usize = radices.iter().product();
    (0..total).map(|i| mixed_radix_digits(i, radices)).collect()
}

/// Enumerates the Cartesian product with each coordinate passed through `f`.
///
/// `f` receives the coordinate value and the radix of its dimension, so a
/// callback like `|i, max| i as f64 / max as f64` maps every component
/// into `[0, 1)`.
pub fn permutations_mapped(radices: &[usize], f: impl Fn(usize, usize) -> f64) -> Vec<Vec<f64>> {
    permutations(radices)
        .into_iter()
        .map(|point| {
            point
                .iter()
                .zip(radices.iter())
                .map(|(&i, &r)| f(i, r))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // 1. exp_deviate_mean_convergence
    #[test]
    fn exp_deviate_mean_convergence() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let mu = 2.5;
        let total: f64 = (0..n).map(|_| exp_deviate(mu, &mut rng)).sum();
        let sample_mean = total / n as f64;
        // Standard error is mu / sqrt(n); allow 4 sigma.
        let tol = 4.0 * mu / (n as f64).sqrt();
        assert!(
            (sample_mean - mu).abs() < tol,
            "sample mean {sample_mean}, expected ~{mu} (tol {tol})"
        );
    }

    // 2. exp_deviate_positive
    #[test]
    fn exp_deviate_positive() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(exp_deviate(1.0, &mut rng) >= 0.0);
        }
    }

    // 3. reductions
    #[test]
    fn reductions() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert!((sum(&data) - 10.0).abs() < 1e-12);
        assert!((mean(&data) - 2.5).abs() < 1e-12);
        assert!((max(&data) - 4.0).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sum(&[]), 0.0);
    }

    // 4. cumsum_basic
    #[test]
    fn cumsum_basic() {
        let mut data = [0.25, 0.25, 0.5];
        cumsum_in_place(&mut data);
        assert!((data[0] - 0.25).abs() < 1e-12);
        assert!((data[1] - 0.5).abs() < 1e-12);
        assert!((data[2] - 1.0).abs() < 1e-12);
    }

    // 5. cumsum_empty
    #[test]
    fn cumsum_empty() {
        let mut data: [f64; 0] = [];
        cumsum_in_place(&mut data);
    }

    // 6. mixed_radix_round_trip
    #[test]
    fn mixed_radix_round_trip() {
        let radices = [2, 6, 4];
        for i in 0..48 {
            let digits = mixed_radix_digits(i, &radices);
            assert_eq!(mixed_radix_index(&digits, &radices), i);
        }
    }

    // 7. permutations_count_and_range
    #[test]
    fn permutations_count_and_range() {
        let radices = [2, 6, 4];
        let points = permutations(&radices);
        assert_eq!(points.len(), 48);

        // All distinct.
        let mut seen = std::collections::BTreeSet::new();
        for p in &points {
            assert!(seen.insert(p.clone()), "duplicate point {p:?}");
            for (d, &r) in p.iter().zip(radices.iter()) {
                assert!(*d < r, "component {d} out of range for radix {r}");
            }
        }
    }

    // 8. permutations_mapped_normalized
    #[test]
    fn permutations_mapped_normalized() {
        let radices = [2, 6, 4];
        let points = permutations_mapped(&radices, |i, max| i as f64 / max as f64);
        assert_eq!(points.len(), 48);
        for p in &points {
            for &x in p {
                assert!((0.0..1.0).contains(&x), "component {x} not in [0, 1)");
            }
        }
    }

    // 9. permutations_empty_dims
    #[test]
    fn permutations_empty_dims() {
        let points = permutations(&[]);
        assert_eq!(points.len(), 1);
        assert!(points[0].is_empty());
    }
}

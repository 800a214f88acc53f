// k-sample Anderson-Darling test (k = 2) on binned data
//
// Scholz & Stephens (1987), "K-Sample Anderson-Darling Tests", JASA 82.
// Binned contents are tied observations at the bin position, so the midrank
// statistic A2akN applies directly with the bin as the distinct value.
//
// The reported statistic is the standardised (A2 - (k - 1)) / sigma. The p-value
// is interpolated from the tabulated critical values with a quadratic fit in
// log(significance) and is capped to the table range [0.001, 0.25].

use super::{check_pair, positive_totals, Budget, Result, StatError, StatTest, TestStatistic};

const SIGNIFICANCE: [f64; 7] = [0.25, 0.1, 0.05, 0.025, 0.01, 0.005, 0.001];
const B0: [f64; 7] = [0.675, 1.281, 1.645, 1.96, 2.326, 2.573, 3.085];
const B1: [f64; 7] = [-0.245, 0.25, 0.678, 1.149, 1.822, 2.364, 3.615];
const B2: [f64; 7] = [-0.105, -0.305, -0.362, -0.391, -0.396, -0.345, -0.154];

/// Standardised two-sample Anderson-Darling statistic with its p-value
///
/// # Example
/// ```
/// use histcmp::metrics::anderson_darling;
///
/// let left = [10.0, 40.0, 80.0, 40.0, 10.0];
/// let right = [40.0, 80.0, 40.0, 10.0, 10.0];
/// let result = anderson_darling(&left, &right).unwrap();
/// assert!(result.pvalue <= 0.01);
/// ```
pub fn anderson_darling(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;
    let (n1, n2) = positive_totals(left, right)?;

    let occupied = left
        .iter()
        .zip(right)
        .filter(|(&u, &v)| u + v > 0.0)
        .count();
    if occupied < 2 {
        return Err(StatError::Degenerate(
            "all observations fall in a single bin".to_string(),
        ));
    }

    let a2 = midrank_statistic(left, right, n1, n2);
    let sigma = statistic_sigma(n1, n2)?;
    let statistic = (a2 - 1.0) / sigma;
    let pvalue = interpolate_pvalue(statistic);

    Ok(TestStatistic { statistic, pvalue })
}

/// A2akN for two samples of binned counts
fn midrank_statistic(left: &[f64], right: &[f64], n1: f64, n2: f64) -> f64 {
    let total = n1 + n2;
    let sizes = [n1, n2];
    let mut cum_pooled = 0.0;
    let mut cum = [0.0, 0.0];
    let mut sum = 0.0;

    for (&u, &v) in left.iter().zip(right) {
        let tied = u + v;
        if tied <= 0.0 {
            continue;
        }

        let b = cum_pooled + tied / 2.0;
        let denom = b * (total - b) - total * tied / 4.0;

        for (i, count) in [u, v].into_iter().enumerate() {
            let m = cum[i] + count / 2.0;
            sum += tied / total * (total * m - b * sizes[i]).powi(2) / denom / sizes[i];
        }

        cum_pooled += tied;
        cum[0] += u;
        cum[1] += v;
    }

    sum * (total - 1.0) / total
}

/// Pooled observation count above which the harmonic sums use their
/// asymptotic expansions
const EXACT_HARMONIC_LIMIT: f64 = 1.0e4;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Harmonic number H_n
fn harmonic(n: f64) -> f64 {
    if n < EXACT_HARMONIC_LIMIT {
        return (1..=n as u64).map(|i| 1.0 / i as f64).sum();
    }
    n.ln() + EULER_GAMMA + 1.0 / (2.0 * n) - 1.0 / (12.0 * n.powi(2)) + 1.0 / (120.0 * n.powi(4))
}

/// Second-order harmonic number sum 1/i^2 for i = 1..=n
fn harmonic_squares(n: f64) -> f64 {
    if n < EXACT_HARMONIC_LIMIT {
        return (1..=n as u64).map(|i| 1.0 / (i as f64).powi(2)).sum();
    }
    std::f64::consts::PI.powi(2) / 6.0 - 1.0 / n + 1.0 / (2.0 * n.powi(2))
        - 1.0 / (6.0 * n.powi(3))
        + 1.0 / (30.0 * n.powi(5))
}

/// Standard deviation of A2akN under the null hypothesis (k = 2)
///
/// The harmonic sums run over the pooled observation count, so weighted
/// contents are rounded to the nearest whole observation. With
/// `h = H(N-1)` the double sum `g = sum_{i<j<N} 1/((N-i) j)` reduces to
/// `H2(N) - 2 h / N - 1 / N^2`, which keeps the cost independent of N.
fn statistic_sigma(n1: f64, n2: f64) -> Result<f64> {
    let k = 2.0;
    let total = (n1 + n2).round();
    if total < 4.0 {
        return Err(StatError::Degenerate(format!(
            "need at least 4 observations, got {}",
            total
        )));
    }

    let big_h = 1.0 / n1 + 1.0 / n2;
    let h = harmonic(total - 1.0);
    let g = harmonic_squares(total) - 2.0 * h / total - 1.0 / total.powi(2);

    let a = (4.0 * g - 6.0) * (k - 1.0) + (10.0 - 6.0 * g) * big_h;
    let b = (2.0 * g - 4.0) * k * k + 8.0 * h * k + (2.0 * g - 14.0 * h - 4.0) * big_h - 8.0 * h
        + 4.0 * g
        - 6.0;
    let c = (6.0 * h + 2.0 * g - 2.0) * k * k + (4.0 * h - 4.0 * g + 6.0) * k
        + (2.0 * h - 6.0) * big_h
        + 4.0 * h;
    let d = (2.0 * h + 6.0) * k * k - 4.0 * h * k;

    let variance = (a * total.powi(3) + b * total.powi(2) + c * total + d)
        / ((total - 1.0) * (total - 2.0) * (total - 3.0));
    if variance <= 0.0 {
        return Err(StatError::Degenerate(format!(
            "non-positive variance {}",
            variance
        )));
    }

    Ok(variance.sqrt())
}

/// Critical values for k - 1 = 1 degrees of freedom
fn critical_values() -> [f64; 7] {
    let m: f64 = 1.0;
    std::array::from_fn(|i| B0[i] + B1[i] / m.sqrt() + B2[i] / m)
}

fn interpolate_pvalue(statistic: f64) -> f64 {
    let critical = critical_values();

    if statistic < critical[0] {
        tracing::trace!("AD p-value capped at {}", SIGNIFICANCE[0]);
        return SIGNIFICANCE[0];
    }
    if statistic > critical[6] {
        tracing::trace!("AD p-value floored at {}", SIGNIFICANCE[6]);
        return SIGNIFICANCE[6];
    }

    let log_sig = SIGNIFICANCE.map(f64::ln);
    let [c0, c1, c2] = quadratic_fit(&critical, &log_sig);
    (c0 + c1 * statistic + c2 * statistic * statistic).exp()
}

/// Least-squares `y = c0 + c1 x + c2 x^2`
fn quadratic_fit(x: &[f64; 7], y: &[f64; 7]) -> [f64; 3] {
    let mut s = [0.0; 5];
    let mut r = [0.0; 3];
    for (&xi, &yi) in x.iter().zip(y) {
        let mut power = 1.0;
        for (k, sk) in s.iter_mut().enumerate() {
            *sk += power;
            if k < 3 {
                r[k] += yi * power;
            }
            power *= xi;
        }
    }

    // Normal equations, Gaussian elimination with partial pivoting
    let mut m = [
        [s[0], s[1], s[2], r[0]],
        [s[1], s[2], s[3], r[1]],
        [s[2], s[3], s[4], r[2]],
    ];
    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot);
        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut coeffs = [0.0; 3];
    for row in (0..3).rev() {
        let known: f64 = (row + 1..3).map(|k| m[row][k] * coeffs[k]).sum();
        coeffs[row] = (m[row][3] - known) / m[row][row];
    }
    coeffs
}

pub struct AndersonDarling;

impl StatTest for AndersonDarling {
    fn name(&self) -> &str {
        "AD"
    }

    fn budget(&self) -> Budget {
        Budget::Long
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        anderson_darling(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(mean: f64) -> Vec<f64> {
        (0..20)
            .map(|i| (100.0 * (-((i as f64 - mean) / 4.0).powi(2) / 2.0).exp()).round())
            .collect()
    }

    #[test]
    fn test_critical_values_for_two_samples() {
        let expected = [0.325, 1.226, 1.961, 2.718, 3.752, 4.592, 6.546];
        for (c, e) in critical_values().iter().zip(expected) {
            assert!((c - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_quadratic_fit_exact_parabola() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = x.map(|v| 2.0 - 0.5 * v + 0.25 * v * v);
        let [c0, c1, c2] = quadratic_fit(&x, &y);
        assert!((c0 - 2.0).abs() < 1e-9);
        assert!((c1 + 0.5).abs() < 1e-9);
        assert!((c2 - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_stays_within_table() {
        assert_eq!(interpolate_pvalue(-3.0), 0.25);
        assert_eq!(interpolate_pvalue(50.0), 0.001);

        let p = interpolate_pvalue(1.961);
        assert!((p - 0.05).abs() < 0.01, "p-value {} should be near 0.05", p);
    }

    #[test]
    fn test_interpolation_is_monotone() {
        let mut previous = 1.0;
        for step in 0..=55 {
            let p = interpolate_pvalue(0.4 + step as f64 * 0.11);
            assert!(p <= previous + 1e-12);
            previous = p;
        }
    }

    #[test]
    fn test_identical_shapes_capped_at_upper_significance() {
        let a = gaussian(10.0);
        let result = anderson_darling(&a, &a).unwrap();
        assert!(result.statistic < 0.0);
        assert_eq!(result.pvalue, 0.25);
    }

    #[test]
    fn test_shifted_peak_floored() {
        let result = anderson_darling(&gaussian(10.0), &gaussian(13.0)).unwrap();
        assert!(result.statistic > 100.0);
        assert_eq!(result.pvalue, 0.001);
    }

    #[test]
    fn test_single_occupied_bin_is_degenerate() {
        assert!(matches!(
            anderson_darling(&[0.0, 5.0, 0.0], &[0.0, 7.0, 0.0]),
            Err(StatError::Degenerate(_))
        ));
    }

    #[test]
    fn test_sigma_requires_four_observations() {
        assert!(statistic_sigma(1.0, 1.0).is_err());
        assert!(statistic_sigma(10.0, 10.0).unwrap() > 0.0);
    }

    #[test]
    fn test_closed_form_sums_match_double_sum() {
        for total in [4u64, 7, 25, 300] {
            let n = total as f64;
            let mut g = 0.0;
            for i in 1..total - 1 {
                for j in i + 1..total {
                    g += 1.0 / ((n - i as f64) * j as f64);
                }
            }
            let h: f64 = (1..total).map(|i| 1.0 / i as f64).sum();

            assert!((harmonic(n - 1.0) - h).abs() < 1e-12);
            let closed = harmonic_squares(n) - 2.0 * h / n - 1.0 / n.powi(2);
            assert!((closed - g).abs() < 1e-12, "N={}: {} vs {}", total, closed, g);
        }
    }

    #[test]
    fn test_asymptotic_sums_continuous_at_limit() {
        let below = EXACT_HARMONIC_LIMIT - 1.0;
        let exact: f64 = (1..=below as u64).map(|i| 1.0 / i as f64).sum();
        let next = exact + 1.0 / EXACT_HARMONIC_LIMIT;
        assert!((harmonic(EXACT_HARMONIC_LIMIT) - next).abs() < 1e-10);

        let exact: f64 = (1..=below as u64).map(|i| 1.0 / (i as f64).powi(2)).sum();
        let next = exact + 1.0 / EXACT_HARMONIC_LIMIT.powi(2);
        assert!((harmonic_squares(EXACT_HARMONIC_LIMIT) - next).abs() < 1e-12);
    }

    #[test]
    fn test_high_statistics_is_fast() {
        // 30-bin peaks with about 1e10 entries each
        let peak = |mean: f64| -> Vec<f64> {
            (0..30)
                .map(|i| (1.0e9 * (-((i as f64 - mean) / 5.0).powi(2) / 2.0).exp()).round())
                .collect()
        };

        let started = std::time::Instant::now();
        let result = anderson_darling(&peak(15.0), &peak(15.01)).unwrap();

        assert!(started.elapsed() < std::time::Duration::from_millis(500));
        assert!(result.statistic.is_finite());
        assert!((0.001..=0.25).contains(&result.pvalue));
    }
}

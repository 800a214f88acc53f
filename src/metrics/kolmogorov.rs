// Two-sample Kolmogorov-Smirnov test on binned data
//
// Each bin content counts as that many observations at the bin position, so
// the empirical CDFs are the normalised cumulative sums. The effective sample
// size uses the integrals; the p-value comes from the asymptotic Kolmogorov
// distribution with Stephens' small-sample correction.

use super::{check_pair, positive_totals, Budget, Result, StatTest, TestStatistic};

/// Largest absolute difference between the two normalised cumulative sums,
/// with its asymptotic p-value
///
/// # Example
/// ```
/// use histcmp::metrics::kolmogorov_smirnov;
///
/// let result = kolmogorov_smirnov(&[50.0, 0.0], &[0.0, 50.0]).unwrap();
/// assert_eq!(result.statistic, 1.0);
/// assert!(result.pvalue < 1e-6);
/// ```
pub fn kolmogorov_smirnov(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;
    let (n1, n2) = positive_totals(left, right)?;

    let mut cum1 = 0.0;
    let mut cum2 = 0.0;
    let mut statistic: f64 = 0.0;
    for (&u, &v) in left.iter().zip(right) {
        cum1 += u;
        cum2 += v;
        statistic = statistic.max((cum1 / n1 - cum2 / n2).abs());
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let pvalue = kolmogorov_q((en + 0.12 + 0.11 / en) * statistic);

    Ok(TestStatistic { statistic, pvalue })
}

/// Survival function of the Kolmogorov distribution
///
/// `Q(x) = 2 * sum_{j>=1} (-1)^(j-1) exp(-2 j^2 x^2)`. The alternating series
/// does not converge for tiny arguments, where Q is 1 to double precision.
pub(crate) fn kolmogorov_q(lambda: f64) -> f64 {
    const EPS1: f64 = 1e-3;
    const EPS2: f64 = 1e-8;

    if lambda < 1e-3 {
        return 1.0;
    }

    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous: f64 = 0.0;

    for j in 1..=100 {
        let j = j as f64;
        let term = fac * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= EPS1 * previous || term.abs() <= EPS2 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }

    1.0
}

pub struct KolmogorovSmirnov;

impl StatTest for KolmogorovSmirnov {
    fn name(&self) -> &str {
        "KS"
    }

    fn budget(&self) -> Budget {
        Budget::Long
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        kolmogorov_smirnov(left, right)
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
    fn test_kolmogorov_q_reference_points() {
        // Classic critical values: Q(1.358) ~ 0.05, Q(1.628) ~ 0.01
        assert!((kolmogorov_q(1.358) - 0.05).abs() < 1e-3);
        assert!((kolmogorov_q(1.628) - 0.01).abs() < 1e-3);
        assert_eq!(kolmogorov_q(0.0), 1.0);
        assert!(kolmogorov_q(5.0) < 1e-20);
    }

    #[test]
    fn test_ks_same_shape_different_scale() {
        let a = gaussian(10.0);
        let b: Vec<f64> = a.iter().map(|v| v * 3.0).collect();
        let result = kolmogorov_smirnov(&a, &b).unwrap();
        assert!(result.statistic < 1e-12);
        assert!(result.pvalue > 0.99);
    }

    #[test]
    fn test_ks_shifted_peak_rejected() {
        let result = kolmogorov_smirnov(&gaussian(10.0), &gaussian(13.0)).unwrap();
        assert!(result.statistic > 0.2);
        assert!(result.pvalue < 1e-10);
    }

    #[test]
    fn test_ks_small_fluctuation_accepted() {
        let a = gaussian(10.0);
        let b: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 2 == 0 { v + 1.0 } else { (v - 1.0f64).max(0.0) })
            .collect();
        let result = kolmogorov_smirnov(&a, &b).unwrap();
        assert!(result.pvalue > 0.5, "p-value {} should be > 0.5", result.pvalue);
    }

    #[test]
    fn test_ks_requires_positive_integrals() {
        assert!(kolmogorov_smirnov(&[0.0, 0.0], &[1.0, 1.0]).is_err());
    }
}

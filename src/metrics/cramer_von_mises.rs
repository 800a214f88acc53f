// Two-sample Cramer-von Mises test on binned data
//
// T = N1 N2 / N^2 * sum_j l_j (F1_j - F2_j)^2, where l_j is the pooled content of
// bin j and F are the normalised cumulative sums. The p-value uses the limiting
// distribution of omega^2 (Anderson & Darling 1952):
//
//   F(x) = 1 / (pi^1.5 sqrt(x)) * sum_k Gamma(k + 1/2) / k! * sqrt(4k + 1)
//          * exp(-q_k) K_{1/4}(q_k),   q_k = (4k + 1)^2 / (16 x)
//
// K_{1/4} is evaluated from its integral representation
// K_nu(z) = int_0^inf exp(-z cosh t) cosh(nu t) dt.

use super::{check_pair, positive_totals, Budget, Result, StatTest, TestStatistic};
use statrs::function::gamma::ln_gamma;

const SERIES_TOLERANCE: f64 = 1e-7;
const MAX_SERIES_TERMS: usize = 1000;

/// Cramer-von Mises statistic with its asymptotic p-value
pub fn cramer_von_mises(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;
    let (n1, n2) = positive_totals(left, right)?;
    let total = n1 + n2;

    let mut cum1 = 0.0;
    let mut cum2 = 0.0;
    let mut sum = 0.0;
    for (&u, &v) in left.iter().zip(right) {
        cum1 += u;
        cum2 += v;
        sum += (u + v) * (cum1 / n1 - cum2 / n2).powi(2);
    }

    let statistic = n1 * n2 / (total * total) * sum;
    let pvalue = (1.0 - limiting_cdf(statistic)).clamp(0.0, 1.0);

    Ok(TestStatistic { statistic, pvalue })
}

/// CDF of the limiting omega^2 distribution
pub(crate) fn limiting_cdf(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }

    let prefactor = std::f64::consts::PI.powf(1.5) * x.sqrt();
    let mut total = 0.0;
    for k in 0..MAX_SERIES_TERMS {
        let kf = k as f64;
        let u = (ln_gamma(kf + 0.5) - ln_gamma(kf + 1.0)).exp() / prefactor;
        let y = 4.0 * kf + 1.0;
        let q = y * y / (16.0 * x);
        let term = u * y.sqrt() * scaled_bessel_k(0.25, q);
        total += term;
        if term.abs() < SERIES_TOLERANCE {
            break;
        }
    }
    total.min(1.0)
}

/// `exp(-z) * K_nu(z)` by trapezoidal integration
///
/// The integrand decays double-exponentially, so a fixed step converges fast;
/// integration stops once it is negligible against its value at t = 0.
fn scaled_bessel_k(nu: f64, z: f64) -> f64 {
    const STEP: f64 = 0.02;
    const MAX_T: f64 = 60.0;

    let integrand = |t: f64| (-z * (t.cosh() + 1.0) + nu * t).exp() * 0.5 * (1.0 + (-2.0 * nu * t).exp());
    let cutoff = -2.0 * z - 40.0;

    let mut sum = 0.5 * integrand(0.0);
    let mut t = STEP;
    while t < MAX_T {
        if -z * (t.cosh() + 1.0) + nu * t < cutoff {
            break;
        }
        sum += integrand(t);
        t += STEP;
    }
    sum * STEP
}

pub struct CramerVonMises;

impl StatTest for CramerVonMises {
    fn name(&self) -> &str {
        "cramer_von_mises"
    }

    fn budget(&self) -> Budget {
        Budget::Long
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        cramer_von_mises(left, right)
    }
}

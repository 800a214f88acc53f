// Chi-squared family: raw bin-by-bin, normalisation only, shape only

use super::{check_pair, chi2_sf, positive_totals, Result, StatTest, TestStatistic};

/// Pearson chi-squared between two unnormalised histograms
///
/// Sum of `(u - v)^2 / (u + v)` over bins where either side is positive.
/// The degrees of freedom equal the number of bins in the sum, not bins - 1.
///
/// # Example
/// ```
/// use histcmp::metrics::chisquare;
///
/// let result = chisquare(&[10.0, 0.0, 5.0], &[10.0, 0.0, 5.0]).unwrap();
/// assert_eq!(result.statistic, 0.0);
/// assert_eq!(result.pvalue, 1.0);
/// ```
pub fn chisquare(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;

    let terms: Vec<f64> = left
        .iter()
        .zip(right)
        .filter(|(&u, &v)| u > 0.0 || v > 0.0)
        .map(|(&u, &v)| (u - v).powi(2) / (u + v))
        .collect();

    let statistic: f64 = terms.iter().sum();
    let pvalue = chi2_sf(statistic, terms.len() as f64)?;

    Ok(TestStatistic { statistic, pvalue })
}

/// Chi-squared on the integrals alone (one degree of freedom)
pub fn norm_chisquare(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;
    let (n1, n2) = positive_totals(left, right)?;

    let statistic = (n1 - n2).powi(2) / (n1 + n2);
    let pvalue = chi2_sf(statistic, 1.0)?;

    Ok(TestStatistic { statistic, pvalue })
}

/// Chi-squared of the shapes with the integrals factored out
///
/// `1/(N1 N2) * sum (N2 u - N1 v)^2 / (u + v)` over occupied bins, with one
/// degree of freedom spent on the relative normalisation.
pub fn shape_chisquare(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;
    let (n1, n2) = positive_totals(left, right)?;

    let mut sum = 0.0;
    let mut occupied = 0usize;
    for (&u, &v) in left.iter().zip(right) {
        if u + v > 0.0 {
            sum += (n2 * u - n1 * v).powi(2) / (u + v);
            occupied += 1;
        }
    }

    let statistic = sum / (n1 * n2);
    let pvalue = chi2_sf(statistic, occupied as f64 - 1.0)?;

    Ok(TestStatistic { statistic, pvalue })
}

pub struct ChiSquare;

impl StatTest for ChiSquare {
    fn name(&self) -> &str {
        "chisq"
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        chisquare(left, right)
    }
}

pub struct NormChiSquare;

impl StatTest for NormChiSquare {
    fn name(&self) -> &str {
        "norm_chisq"
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        norm_chisquare(left, right)
    }
}

pub struct ShapeChiSquare;

impl StatTest for ShapeChiSquare {
    fn name(&self) -> &str {
        "shape_chisq"
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        shape_chisquare(left, right)
    }
}

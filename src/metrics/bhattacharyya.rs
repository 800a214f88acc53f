// Bhattacharyya distance measure between normalised shapes
//
// BC = sum sqrt(p_i q_i) is the overlap of the two normalised histograms, 1 for
// identical shapes and 0 for disjoint support. The statistic is the bounded
// distance sqrt(1 - BC). There is no sampling distribution here, so the
// coefficient itself fills the p-value slot as an agreement score.

use super::{check_pair, positive_totals, Result, StatTest, TestStatistic};

/// # Example
/// ```
/// use histcmp::metrics::bhattacharyya;
///
/// let disjoint = bhattacharyya(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
/// assert_eq!(disjoint.statistic, 1.0);
/// assert_eq!(disjoint.pvalue, 0.0);
/// ```
pub fn bhattacharyya(left: &[f64], right: &[f64]) -> Result<TestStatistic> {
    check_pair(left, right)?;
    let (n1, n2) = positive_totals(left, right)?;

    let coefficient: f64 = left
        .iter()
        .zip(right)
        .map(|(&u, &v)| (u / n1 * v / n2).sqrt())
        .sum::<f64>()
        .min(1.0);

    Ok(TestStatistic {
        statistic: (1.0 - coefficient).max(0.0).sqrt(),
        pvalue: coefficient,
    })
}

pub struct Bhattacharyya;

impl StatTest for Bhattacharyya {
    fn name(&self) -> &str {
        "bdm"
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic> {
        bhattacharyya(left, right)
    }
}

// Precondition gate
//
// Cheap structural checks run strictly in this order, first match wins:
//
// 1. both empty               -> both_empty (1.0 if comparable, else 0.0)
// 2. name/bounds/bins differ  -> comparable (0.0)
// 3. identical bin contents   -> identity (1.0)
// 4. one non-zero bin each    -> single_bin (0.0)
// 5. too few common bins      -> insufficient_statistics (0.0)
//
// A pair that passes every check goes on to the statistical battery.

use crate::comparison::result::GateVerdict;
use crate::histogram::Histogram;

/// Classify a pair of validated histograms
///
/// Returns `None` when the pair warrants full statistical testing.
/// `min_common_nonzero_bins` is the largest count of bins, positive on both
/// sides, that is still considered insufficient.
///
/// # Example
/// ```
/// use histcmp::comparison::{evaluate_gate, GateVerdict};
/// use histcmp::histogram::Histogram;
///
/// let h1 = Histogram::new("a", 0.0, 10.0, vec![5.0; 12]);
/// let h2 = h1.clone();
/// assert_eq!(evaluate_gate(&h1, &h2, 10), Some(GateVerdict::Identical));
/// ```
pub fn evaluate_gate(
    h1: &Histogram,
    h2: &Histogram,
    min_common_nonzero_bins: usize,
) -> Option<GateVerdict> {
    if h1.is_empty() && h2.is_empty() {
        return Some(GateVerdict::BothEmpty {
            comparable: h1.is_comparable_with(h2),
        });
    }

    if !h1.is_comparable_with(h2) {
        return Some(GateVerdict::Incomparable);
    }

    if h1.is_identical_to(h2) {
        return Some(GateVerdict::Identical);
    }

    // Not identical, so a single bin of signal on each side is a mismatch
    if h1.nonzero_bins() == 1 && h2.nonzero_bins() == 1 {
        return Some(GateVerdict::SingleBin);
    }

    let common_nonzero_bins = h1.common_nonzero_bins(h2);
    if common_nonzero_bins <= min_common_nonzero_bins {
        return Some(GateVerdict::InsufficientStatistics {
            common_nonzero_bins,
        });
    }

    None
}

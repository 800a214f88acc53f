// Comparison result mapping
//
// Keyed by gate verdict or test name. Serialises to the JSON shape the
// dashboard consumes:
//
//   {"identity": {"pvalue": 1.0}}
//   {"shape_chisq": {"T": 3.2, "pvalue": 0.92}, "AD": {"pvalue": 0.0, "error": "..."}}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// p-value recorded for a test that failed, timed out or panicked
///
/// Indistinguishable from a genuine p-value of zero by value alone; check
/// `TestOutcome::is_failure` for the difference.
pub const FAILURE_PVALUE: f64 = 0.0;

/// Short-circuit outcome of the precondition gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Neither histogram has positive content; `comparable` says whether
    /// they also share name and binning
    BothEmpty { comparable: bool },

    /// Name, bounds or bin count differ
    Incomparable,

    /// Bin contents are element-wise equal
    Identical,

    /// Both histograms have exactly one non-zero bin (and are not identical)
    SingleBin,

    /// Too few bins are positive on both sides
    InsufficientStatistics { common_nonzero_bins: usize },
}

impl GateVerdict {
    pub const KEYS: [&'static str; 5] = [
        "both_empty",
        "comparable",
        "identity",
        "single_bin",
        "insufficient_statistics",
    ];

    pub fn key(&self) -> &'static str {
        match self {
            GateVerdict::BothEmpty { .. } => "both_empty",
            GateVerdict::Incomparable => "comparable",
            GateVerdict::Identical => "identity",
            GateVerdict::SingleBin => "single_bin",
            GateVerdict::InsufficientStatistics { .. } => "insufficient_statistics",
        }
    }

    pub fn pvalue(&self) -> f64 {
        match self {
            GateVerdict::BothEmpty { comparable: true } | GateVerdict::Identical => 1.0,
            GateVerdict::BothEmpty { comparable: false }
            | GateVerdict::Incomparable
            | GateVerdict::SingleBin
            | GateVerdict::InsufficientStatistics { .. } => 0.0,
        }
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateVerdict::BothEmpty { comparable: true } => write!(f, "both histograms are empty"),
            GateVerdict::BothEmpty { comparable: false } => {
                write!(f, "both histograms are empty but not comparable")
            }
            GateVerdict::Incomparable => write!(f, "histograms differ in name or binning"),
            GateVerdict::Identical => write!(f, "bin contents are identical"),
            GateVerdict::SingleBin => write!(f, "each histogram has a single, different, bin"),
            GateVerdict::InsufficientStatistics {
                common_nonzero_bins,
            } => write!(
                f,
                "only {} bins are populated in both histograms",
                common_nonzero_bins
            ),
        }
    }
}

/// Outcome of one gate check or one statistical test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Test statistic, absent for gate verdicts and failures
    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub statistic: Option<f64>,

    pub pvalue: f64,

    /// Why the test produced no result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestOutcome {
    pub fn verdict(pvalue: f64) -> Self {
        Self {
            statistic: None,
            pvalue,
            error: None,
        }
    }

    pub fn success(statistic: f64, pvalue: f64) -> Self {
        Self {
            statistic: Some(statistic),
            pvalue,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            statistic: None,
            pvalue: FAILURE_PVALUE,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Mapping from gate verdict or test name to its outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonResult {
    entries: BTreeMap<String, TestOutcome>,
}

impl ComparisonResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry result for a gate verdict
    pub fn from_verdict(verdict: GateVerdict) -> Self {
        let mut result = Self::new();
        result.insert(verdict.key(), TestOutcome::verdict(verdict.pvalue()));
        result
    }

    pub fn insert(&mut self, key: impl Into<String>, outcome: TestOutcome) {
        self.entries.insert(key.into(), outcome);
    }

    pub fn get(&self, key: &str) -> Option<&TestOutcome> {
        self.entries.get(key)
    }

    pub fn pvalue(&self, key: &str) -> Option<f64> {
        self.get(key).map(|outcome| outcome.pvalue)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TestOutcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gate verdict, when the result is a short circuit
    ///
    /// Custom tests cannot take a gate key (see `Comparator::with_test`), so
    /// a single gate-keyed entry is always a short circuit. The result only
    /// stores the p-value, so `InsufficientStatistics` comes back with
    /// `common_nonzero_bins: 0`; use `evaluate_gate` for the actual count.
    pub fn verdict(&self) -> Option<GateVerdict> {
        if self.entries.len() != 1 {
            return None;
        }
        let (key, outcome) = self.entries.iter().next()?;
        match key.as_str() {
            "both_empty" => Some(GateVerdict::BothEmpty {
                comparable: outcome.pvalue > 0.0,
            }),
            "comparable" => Some(GateVerdict::Incomparable),
            "identity" => Some(GateVerdict::Identical),
            "single_bin" => Some(GateVerdict::SingleBin),
            "insufficient_statistics" => Some(GateVerdict::InsufficientStatistics {
                common_nonzero_bins: 0,
            }),
            _ => None,
        }
    }

    /// Names of tests that failed, timed out or panicked
    pub fn failures(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(key, _)| key)
            .collect()
    }

    /// Smallest p-value among entries that produced a result
    pub fn min_pvalue(&self) -> Option<f64> {
        self.entries
            .values()
            .filter(|outcome| !outcome.is_failure())
            .map(|outcome| outcome.pvalue)
            .reduce(f64::min)
    }

    /// Human-readable summary, one line per entry
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        for (key, outcome) in self.iter() {
            report.push_str(&format!("  {:<24} p={:.4}", key, outcome.pvalue));
            if let Some(t) = outcome.statistic {
                report.push_str(&format!("  T={:.4}", t));
            }
            if let Some(error) = &outcome.error {
                report.push_str(&format!("  FAILED: {}", error));
            }
            report.push('\n');
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_keys_and_pvalues() {
        let cases = [
            (GateVerdict::BothEmpty { comparable: true }, "both_empty", 1.0),
            (GateVerdict::BothEmpty { comparable: false }, "both_empty", 0.0),
            (GateVerdict::Incomparable, "comparable", 0.0),
            (GateVerdict::Identical, "identity", 1.0),
            (GateVerdict::SingleBin, "single_bin", 0.0),
            (
                GateVerdict::InsufficientStatistics {
                    common_nonzero_bins: 3,
                },
                "insufficient_statistics",
                0.0,
            ),
        ];
        for (verdict, key, pvalue) in cases {
            assert_eq!(verdict.key(), key);
            assert_eq!(verdict.pvalue(), pvalue);
            assert!(GateVerdict::KEYS.contains(&key));
        }
    }

    #[test]
    fn test_verdict_serialises_to_single_key() {
        let result = ComparisonResult::from_verdict(GateVerdict::Identical);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"identity":{"pvalue":1.0}}"#);
        assert_eq!(result.verdict(), Some(GateVerdict::Identical));
    }

    #[test]
    fn test_success_and_failure_serialisation() {
        let mut result = ComparisonResult::new();
        result.insert("chisq", TestOutcome::success(2.5, 0.75));
        result.insert("KS", TestOutcome::failure("timed out after 10s"));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["chisq"]["T"], 2.5);
        assert_eq!(value["chisq"]["pvalue"], 0.75);
        assert!(value["chisq"].get("error").is_none());
        assert_eq!(value["KS"]["pvalue"], 0.0);
        assert_eq!(value["KS"]["error"], "timed out after 10s");
        assert!(value["KS"].get("T").is_none());

        let back: ComparisonResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_failures_and_min_pvalue_skip_failed_tests() {
        let mut result = ComparisonResult::new();
        result.insert("chisq", TestOutcome::success(2.5, 0.75));
        result.insert("AD", TestOutcome::success(0.1, 0.25));
        result.insert("KS", TestOutcome::failure("panicked"));

        assert_eq!(result.failures(), vec!["KS"]);
        assert_eq!(result.min_pvalue(), Some(0.25));
        assert_eq!(result.verdict(), None);
    }

    #[test]
    fn test_report_string_marks_failures() {
        let mut result = ComparisonResult::new();
        result.insert("KS", TestOutcome::failure("timed out"));
        result.insert("chisq", TestOutcome::success(1.0, 0.5));

        let report = result.to_report_string();
        assert!(report.contains("FAILED: timed out"));
        assert!(report.contains("T=1.0000"));
    }
}

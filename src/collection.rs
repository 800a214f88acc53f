//! Sets of histograms from one run, and run-against-run comparison
//!
//! A production run writes dozens of histograms into one collection. The
//! dashboard compares every histogram of a run with the histogram of the same
//! name in a reference run. The collection also carries a bookkeeping entry
//! called `filelist` that is not a histogram and is skipped on load.

use crate::comparison::{Comparator, CompareError, CompareOptions, ComparisonResult};
use crate::histogram::{Histogram, MalformedHistogramError};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name of the non-histogram bookkeeping entry in a run collection
pub const FILELIST_NAME: &str = "filelist";

/// Histograms of one run, keyed by name
///
/// # Example
/// ```
/// use histcmp::collection::HistogramSet;
///
/// let set = HistogramSet::from_json_str(r#"[
///     {"name": "energy", "xmin": 0.0, "xmax": 1.0, "bin_values": [1.0, 2.0]},
///     {"name": "filelist", "files": ["run_001.i3"]}
/// ]"#).unwrap();
///
/// assert_eq!(set.len(), 1);
/// assert!(set.get("energy").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSet {
    histograms: BTreeMap<String, Histogram>,
}

impl HistogramSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a histogram, returning the one it replaced
    pub fn insert(&mut self, histogram: Histogram) -> Option<Histogram> {
        self.histograms.insert(histogram.name.clone(), histogram)
    }

    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Histogram> {
        self.histograms.values()
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Number of histograms without positive content
    pub fn empty_count(&self) -> usize {
        self.iter().filter(|h| h.is_empty()).count()
    }

    /// Parse a set from JSON
    ///
    /// Accepts a single record, an array of records, or an object mapping
    /// names to records. Every record is validated; an empty name or a name
    /// that appears twice is an error.
    pub fn from_json_str(content: &str) -> std::result::Result<Self, MalformedHistogramError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| MalformedHistogramError::Parse(e.to_string()))?;

        let records: Vec<Value> = match value {
            Value::Array(records) => records,
            Value::Object(map) if map.contains_key("bin_values") => vec![Value::Object(map)],
            Value::Object(map) => map
                .into_iter()
                .filter(|(key, _)| key != FILELIST_NAME)
                .map(|(_, record)| record)
                .collect(),
            other => {
                return Err(MalformedHistogramError::Parse(format!(
                    "expected a histogram record, array or object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut set = Self::new();
        for record in records {
            if is_filelist(&record) {
                continue;
            }
            let histogram: Histogram = serde_json::from_value(record)
                .map_err(|e| MalformedHistogramError::Parse(e.to_string()))?;
            histogram.validate()?;
            // Sets are keyed by name
            if histogram.name.is_empty() {
                return Err(MalformedHistogramError::EmptyName);
            }

            let name = histogram.name.clone();
            if set.insert(histogram).is_some() {
                return Err(MalformedHistogramError::Parse(format!(
                    "duplicate histogram '{}'",
                    name
                )));
            }
        }
        Ok(set)
    }

    /// Load a set from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let set = Self::from_json_str(&content)
            .with_context(|| format!("Invalid histogram file {}", path.display()))?;
        tracing::debug!("Loaded {} histograms from {}", set.len(), path.display());
        Ok(set)
    }
}

impl FromIterator<Histogram> for HistogramSet {
    fn from_iter<I: IntoIterator<Item = Histogram>>(iter: I) -> Self {
        let mut set = Self::new();
        for histogram in iter {
            set.insert(histogram);
        }
        set
    }
}

fn is_filelist(record: &Value) -> bool {
    record.get("name").and_then(Value::as_str) == Some(FILELIST_NAME)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Result of comparing two runs histogram by histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetComparison {
    /// Per-histogram results for names present in both runs
    pub results: BTreeMap<String, ComparisonResult>,

    /// Names only the left run has
    pub only_in_left: Vec<String>,

    /// Names only the right run has
    pub only_in_right: Vec<String>,

    /// Histograms without positive content in the left run
    pub empty_left: usize,

    /// Histograms without positive content in the right run
    pub empty_right: usize,
}

impl SetComparison {
    /// Names whose smallest successful p-value is below `alpha`, or whose
    /// tests all failed
    ///
    /// Only pairs that went through the test battery are considered. Gate
    /// short circuits (`comparable`, `single_bin`, `insufficient_statistics`
    /// and the rest) are left out even when their p-value is 0; look them up
    /// with `ComparisonResult::verdict`.
    pub fn flagged(&self, alpha: f64) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, result)| !result.is_empty() && result.verdict().is_none())
            .filter(|(_, result)| result.min_pvalue().map_or(true, |p| p < alpha))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Human-readable report, one block per histogram
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!(
            "Compared {} histograms ({} empty left, {} empty right)\n",
            self.results.len(),
            self.empty_left,
            self.empty_right
        ));

        for (name, result) in &self.results {
            report.push_str(&format!("\n{}\n", name));
            report.push_str(&result.to_report_string());
        }

        if !self.only_in_left.is_empty() {
            report.push_str(&format!("\nOnly in left: {}\n", self.only_in_left.join(", ")));
        }
        if !self.only_in_right.is_empty() {
            report.push_str(&format!("\nOnly in right: {}\n", self.only_in_right.join(", ")));
        }
        report
    }
}

/// Compare every histogram present in both sets
///
/// # Example
/// ```
/// use histcmp::collection::{compare_sets, HistogramSet};
/// use histcmp::comparison::CompareOptions;
/// use histcmp::histogram::Histogram;
///
/// let left: HistogramSet = vec![
///     Histogram::new("energy", 0.0, 1.0, vec![3.0; 20]),
///     Histogram::new("zenith", 0.0, 1.0, vec![0.0; 20]),
/// ].into_iter().collect();
/// let right: HistogramSet = vec![Histogram::new("energy", 0.0, 1.0, vec![3.0; 20])]
///     .into_iter()
///     .collect();
///
/// let comparison = compare_sets(&left, &right, &CompareOptions::default()).unwrap();
/// assert_eq!(comparison.results["energy"].pvalue("identity"), Some(1.0));
/// assert_eq!(comparison.only_in_left, vec!["zenith"]);
/// assert_eq!(comparison.empty_left, 1);
/// ```
pub fn compare_sets(
    left: &HistogramSet,
    right: &HistogramSet,
    options: &CompareOptions,
) -> std::result::Result<SetComparison, CompareError> {
    compare_sets_with(&Comparator::new(options.clone())?, left, right)
}

/// Compare every histogram present in both sets with a prepared comparator
pub fn compare_sets_with(
    comparator: &Comparator,
    left: &HistogramSet,
    right: &HistogramSet,
) -> std::result::Result<SetComparison, CompareError> {
    let mut comparison = SetComparison {
        empty_left: left.empty_count(),
        empty_right: right.empty_count(),
        ..SetComparison::default()
    };

    for h1 in left.iter() {
        match right.get(&h1.name) {
            Some(h2) => {
                let result = comparator.compare(h1, h2)?;
                comparison.results.insert(h1.name.clone(), result);
            }
            None => comparison.only_in_left.push(h1.name.clone()),
        }
    }

    comparison.only_in_right = right
        .names()
        .filter(|name| left.get(name).is_none())
        .map(str::to_string)
        .collect();

    tracing::debug!(
        "Compared {} histograms, {} only in left, {} only in right",
        comparison.results.len(),
        comparison.only_in_left.len(),
        comparison.only_in_right.len()
    );
    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(name: &str, bins: &[f64]) -> Histogram {
        Histogram::new(name, 0.0, 1.0, bins.to_vec())
    }

    #[test]
    fn test_parse_array() {
        let set = HistogramSet::from_json_str(
            r#"[
                {"name": "a", "xmin": 0.0, "xmax": 1.0, "bin_values": [1.0]},
                {"name": "b", "xmin": 0.0, "xmax": 2.0, "bin_values": [0.0, 1.0], "nentries": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.get("b").unwrap().xmax, 2.0);
    }

    #[test]
    fn test_parse_object_skips_filelist() {
        let set = HistogramSet::from_json_str(
            r#"{
                "a": {"name": "a", "xmin": 0.0, "xmax": 1.0, "bin_values": [1.0]},
                "filelist": {"files": ["x.i3", "y.i3"]}
            }"#,
        )
        .unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.get(FILELIST_NAME).is_none());
    }

    #[test]
    fn test_parse_single_record() {
        let set =
            HistogramSet::from_json_str(r#"{"name": "a", "xmin": 0.0, "xmax": 1.0, "bin_values": [1.0]}"#)
                .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = HistogramSet::from_json_str(
            r#"[
                {"name": "a", "xmin": 0.0, "xmax": 1.0, "bin_values": [1.0]},
                {"name": "a", "xmin": 0.0, "xmax": 1.0, "bin_values": [2.0]}
            ]"#,
        );
        assert!(matches!(result, Err(MalformedHistogramError::Parse(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_empty_name_rejected_in_set() {
        let result = HistogramSet::from_json_str(
            r#"[{"name": "", "xmin": 0.0, "xmax": 1.0, "bin_values": [1.0]}]"#,
        );
        assert_eq!(result, Err(MalformedHistogramError::EmptyName));
    }

    #[test]
    fn test_invalid_record_rejected() {
        let result = HistogramSet::from_json_str(
            r#"[{"name": "a", "xmin": 1.0, "xmax": 1.0, "bin_values": [1.0]}]"#,
        );
        assert!(matches!(
            result,
            Err(MalformedHistogramError::InvalidBounds { .. })
        ));

        let result = HistogramSet::from_json_str(r#"[{"name": "a", "xmin": 0.0}]"#);
        assert!(matches!(result, Err(MalformedHistogramError::Parse(_))));

        let result = HistogramSet::from_json_str("42");
        assert!(matches!(result, Err(MalformedHistogramError::Parse(msg)) if msg.contains("a number")));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "a", "xmin": 0.0, "xmax": 1.0, "bin_values": [0.0, 0.0]}}]"#
        )
        .unwrap();

        let set = HistogramSet::from_file(file.path()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.empty_count(), 1);
    }

    #[test]
    fn test_from_missing_file() {
        let error = HistogramSet::from_file("/nonexistent/run.json").unwrap_err();
        assert!(error.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_compare_sets_partitions_names() {
        let ramp: Vec<f64> = (1..=20).map(f64::from).collect();
        let left: HistogramSet = vec![
            record("shared", &ramp),
            record("left_only", &ramp),
            record("empty", &[0.0; 20]),
        ]
        .into_iter()
        .collect();
        let right: HistogramSet = vec![
            record("shared", &ramp),
            record("right_only", &ramp),
            record("empty", &[0.0; 20]),
        ]
        .into_iter()
        .collect();

        let comparison = compare_sets(&left, &right, &CompareOptions::default()).unwrap();

        assert_eq!(comparison.results.len(), 2);
        assert_eq!(comparison.results["shared"].pvalue("identity"), Some(1.0));
        assert_eq!(comparison.results["empty"].pvalue("both_empty"), Some(1.0));
        assert_eq!(comparison.only_in_left, vec!["left_only"]);
        assert_eq!(comparison.only_in_right, vec!["right_only"]);
        assert_eq!(comparison.empty_left, 1);
        assert_eq!(comparison.empty_right, 1);
        assert!(comparison.flagged(0.05).is_empty());
    }

    #[test]
    fn test_flagged_reports_low_pvalues() {
        let a: Vec<f64> = (1..=20).map(f64::from).collect();
        let b: Vec<f64> = (1..=20).rev().map(f64::from).collect();
        let left: HistogramSet = vec![record("x", &a)].into_iter().collect();
        let right: HistogramSet = vec![record("x", &b)].into_iter().collect();

        let comparison = compare_sets(&left, &right, &CompareOptions::legacy()).unwrap();

        assert_eq!(comparison.flagged(0.05), vec!["x"]);
        let report = comparison.to_report_string();
        assert!(report.contains("Compared 1 histograms"));
        assert!(report.contains("chisq"));
    }

    #[test]
    fn test_flagged_skips_gate_verdicts() {
        let mut sparse = vec![0.0; 20];
        sparse[..5].copy_from_slice(&[4.0, 9.0, 12.0, 9.0, 4.0]);
        let mut shifted = vec![0.0; 20];
        shifted[1..6].copy_from_slice(&[4.0, 9.0, 12.0, 9.0, 4.0]);
        let left: HistogramSet = vec![record("sparse", &sparse)].into_iter().collect();
        let right: HistogramSet = vec![record("sparse", &shifted)].into_iter().collect();

        let comparison = compare_sets(&left, &right, &CompareOptions::all()).unwrap();

        assert_eq!(
            comparison.results["sparse"].pvalue("insufficient_statistics"),
            Some(0.0)
        );
        assert!(comparison.flagged(0.05).is_empty());
    }

    #[test]
    fn test_serialises_to_json() {
        let left: HistogramSet = vec![record("x", &[1.0; 12])].into_iter().collect();
        let comparison = compare_sets(&left, &left, &CompareOptions::default()).unwrap();

        let value = serde_json::to_value(&comparison).unwrap();
        assert_eq!(value["results"]["x"]["identity"]["pvalue"], 1.0);
        assert_eq!(value["empty_left"], 0);
    }
}

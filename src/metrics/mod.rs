// Goodness-of-fit tests between two binned distributions
//
// Every test consumes two equal-length sequences of bin contents and returns a
// statistic plus a p-value. Tests are registered once in a `TestRegistry` and
// picked per comparison by the option flags.
//
// - chisq / norm_chisq / shape_chisq: Pearson-style sums over occupied bins
// - KS / cramer_von_mises / AD: CDF-based tests treating bin contents as
//   repeated observations at the bin position
// - llh_ratio / llh_value: Poisson likelihood against a reference shape
// - bdm: Bhattacharyya overlap of the normalised shapes
//
// The sample-based tests (KS, CvM, AD) can be slow on very large integrals and
// get the long time budget.

mod anderson_darling;
mod bhattacharyya;
mod chisq;
mod cramer_von_mises;
mod kolmogorov;
mod likelihood;

pub use anderson_darling::{anderson_darling, AndersonDarling};
pub use bhattacharyya::{bhattacharyya, Bhattacharyya};
pub use chisq::{chisquare, norm_chisquare, shape_chisquare, ChiSquare, NormChiSquare, ShapeChiSquare};
pub use cramer_von_mises::{cramer_von_mises, CramerVonMises};
pub use kolmogorov::{kolmogorov_smirnov, KolmogorovSmirnov};
pub use likelihood::{llh_ratio, llh_value, LlhRatio, LlhValue};

use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by an individual statistical test
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatError {
    #[error("Sequences differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Cannot compare empty sequences")]
    EmptyInput,

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),
}

pub type Result<T> = std::result::Result<T, StatError>;

/// Outcome of one successful test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestStatistic {
    /// Test statistic `T`
    pub statistic: f64,

    /// p-value in [0, 1]
    pub pvalue: f64,
}

/// Time budget class of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Closed-form sums, finish in microseconds
    Short,
    /// Tests with loops proportional to the integral or series expansions
    Long,
}

/// A two-sample test over binned contents
///
/// Implementations must be pure: the executor runs each one on its own worker
/// thread and may abandon it once its budget expires.
pub trait StatTest: Send + Sync {
    /// Key under which the outcome is reported
    fn name(&self) -> &str;

    fn budget(&self) -> Budget {
        Budget::Short
    }

    fn evaluate(&self, left: &[f64], right: &[f64]) -> Result<TestStatistic>;
}

/// Built-in tests, one per option flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestKind {
    Chisq,
    NormChisq,
    ShapeChisq,
    Bdm,
    Ks,
    LlhRatio,
    LlhValue,
    CramerVonMises,
    AndersonDarling,
}

impl TestKind {
    pub const ALL: [TestKind; 9] = [
        TestKind::Chisq,
        TestKind::NormChisq,
        TestKind::ShapeChisq,
        TestKind::Bdm,
        TestKind::Ks,
        TestKind::LlhRatio,
        TestKind::LlhValue,
        TestKind::CramerVonMises,
        TestKind::AndersonDarling,
    ];

    /// Result key for this test
    pub fn key(self) -> &'static str {
        match self {
            TestKind::Chisq => "chisq",
            TestKind::NormChisq => "norm_chisq",
            TestKind::ShapeChisq => "shape_chisq",
            TestKind::Bdm => "bdm",
            TestKind::Ks => "KS",
            TestKind::LlhRatio => "llh_ratio",
            TestKind::LlhValue => "llh_value",
            TestKind::CramerVonMises => "cramer_von_mises",
            TestKind::AndersonDarling => "AD",
        }
    }

    /// Option flag name for this test (as used in config files and `--tests`)
    pub fn flag(self) -> &'static str {
        match self {
            TestKind::Ks => "ks",
            TestKind::AndersonDarling => "anderson_darling",
            other => other.key(),
        }
    }

    /// Resolve a flag name or a result key
    pub fn from_name(name: &str) -> Option<TestKind> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.flag() == name || kind.key() == name)
    }

    fn implementation(self) -> Arc<dyn StatTest> {
        match self {
            TestKind::Chisq => Arc::new(ChiSquare),
            TestKind::NormChisq => Arc::new(NormChiSquare),
            TestKind::ShapeChisq => Arc::new(ShapeChiSquare),
            TestKind::Bdm => Arc::new(Bhattacharyya),
            TestKind::Ks => Arc::new(KolmogorovSmirnov),
            TestKind::LlhRatio => Arc::new(LlhRatio),
            TestKind::LlhValue => Arc::new(LlhValue),
            TestKind::CramerVonMises => Arc::new(CramerVonMises),
            TestKind::AndersonDarling => Arc::new(AndersonDarling),
        }
    }
}

/// Named set of available tests
///
/// # Example
/// ```
/// use histcmp::metrics::TestRegistry;
///
/// let registry = TestRegistry::builtin();
/// assert!(registry.get("AD").is_some());
/// assert!(registry.get("chisq").is_some());
/// assert_eq!(registry.len(), 9);
/// ```
#[derive(Clone, Default)]
pub struct TestRegistry {
    tests: BTreeMap<String, Arc<dyn StatTest>>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in test
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in TestKind::ALL {
            registry.register(kind.implementation());
        }
        registry
    }

    /// Add a test, replacing any previous test with the same name
    pub fn register(&mut self, test: Arc<dyn StatTest>) -> Option<Arc<dyn StatTest>> {
        self.tests.insert(test.name().to_string(), test)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StatTest>> {
        self.tests.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tests.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl std::fmt::Debug for TestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRegistry")
            .field("tests", &self.tests.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reject pairs the tests cannot be defined on
fn check_pair(left: &[f64], right: &[f64]) -> Result<()> {
    if left.len() != right.len() {
        return Err(StatError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Err(StatError::EmptyInput);
    }
    Ok(())
}

/// Integrals of both sides, which must be positive and free of negative bins
fn positive_totals(left: &[f64], right: &[f64]) -> Result<(f64, f64)> {
    if left.iter().chain(right).any(|&v| v < 0.0) {
        return Err(StatError::Degenerate(
            "negative bin content cannot be treated as a count".to_string(),
        ));
    }
    let n1: f64 = left.iter().sum();
    let n2: f64 = right.iter().sum();
    if n1 <= 0.0 || n2 <= 0.0 {
        return Err(StatError::Degenerate(format!(
            "both integrals must be positive, got {} and {}",
            n1, n2
        )));
    }
    Ok((n1, n2))
}

/// Upper tail of the chi-squared distribution
pub(crate) fn chi2_sf(statistic: f64, df: f64) -> Result<f64> {
    if df <= 0.0 {
        return Err(StatError::Degenerate(format!(
            "chi-squared needs positive degrees of freedom, got {}",
            df
        )));
    }
    let dist = ChiSquared::new(df).map_err(|e| StatError::Distribution(e.to_string()))?;
    Ok(dist.sf(statistic))
}

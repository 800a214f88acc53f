// Histogram comparison: precondition gate followed by the test battery
//
// compare(h1, h2, options):
//
//   validate both records        -> MalformedHistogramError (the only error)
//   gate (cheap, positional)     -> single-key verdict, battery never runs
//   executor (isolated workers)  -> one key per enabled test
//
// Incomparable histograms are an expected outcome, not an error: they come back
// as {"comparable": {"pvalue": 0.0}}. Test failures and timeouts are reported
// in-band next to the tests that succeeded.

mod config;
mod executor;
mod gate;
mod result;

pub use config::CompareOptions;
pub use executor::Executor;
pub use gate::evaluate_gate;
pub use result::{ComparisonResult, GateVerdict, TestOutcome, FAILURE_PVALUE};

use crate::histogram::{Histogram, MalformedHistogramError};
use crate::metrics::{StatTest, TestRegistry};
use std::sync::Arc;
use thiserror::Error;

/// Errors that escape a comparison
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    #[error("Malformed histogram: {0}")]
    MalformedHistogram(#[from] MalformedHistogramError),

    #[error("Invalid comparison options: {0}")]
    InvalidOptions(String),

    #[error("Test '{0}' is enabled but not registered")]
    UnknownTest(String),

    #[error("Test name '{0}' is reserved for a gate verdict")]
    ReservedTestName(String),
}

/// Compare two histograms with the built-in tests selected by `options`
///
/// # Example
/// ```
/// use histcmp::comparison::{compare, CompareOptions};
/// use histcmp::histogram::Histogram;
///
/// let h1 = Histogram::new("a", 0.0, 10.0, vec![5.0; 12]);
/// let mut h2 = h1.clone();
/// h2.xmax = 20.0;
///
/// let result = compare(&h1, &h2, &CompareOptions::default()).unwrap();
/// assert_eq!(result.pvalue("comparable"), Some(0.0));
/// assert_eq!(result.len(), 1);
/// ```
pub fn compare(
    h1: &Histogram,
    h2: &Histogram,
    options: &CompareOptions,
) -> Result<ComparisonResult, CompareError> {
    Comparator::new(options.clone())?.compare(h1, h2)
}

/// Options bound to a test registry
///
/// Use this to add custom tests next to the built-in ones.
///
/// # Example
/// ```
/// use histcmp::comparison::{Comparator, CompareOptions};
/// use histcmp::histogram::Histogram;
///
/// let comparator = Comparator::new(CompareOptions::legacy()).unwrap();
/// let h1 = Histogram::new("a", 0.0, 1.0, (1..=20).map(f64::from).collect());
/// let h2 = Histogram::new("a", 0.0, 1.0, (2..=21).map(f64::from).collect());
///
/// let result = comparator.compare(&h1, &h2).unwrap();
/// assert_eq!(result.keys().collect::<Vec<_>>(), vec!["AD", "KS", "chisq"]);
/// ```
#[derive(Debug, Clone)]
pub struct Comparator {
    options: CompareOptions,
    registry: TestRegistry,
    extra_tests: Vec<String>,
}

impl Comparator {
    pub fn new(options: CompareOptions) -> Result<Self, CompareError> {
        options.validate().map_err(CompareError::InvalidOptions)?;
        Ok(Self {
            options,
            registry: TestRegistry::builtin(),
            extra_tests: Vec::new(),
        })
    }

    /// Register a custom test and enable it for every comparison
    ///
    /// Names used by gate verdicts (`identity`, `comparable`, ...) are
    /// rejected so a result can always be told apart from a short circuit.
    pub fn with_test(mut self, test: Arc<dyn StatTest>) -> Result<Self, CompareError> {
        let name = test.name().to_string();
        if GateVerdict::KEYS.contains(&name.as_str()) {
            return Err(CompareError::ReservedTestName(name));
        }

        self.registry.register(test);
        if !self.extra_tests.contains(&name) {
            self.extra_tests.push(name);
        }
        Ok(self)
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Tests that will run for a pair that passes the gate
    pub fn battery(&self) -> Result<Vec<Arc<dyn StatTest>>, CompareError> {
        let builtin = self.options.enabled_tests();
        let names = builtin
            .iter()
            .map(|kind| kind.key())
            .chain(self.extra_tests.iter().map(String::as_str));

        let mut battery: Vec<Arc<dyn StatTest>> = Vec::new();
        for name in names {
            let test = self
                .registry
                .get(name)
                .ok_or_else(|| CompareError::UnknownTest(name.to_string()))?;
            if !battery.iter().any(|t| t.name() == name) {
                battery.push(test);
            }
        }
        Ok(battery)
    }

    pub fn compare(&self, h1: &Histogram, h2: &Histogram) -> Result<ComparisonResult, CompareError> {
        h1.validate()?;
        h2.validate()?;

        if let Some(verdict) = evaluate_gate(h1, h2, self.options.min_common_nonzero_bins) {
            tracing::debug!("Gate verdict for '{}': {} ({})", h1.name, verdict.key(), verdict);
            return Ok(ComparisonResult::from_verdict(verdict));
        }

        let battery = self.battery()?;
        tracing::debug!(
            "Running {} tests on '{}' ({} bins)",
            battery.len(),
            h1.name,
            h1.bin_count()
        );

        Ok(Executor::from_options(&self.options).run(&battery, &h1.bin_values, &h2.bin_values))
    }
}

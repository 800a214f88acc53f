// Options for a histogram comparison
//
// One flag per built-in test, the gate's sufficiency threshold, and the two
// time budgets. Loadable from TOML so a dashboard deployment can pin its
// battery in a file.

use crate::metrics::{Budget, TestKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Which tests to run and how long each may take
///
/// # Example
/// ```
/// use histcmp::comparison::CompareOptions;
///
/// let options = CompareOptions::default();
/// assert!(options.shape_chisq);
/// assert!(options.anderson_darling);
/// assert!(!options.ks);
/// assert_eq!(options.min_common_nonzero_bins, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Raw chi-squared, df = number of occupied bins
    pub chisq: bool,

    /// Chi-squared on the integrals only
    pub norm_chisq: bool,

    /// Chi-squared on the shapes with the integrals factored out
    pub shape_chisq: bool,

    /// Bhattacharyya distance measure
    pub bdm: bool,

    /// Two-sample Kolmogorov-Smirnov
    pub ks: bool,

    /// Poisson likelihood-ratio (G) test
    pub llh_ratio: bool,

    /// Poisson log-likelihood value
    ///
    /// Often -inf for histograms with moderate bin contents and sparse
    /// reference bins, which shows up as a failed test.
    pub llh_value: bool,

    /// Two-sample Cramer-von Mises
    pub cramer_von_mises: bool,

    /// k-sample Anderson-Darling
    pub anderson_darling: bool,

    /// A pair with this many or fewer bins that are positive on both sides
    /// is reported as `insufficient_statistics` instead of being tested
    ///
    /// Below this, the sample-based tests are unreliable and prone to hangs.
    pub min_common_nonzero_bins: usize,

    /// Budget for closed-form tests (milliseconds)
    pub short_timeout_ms: u64,

    /// Budget for KS, Cramer-von Mises and Anderson-Darling (milliseconds)
    pub long_timeout_ms: u64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            chisq: false,
            norm_chisq: false,
            shape_chisq: true,
            bdm: false,
            ks: false,
            llh_ratio: false,
            llh_value: false,
            cramer_von_mises: false,
            anderson_darling: true,
            min_common_nonzero_bins: 10,
            short_timeout_ms: 1_000,
            long_timeout_ms: 10_000,
        }
    }
}

impl CompareOptions {
    /// Options with every test disabled
    pub fn none() -> Self {
        Self {
            shape_chisq: false,
            anderson_darling: false,
            ..Self::default()
        }
    }

    /// The dashboard's original inline battery: chisq, KS and AD
    pub fn legacy() -> Self {
        Self::none()
            .with_test(TestKind::Chisq, true)
            .with_test(TestKind::Ks, true)
            .with_test(TestKind::AndersonDarling, true)
    }

    /// Every built-in test
    pub fn all() -> Self {
        TestKind::ALL
            .into_iter()
            .fold(Self::none(), |options, kind| options.with_test(kind, true))
    }

    /// Enable or disable one test
    ///
    /// # Example
    /// ```
    /// use histcmp::comparison::CompareOptions;
    /// use histcmp::metrics::TestKind;
    ///
    /// let options = CompareOptions::none().with_test(TestKind::Ks, true);
    /// assert_eq!(options.enabled_tests(), vec![TestKind::Ks]);
    /// ```
    pub fn with_test(mut self, kind: TestKind, enabled: bool) -> Self {
        *self.flag_mut(kind) = enabled;
        self
    }

    pub fn with_timeouts(mut self, short: Duration, long: Duration) -> Self {
        self.short_timeout_ms = short.as_millis() as u64;
        self.long_timeout_ms = long.as_millis() as u64;
        self
    }

    pub fn with_min_common_nonzero_bins(mut self, bins: usize) -> Self {
        self.min_common_nonzero_bins = bins;
        self
    }

    pub fn is_enabled(&self, kind: TestKind) -> bool {
        match kind {
            TestKind::Chisq => self.chisq,
            TestKind::NormChisq => self.norm_chisq,
            TestKind::ShapeChisq => self.shape_chisq,
            TestKind::Bdm => self.bdm,
            TestKind::Ks => self.ks,
            TestKind::LlhRatio => self.llh_ratio,
            TestKind::LlhValue => self.llh_value,
            TestKind::CramerVonMises => self.cramer_von_mises,
            TestKind::AndersonDarling => self.anderson_darling,
        }
    }

    fn flag_mut(&mut self, kind: TestKind) -> &mut bool {
        match kind {
            TestKind::Chisq => &mut self.chisq,
            TestKind::NormChisq => &mut self.norm_chisq,
            TestKind::ShapeChisq => &mut self.shape_chisq,
            TestKind::Bdm => &mut self.bdm,
            TestKind::Ks => &mut self.ks,
            TestKind::LlhRatio => &mut self.llh_ratio,
            TestKind::LlhValue => &mut self.llh_value,
            TestKind::CramerVonMises => &mut self.cramer_von_mises,
            TestKind::AndersonDarling => &mut self.anderson_darling,
        }
    }

    /// Enabled built-in tests in a stable order
    pub fn enabled_tests(&self) -> Vec<TestKind> {
        TestKind::ALL
            .into_iter()
            .filter(|&kind| self.is_enabled(kind))
            .collect()
    }

    /// Time allowed for a test of the given budget class
    pub fn timeout_for(&self, budget: Budget) -> Duration {
        match budget {
            Budget::Short => Duration::from_millis(self.short_timeout_ms),
            Budget::Long => Duration::from_millis(self.long_timeout_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.short_timeout_ms == 0 {
            return Err("short_timeout_ms must be positive, got 0".to_string());
        }

        if self.long_timeout_ms == 0 {
            return Err("long_timeout_ms must be positive, got 0".to_string());
        }

        Ok(())
    }

    /// Load options from a TOML file
    ///
    /// Missing keys take their default values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: CompareOptions = toml::from_str(content).context("Failed to parse TOML")?;
        options.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(options)
    }
}

//! Histogram records and bin-wise comparability utilities
//!
//! A [`Histogram`] is the minimal record the comparison core consumes: a
//! name, the axis bounds, and one value per bin. Records usually come from a
//! document store as JSON, so unknown fields (ids, under/overflow counters,
//! bin widths) are ignored on input.
//!
//! Two histograms are only meaningfully comparable when their name, bounds
//! and bin count all match. Everything here compares by bin position.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input record that cannot be compared at all
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedHistogramError {
    #[error("Failed to parse histogram record: {0}")]
    Parse(String),

    #[error("Histogram record in a set has an empty name")]
    EmptyName,

    #[error("Histogram '{name}' has non-finite bounds [{xmin}, {xmax}]")]
    NonFiniteBounds { name: String, xmin: f64, xmax: f64 },

    #[error("Histogram '{name}' has inverted or zero-width bounds [{xmin}, {xmax}]")]
    InvalidBounds { name: String, xmin: f64, xmax: f64 },

    #[error("Histogram '{name}' has no bins")]
    NoBins { name: String },

    #[error("Histogram '{name}' has a non-finite value in bin {bin}")]
    NonFiniteBin { name: String, bin: usize },
}

/// A binned frequency distribution
///
/// # Example
/// ```
/// use histcmp::histogram::Histogram;
///
/// let h = Histogram::new("energy", 0.0, 10.0, vec![0.0, 3.0, 5.0, 0.0]);
/// assert_eq!(h.bin_count(), 4);
/// assert_eq!(h.nonzero_bins(), 2);
/// assert_eq!(h.integral(), 8.0);
/// assert!(!h.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub name: String,
    pub xmin: f64,
    pub xmax: f64,
    pub bin_values: Vec<f64>,
}

impl Histogram {
    pub fn new(name: impl Into<String>, xmin: f64, xmax: f64, bin_values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            xmin,
            xmax,
            bin_values,
        }
    }

    /// Parse a single record from JSON and validate it
    pub fn from_json_str(content: &str) -> Result<Self, MalformedHistogramError> {
        let histogram: Histogram = serde_json::from_str(content)
            .map_err(|e| MalformedHistogramError::Parse(e.to_string()))?;
        histogram.validate()?;
        Ok(histogram)
    }

    /// Check that the record is internally consistent
    ///
    /// Bin contents are not required to be positive; weighted histograms can
    /// carry negative entries, and the emptiness check treats them as empty.
    /// The name is not checked here: a name mismatch, empty or not, is a gate
    /// verdict rather than a malformed record.
    pub fn validate(&self) -> Result<(), MalformedHistogramError> {
        if !self.xmin.is_finite() || !self.xmax.is_finite() {
            return Err(MalformedHistogramError::NonFiniteBounds {
                name: self.name.clone(),
                xmin: self.xmin,
                xmax: self.xmax,
            });
        }

        if self.xmin >= self.xmax {
            return Err(MalformedHistogramError::InvalidBounds {
                name: self.name.clone(),
                xmin: self.xmin,
                xmax: self.xmax,
            });
        }

        if self.bin_values.is_empty() {
            return Err(MalformedHistogramError::NoBins {
                name: self.name.clone(),
            });
        }

        if let Some(bin) = self.bin_values.iter().position(|v| !v.is_finite()) {
            return Err(MalformedHistogramError::NonFiniteBin {
                name: self.name.clone(),
                bin,
            });
        }

        Ok(())
    }

    pub fn bin_count(&self) -> usize {
        self.bin_values.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.xmax - self.xmin) / self.bin_values.len().max(1) as f64
    }

    /// Sum of all bin contents
    pub fn integral(&self) -> f64 {
        self.bin_values.iter().sum()
    }

    /// True when no bin has positive content
    pub fn is_empty(&self) -> bool {
        !self.bin_values.iter().any(|&v| v > 0.0)
    }

    /// Number of bins whose content is not exactly zero
    pub fn nonzero_bins(&self) -> usize {
        self.bin_values.iter().filter(|&&v| v != 0.0).count()
    }

    /// Same name, same bounds, same number of bins
    pub fn is_comparable_with(&self, other: &Histogram) -> bool {
        self.xmin == other.xmin
            && self.xmax == other.xmax
            && self.name == other.name
            && self.bin_values.len() == other.bin_values.len()
    }

    /// Element-wise equal bin contents
    pub fn is_identical_to(&self, other: &Histogram) -> bool {
        self.bin_values == other.bin_values
    }

    /// Number of bin positions where both histograms are strictly positive
    pub fn common_nonzero_bins(&self, other: &Histogram) -> usize {
        self.bin_values
            .iter()
            .zip(&other.bin_values)
            .filter(|(&u, &v)| u > 0.0 && v > 0.0)
            .count()
    }
}

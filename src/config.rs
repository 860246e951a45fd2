//! Filter configuration.

use crate::error::{Result, SieveError};
use crate::hasher::check_width;
use serde::{Deserialize, Serialize};

/// Configuration for one duplicate-filter namespace.
///
/// Every fingerprint compared within a namespace must be built and judged
/// under the same configuration; mixing widths or thresholds across
/// components is rejected at construction or call time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fingerprint width in bits (1-128).
    pub bit_width: u32,
    /// Similarity above which (strictly) a candidate counts as a near-duplicate.
    pub similarity_threshold: f64,
    /// Maximum number of features consumed from the extractor per document.
    pub feature_limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bit_width: 64,
            similarity_threshold: 0.8,
            feature_limit: 20,
        }
    }
}

impl FilterConfig {
    /// Validate all fields.
    pub fn validate(&self) -> Result<()> {
        check_width(self.bit_width)?;
        check_threshold(self.similarity_threshold)?;
        if self.feature_limit == 0 {
            return Err(SieveError::InvalidConfig(
                "feature_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a similarity threshold. Rejects NaN and values outside [0, 1].
pub(crate) fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SieveError::InvalidConfig(format!(
            "similarity threshold must be within [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

//! Weighted content features and the extraction boundary.
//!
//! The engine never tokenizes content itself. Raw text crosses into
//! fingerprinting through a [`FeatureExtractor`], typically a client for an
//! external keyword service (TF-IDF or similar). [`TermFrequencyExtractor`]
//! is the bundled in-process implementation for tests and single-binary
//! deployments.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A weighted content feature.
///
/// Tokens are opaque to the engine; the weight expresses how strongly the
/// token pulls fingerprint bits toward its hash. Weights must be finite and
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Token text.
    pub token: String,
    /// Feature weight.
    pub weight: f64,
}

impl Feature {
    /// Create a feature from a token and weight.
    pub fn new(token: impl Into<String>, weight: f64) -> Self {
        Self {
            token: token.into(),
            weight,
        }
    }
}

impl<S: Into<String>> From<(S, f64)> for Feature {
    fn from((token, weight): (S, f64)) -> Self {
        Self::new(token, weight)
    }
}

/// Produces weighted features from raw content.
///
/// Implementations must be deterministic and emit finite, non-negative
/// weights; the admission filter rejects anything else as malformed output.
pub trait FeatureExtractor {
    /// Extract up to `limit` weighted features from `content`.
    fn extract(&self, content: &str, limit: usize) -> Result<Vec<Feature>>;
}

/// Term-frequency feature extractor.
///
/// Splits content on non-alphanumeric boundaries, lowercases each term, and
/// weights it by occurrence count. Output is ordered by weight descending,
/// then token ascending, so the highest-signal terms survive truncation and
/// extraction is deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermFrequencyExtractor;

impl FeatureExtractor for TermFrequencyExtractor {
    fn extract(&self, content: &str, limit: usize) -> Result<Vec<Feature>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for term in content.split(|c: char| !c.is_alphanumeric()) {
            if term.is_empty() {
                continue;
            }
            *counts.entry(term.to_lowercase()).or_insert(0) += 1;
        }

        let mut features: Vec<Feature> = counts
            .into_iter()
            .map(|(token, count)| Feature::new(token, count as f64))
            .collect();
        features.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.token.cmp(&b.token))
        });
        features.truncate(limit);
        Ok(features)
    }
}

//! Duplicate admission filter: the pipeline-facing front end.
//!
//! One filter serves one namespace. It owns the fingerprint builder, the
//! feature-extraction boundary, and a membership store, and exposes three
//! admission entry points at increasing levels of preparation: raw content,
//! extracted features, a finished fingerprint.

use crate::config::FilterConfig;
use crate::error::{Result, SieveError};
use crate::feature::{Feature, FeatureExtractor, TermFrequencyExtractor};
use crate::hasher::TokenHasher;
use crate::simhash::{Fingerprint, SimhashBuilder};
use crate::store::{Admission, FingerprintStore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a filter's admission outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterStats {
    /// Submissions admitted as new content.
    pub admitted: u64,
    /// Submissions rejected on an exact fingerprint match.
    pub duplicate_exact: u64,
    /// Submissions rejected on a near-duplicate match.
    pub duplicate_near: u64,
}

impl FilterStats {
    /// Total submissions that reached an admission decision.
    pub fn submitted(&self) -> u64 {
        self.admitted + self.duplicate_exact + self.duplicate_near
    }
}

/// Near-duplicate admission filter over a membership store.
///
/// # Example
///
/// ```
/// use simsieve::{DuplicateFilter, FilterConfig, LocalStore};
///
/// let store = LocalStore::new(64).unwrap();
/// let filter = DuplicateFilter::new(FilterConfig::default(), store).unwrap();
///
/// assert!(filter.admit_content("fresh wire story").unwrap().is_admitted());
/// assert!(filter.admit_content("fresh wire story").unwrap().is_duplicate());
/// ```
pub struct DuplicateFilter<S, E = TermFrequencyExtractor> {
    config: FilterConfig,
    builder: SimhashBuilder,
    extractor: E,
    store: S,
    admitted: AtomicU64,
    duplicate_exact: AtomicU64,
    duplicate_near: AtomicU64,
}

impl<S: FingerprintStore> DuplicateFilter<S> {
    /// Create a filter with the bundled [`TermFrequencyExtractor`].
    pub fn new(config: FilterConfig, store: S) -> Result<Self> {
        Self::with_extractor(config, store, TermFrequencyExtractor)
    }
}

impl<S: FingerprintStore, E: FeatureExtractor> DuplicateFilter<S, E> {
    /// Create a filter with a custom feature extractor.
    pub fn with_extractor(config: FilterConfig, store: S, extractor: E) -> Result<Self> {
        config.validate()?;
        let builder = SimhashBuilder::new(config.bit_width)?;
        Self::assemble(config, store, extractor, builder)
    }

    /// Create a filter with a custom extractor and token hasher.
    pub fn with_hasher<H>(config: FilterConfig, store: S, extractor: E, hasher: H) -> Result<Self>
    where
        H: TokenHasher + Send + Sync + 'static,
    {
        config.validate()?;
        let builder = SimhashBuilder::with_hasher(config.bit_width, hasher)?;
        Self::assemble(config, store, extractor, builder)
    }

    fn assemble(
        config: FilterConfig,
        store: S,
        extractor: E,
        builder: SimhashBuilder,
    ) -> Result<Self> {
        if store.bit_width() != config.bit_width {
            return Err(SieveError::InvalidConfig(format!(
                "store holds {}-bit fingerprints, config expects {}",
                store.bit_width(),
                config.bit_width
            )));
        }
        Ok(Self {
            config,
            builder,
            extractor,
            store,
            admitted: AtomicU64::new(0),
            duplicate_exact: AtomicU64::new(0),
            duplicate_near: AtomicU64::new(0),
        })
    }

    /// Extract features from raw content and admit the result.
    ///
    /// At most `feature_limit` features are consumed from the extractor.
    pub fn admit_content(&self, content: &str) -> Result<Admission> {
        let fingerprint = self.fingerprint_content(content)?;
        self.admit_fingerprint(fingerprint)
    }

    /// Admit pre-extracted weighted features.
    pub fn admit_features(&self, features: &[Feature]) -> Result<Admission> {
        check_weights(features)?;
        self.admit_fingerprint(self.builder.fingerprint(features))
    }

    /// Admit an already-built fingerprint.
    pub fn admit_fingerprint(&self, fingerprint: Fingerprint) -> Result<Admission> {
        if fingerprint.bits() != self.config.bit_width {
            return Err(SieveError::WidthMismatch {
                left: self.config.bit_width,
                right: fingerprint.bits(),
            });
        }
        let outcome = self
            .store
            .admit(fingerprint, self.config.similarity_threshold)?;
        self.record(&outcome);
        Ok(outcome)
    }

    /// Fingerprint raw content without touching the store.
    pub fn fingerprint_content(&self, content: &str) -> Result<Fingerprint> {
        let mut features = self
            .extractor
            .extract(content, self.config.feature_limit)?;
        features.truncate(self.config.feature_limit);
        check_weights(&features)?;
        Ok(self.builder.fingerprint(&features))
    }

    /// Fingerprint a feature set without touching the store.
    pub fn fingerprint_features(&self, features: &[Feature]) -> Result<Fingerprint> {
        check_weights(features)?;
        Ok(self.builder.fingerprint(features))
    }

    /// The configuration this filter was built with.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the outcome counters.
    pub fn stats(&self) -> FilterStats {
        FilterStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            duplicate_exact: self.duplicate_exact.load(Ordering::Relaxed),
            duplicate_near: self.duplicate_near.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &Admission) {
        let counter = match outcome {
            Admission::Admitted(_) => &self.admitted,
            Admission::DuplicateExact => &self.duplicate_exact,
            Admission::DuplicateNear { .. } => &self.duplicate_near,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Reject non-finite or negative weights as malformed extractor output.
fn check_weights(features: &[Feature]) -> Result<()> {
    for feature in features {
        if !feature.weight.is_finite() || feature.weight < 0.0 {
            return Err(SieveError::Extraction(format!(
                "feature {:?} has invalid weight {}",
                feature.token, feature.weight
            )));
        }
    }
    Ok(())
}

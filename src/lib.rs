//! simsieve: content fingerprinting and near-duplicate admission.
//!
//! Ingestion pipelines ask one question of every incoming document: have we
//! effectively seen this before? simsieve answers it with SimHash
//! fingerprints, fixed-width bit patterns whose Hamming distance tracks
//! content similarity, and a grow-only membership store per namespace that
//! admits or rejects each submission.
//!
//! # Pipeline
//!
//! 1. A [`FeatureExtractor`] turns content into weighted `(token, weight)`
//!    features (or the caller supplies them directly).
//! 2. A [`SimhashBuilder`] hashes each token and accumulates signed,
//!    weighted votes per bit position into a [`Fingerprint`].
//! 3. A [`FingerprintStore`] runs admission: exact membership check, near
//!    scan against every stored fingerprint, insert. The outcome is an
//!    [`Admission`], never an error.
//!
//! # Choosing a store
//!
//! - [`LocalStore`]: single process, linearizable admission.
//! - [`SegmentedStore`]: single process, pigeonhole-indexed near scan with
//!   decisions identical to the linear one.
//! - [`SharedStore`]: many processes over one keyed-set service, at the cost
//!   of a non-atomic admission sequence.
//!
//! # Example
//!
//! ```
//! use simsieve::{DuplicateFilter, FilterConfig, LocalStore};
//!
//! let store = LocalStore::new(64).unwrap();
//! let filter = DuplicateFilter::new(FilterConfig::default(), store).unwrap();
//!
//! let first = filter.admit_content("breaking: heavy snow closes the pass").unwrap();
//! assert!(first.is_admitted());
//!
//! let second = filter.admit_content("breaking: heavy snow closes the pass").unwrap();
//! assert!(second.is_duplicate());
//! ```
//!
//! # References
//!
//! - Charikar (2002). "Similarity estimation techniques from rounding algorithms"
//! - Manku et al. (2007). "Detecting near-duplicates for web crawling"

pub mod config;
pub mod error;
pub mod feature;
pub mod filter;
pub mod hasher;
pub mod simhash;
pub mod store;

pub use config::FilterConfig;
pub use error::{Result, SieveError};
pub use feature::{Feature, FeatureExtractor, TermFrequencyExtractor};
pub use filter::{DuplicateFilter, FilterStats};
pub use hasher::{PolyTokenHasher, TokenHasher, Xxh3TokenHasher, MAX_BITS};
pub use simhash::{Fingerprint, SimhashBuilder};
pub use store::{
    Admission, FingerprintStore, InMemoryKeyedSet, KeyedSetClient, LocalStore, SegmentedStore,
    SharedStore,
};

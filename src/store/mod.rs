//! Membership stores and the admission sequence.
//!
//! A store holds every fingerprint ever admitted into one namespace and
//! decides admission in three steps: exact membership check, linear
//! near-duplicate scan, insert. Stores are grow-only; nothing evicts, so a
//! namespace that never resets scans over everything it has ever admitted.
//!
//! Three backends ship here:
//!
//! - [`LocalStore`]: in-process, the whole sequence in one critical section.
//! - [`SegmentedStore`]: in-process, with pigeonhole segment tables that cut
//!   the scan to colliding candidates while keeping decisions identical.
//! - [`SharedStore`]: an external keyed-set service shared across processes,
//!   with the non-atomic check-then-act sequence that implies.

mod local;
mod segmented;
mod shared;

pub use local::LocalStore;
pub use segmented::SegmentedStore;
pub use shared::{InMemoryKeyedSet, KeyedSetClient, SharedStore};

use crate::config::check_threshold;
use crate::error::Result;
use crate::simhash::Fingerprint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of submitting a fingerprint for admission.
///
/// Duplicates are successful outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    /// The fingerprint was new and is now stored.
    Admitted(Fingerprint),
    /// An identical fingerprint was already stored.
    DuplicateExact,
    /// A stored fingerprint was similar beyond the namespace threshold.
    DuplicateNear {
        /// Hamming distance to the matched fingerprint.
        distance: u32,
        /// The stored fingerprint that matched. Which member is named is
        /// unspecified when several match.
        matched: Fingerprint,
    },
}

impl Admission {
    /// Whether the submission was admitted as new content.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    /// Whether the submission was rejected as a duplicate, exact or near.
    pub fn is_duplicate(&self) -> bool {
        !self.is_admitted()
    }
}

/// Membership store for one namespace's fingerprints.
///
/// The provided [`admit`] implementation composes `contains`, `members`,
/// and `insert` with no atomicity across the three steps. That is the
/// contract shared backends actually get: two concurrent writers can each
/// pass the scan before either insert lands, and both admit near-duplicate
/// content. In-process backends override [`admit`] to run the sequence in
/// one critical section, which makes concurrent duels produce exactly one
/// winner.
///
/// [`admit`]: FingerprintStore::admit
pub trait FingerprintStore {
    /// Width of every fingerprint in this store.
    fn bit_width(&self) -> u32;

    /// Exact membership check.
    fn contains(&self, fingerprint: Fingerprint) -> Result<bool>;

    /// Snapshot of all stored fingerprints.
    fn members(&self) -> Result<Vec<Fingerprint>>;

    /// Insert without any duplicate checks. Re-inserting a member is a no-op.
    fn insert(&self, fingerprint: Fingerprint) -> Result<()>;

    /// Number of stored fingerprints.
    fn len(&self) -> Result<usize>;

    /// Whether the store holds no fingerprints.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Run the admission sequence: exact check, near scan, insert.
    fn admit(&self, fingerprint: Fingerprint, threshold: f64) -> Result<Admission> {
        check_threshold(threshold)?;
        if self.contains(fingerprint)? {
            return Ok(Admission::DuplicateExact);
        }
        if let Some((distance, matched)) =
            scan_near_duplicate(self.members()?, fingerprint, threshold)?
        {
            return Ok(Admission::DuplicateNear { distance, matched });
        }
        self.insert(fingerprint)?;
        Ok(Admission::Admitted(fingerprint))
    }
}

/// Scan `stored` for the first fingerprint whose similarity to `probe`
/// strictly exceeds `threshold`.
pub(crate) fn scan_near_duplicate<I>(
    stored: I,
    probe: Fingerprint,
    threshold: f64,
) -> Result<Option<(u32, Fingerprint)>>
where
    I: IntoIterator<Item = Fingerprint>,
{
    for candidate in stored {
        if probe.is_near_duplicate(&candidate, threshold)? {
            let distance = probe.hamming_distance(&candidate)?;
            return Ok(Some((distance, candidate)));
        }
    }
    Ok(None)
}

// Delegation impls so one store can back several filters or threads. `admit`
// is forwarded explicitly: the default composition must not shadow a
// backend's single-critical-section override.

impl<S: FingerprintStore + ?Sized> FingerprintStore for &S {
    fn bit_width(&self) -> u32 {
        (**self).bit_width()
    }

    fn contains(&self, fingerprint: Fingerprint) -> Result<bool> {
        (**self).contains(fingerprint)
    }

    fn members(&self) -> Result<Vec<Fingerprint>> {
        (**self).members()
    }

    fn insert(&self, fingerprint: Fingerprint) -> Result<()> {
        (**self).insert(fingerprint)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }

    fn is_empty(&self) -> Result<bool> {
        (**self).is_empty()
    }

    fn admit(&self, fingerprint: Fingerprint, threshold: f64) -> Result<Admission> {
        (**self).admit(fingerprint, threshold)
    }
}

impl<S: FingerprintStore + ?Sized> FingerprintStore for Arc<S> {
    fn bit_width(&self) -> u32 {
        (**self).bit_width()
    }

    fn contains(&self, fingerprint: Fingerprint) -> Result<bool> {
        (**self).contains(fingerprint)
    }

    fn members(&self) -> Result<Vec<Fingerprint>> {
        (**self).members()
    }

    fn insert(&self, fingerprint: Fingerprint) -> Result<()> {
        (**self).insert(fingerprint)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }

    fn is_empty(&self) -> Result<bool> {
        (**self).is_empty()
    }

    fn admit(&self, fingerprint: Fingerprint, threshold: f64) -> Result<Admission> {
        (**self).admit(fingerprint, threshold)
    }
}

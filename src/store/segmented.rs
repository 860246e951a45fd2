//! Segment-partitioned membership store.
//!
//! Splits each fingerprint into `k + 1` contiguous bit segments, where `k`
//! is the largest Hamming distance that still clears the namespace's
//! similarity threshold. Any stored fingerprint within distance `k` of a
//! probe agrees with it exactly on at least one segment (pigeonhole), so the
//! near scan collects candidates from per-segment exact-match tables and
//! verifies them with the full comparator. Decisions are identical to the
//! linear scan; only the probe cost changes. Which matching member gets
//! reported may differ from the linear scan when several match.
//!
//! ## References
//!
//! - Manku et al. (2007). "Detecting near-duplicates for web crawling"

use super::{Admission, FingerprintStore};
use crate::config::check_threshold;
use crate::error::{Result, SieveError};
use crate::hasher::{check_width, width_mask};
use crate::simhash::Fingerprint;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One contiguous bit range of a fingerprint.
#[derive(Debug, Clone, Copy)]
struct Segment {
    shift: u32,
    mask: u128,
}

impl Segment {
    fn key(&self, value: u128) -> u128 {
        (value >> self.shift) & self.mask
    }
}

#[derive(Debug)]
struct SegmentedInner {
    /// Stored fingerprint values in insertion order.
    values: Vec<u128>,
    /// Exact membership.
    index: HashSet<u128>,
    /// Per-segment tables: segment key to indices into `values`.
    tables: Vec<HashMap<u128, Vec<usize>>>,
}

/// In-process store with pigeonhole candidate lookup.
///
/// Built for one `(bits, threshold)` pair; the segment layout depends on
/// both, so [`admit`](FingerprintStore::admit) rejects any other threshold.
/// Like [`super::LocalStore`], the whole admission sequence runs in one
/// critical section and membership only grows.
#[derive(Debug)]
pub struct SegmentedStore {
    bits: u32,
    threshold: f64,
    max_near_distance: Option<u32>,
    segments: Vec<Segment>,
    inner: Mutex<SegmentedInner>,
}

impl SegmentedStore {
    /// Create an empty store for `bits`-wide fingerprints judged at
    /// `threshold`.
    pub fn new(bits: u32, threshold: f64) -> Result<Self> {
        check_width(bits)?;
        check_threshold(threshold)?;

        let max_near = max_near_distance(bits, threshold);
        let segments = match max_near {
            Some(k) => build_segments(bits, k + 1),
            None => Vec::new(),
        };
        let inner = SegmentedInner {
            values: Vec::new(),
            index: HashSet::new(),
            tables: (0..segments.len()).map(|_| HashMap::new()).collect(),
        };

        Ok(Self {
            bits,
            threshold,
            max_near_distance: max_near,
            segments,
            inner: Mutex::new(inner),
        })
    }

    /// The similarity threshold this store was built for.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Largest Hamming distance that still counts as a near-duplicate, or
    /// `None` when no distance clears the threshold (threshold 1.0).
    pub fn max_near_distance(&self) -> Option<u32> {
        self.max_near_distance
    }

    fn lock(&self) -> MutexGuard<'_, SegmentedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_fingerprint(&self, fingerprint: Fingerprint) -> Result<()> {
        if fingerprint.bits() != self.bits {
            return Err(SieveError::WidthMismatch {
                left: self.bits,
                right: fingerprint.bits(),
            });
        }
        Ok(())
    }

    fn find_near(
        &self,
        inner: &SegmentedInner,
        probe: Fingerprint,
    ) -> Result<Option<(u32, Fingerprint)>> {
        let mut seen: HashSet<usize> = HashSet::new();
        for (table, segment) in inner.tables.iter().zip(&self.segments) {
            if let Some(ids) = table.get(&segment.key(probe.value())) {
                for &id in ids {
                    if !seen.insert(id) {
                        continue;
                    }
                    let candidate = Fingerprint::from_value(inner.values[id], self.bits)?;
                    if probe.is_near_duplicate(&candidate, self.threshold)? {
                        let distance = probe.hamming_distance(&candidate)?;
                        return Ok(Some((distance, candidate)));
                    }
                }
            }
        }
        Ok(None)
    }

    // `index` is updated first: a panic mid-insert may hide the member from
    // the near scan, but exact membership stays correct.
    fn insert_locked(&self, inner: &mut SegmentedInner, value: u128) {
        if !inner.index.insert(value) {
            return;
        }
        let id = inner.values.len();
        inner.values.push(value);
        for (table, segment) in inner.tables.iter_mut().zip(&self.segments) {
            table.entry(segment.key(value)).or_default().push(id);
        }
    }
}

impl FingerprintStore for SegmentedStore {
    fn bit_width(&self) -> u32 {
        self.bits
    }

    fn contains(&self, fingerprint: Fingerprint) -> Result<bool> {
        self.check_fingerprint(fingerprint)?;
        Ok(self.lock().index.contains(&fingerprint.value()))
    }

    fn members(&self) -> Result<Vec<Fingerprint>> {
        self.lock()
            .values
            .iter()
            .map(|&value| Fingerprint::from_value(value, self.bits))
            .collect()
    }

    fn insert(&self, fingerprint: Fingerprint) -> Result<()> {
        self.check_fingerprint(fingerprint)?;
        let mut inner = self.lock();
        self.insert_locked(&mut inner, fingerprint.value());
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock().values.len())
    }

    fn admit(&self, fingerprint: Fingerprint, threshold: f64) -> Result<Admission> {
        self.check_fingerprint(fingerprint)?;
        if threshold != self.threshold {
            return Err(SieveError::InvalidConfig(format!(
                "store built for threshold {}, admit called with {}",
                self.threshold, threshold
            )));
        }

        let mut inner = self.lock();
        if inner.index.contains(&fingerprint.value()) {
            return Ok(Admission::DuplicateExact);
        }
        if let Some((distance, matched)) = self.find_near(&inner, fingerprint)? {
            return Ok(Admission::DuplicateNear { distance, matched });
        }
        self.insert_locked(&mut inner, fingerprint.value());
        Ok(Admission::Admitted(fingerprint))
    }
}

/// Largest distance d with `(bits - d) / bits > threshold`.
fn max_near_distance(bits: u32, threshold: f64) -> Option<u32> {
    (0..=bits)
        .rev()
        .find(|&d| (bits - d) as f64 / bits as f64 > threshold)
}

/// Split `bits` into `count` contiguous segments with sizes differing by at
/// most one bit.
fn build_segments(bits: u32, count: u32) -> Vec<Segment> {
    let base = bits / count;
    let extra = bits % count;
    let mut segments = Vec::with_capacity(count as usize);
    let mut shift = 0;
    for i in 0..count {
        let len = if i < extra { base + 1 } else { base };
        segments.push(Segment {
            shift,
            mask: width_mask(len),
        });
        shift += len;
    }
    segments
}

//! In-process membership store.

use super::{Admission, FingerprintStore};
use crate::config::check_threshold;
use crate::error::{Result, SieveError};
use crate::hasher::check_width;
use crate::simhash::Fingerprint;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-guarded in-process store.
///
/// One instance is one namespace. The whole admission sequence runs inside a
/// single critical section, so concurrent submissions of near-duplicate
/// content admit exactly one winner. Membership only grows; the near scan is
/// linear over everything ever admitted.
#[derive(Debug)]
pub struct LocalStore {
    bits: u32,
    values: Mutex<HashSet<u128>>,
}

impl LocalStore {
    /// Create an empty store for `bits`-wide fingerprints.
    pub fn new(bits: u32) -> Result<Self> {
        check_width(bits)?;
        Ok(Self {
            bits,
            values: Mutex::new(HashSet::new()),
        })
    }

    // Every mutation under the lock is a single set call, so the data stays
    // consistent even if a previous holder panicked.
    fn lock(&self) -> MutexGuard<'_, HashSet<u128>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
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
}

impl FingerprintStore for LocalStore {
    fn bit_width(&self) -> u32 {
        self.bits
    }

    fn contains(&self, fingerprint: Fingerprint) -> Result<bool> {
        self.check_fingerprint(fingerprint)?;
        Ok(self.lock().contains(&fingerprint.value()))
    }

    fn members(&self) -> Result<Vec<Fingerprint>> {
        self.lock()
            .iter()
            .map(|&value| Fingerprint::from_value(value, self.bits))
            .collect()
    }

    fn insert(&self, fingerprint: Fingerprint) -> Result<()> {
        self.check_fingerprint(fingerprint)?;
        self.lock().insert(fingerprint.value());
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock().len())
    }

    fn admit(&self, fingerprint: Fingerprint, threshold: f64) -> Result<Admission> {
        self.check_fingerprint(fingerprint)?;
        check_threshold(threshold)?;

        let mut values = self.lock();
        if values.contains(&fingerprint.value()) {
            return Ok(Admission::DuplicateExact);
        }
        for &stored in values.iter() {
            let candidate = Fingerprint::from_value(stored, self.bits)?;
            if fingerprint.is_near_duplicate(&candidate, threshold)? {
                let distance = fingerprint.hamming_distance(&candidate)?;
                return Ok(Admission::DuplicateNear {
                    distance,
                    matched: candidate,
                });
            }
        }
        values.insert(fingerprint.value());
        Ok(Admission::Admitted(fingerprint))
    }
}

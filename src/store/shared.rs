//! Shared membership store over an external keyed-set service.
//!
//! Multiple processes deduplicate against one namespace by pointing their
//! stores at the same service key (Redis sets are the usual deployment:
//! `SISMEMBER` / `SMEMBERS` / `SADD`). The admission sequence runs as three
//! separate service calls with no cross-step atomicity; see
//! [`FingerprintStore`] for what that means under concurrency.

use super::FingerprintStore;
use crate::error::{Result, SieveError};
use crate::hasher::check_width;
use crate::simhash::Fingerprint;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Client for an external keyed-set service.
///
/// Implementations are blocking. Retry, timeout, and failover policy belong
/// to the implementation or its caller, never to the stores built on top.
/// Failures surface as [`SieveError::StoreUnavailable`]; how values are
/// encoded on the wire is the implementation's concern.
pub trait KeyedSetClient {
    /// Whether `value` is a member of the set at `key`.
    fn exists(&self, key: &str, value: u128) -> Result<bool>;

    /// All members of the set at `key`.
    fn members(&self, key: &str) -> Result<Vec<u128>>;

    /// Add `value` to the set at `key`.
    fn add(&self, key: &str, value: u128) -> Result<()>;
}

impl<C: KeyedSetClient + ?Sized> KeyedSetClient for &C {
    fn exists(&self, key: &str, value: u128) -> Result<bool> {
        (**self).exists(key, value)
    }

    fn members(&self, key: &str) -> Result<Vec<u128>> {
        (**self).members(key)
    }

    fn add(&self, key: &str, value: u128) -> Result<()> {
        (**self).add(key, value)
    }
}

impl<C: KeyedSetClient + ?Sized> KeyedSetClient for Arc<C> {
    fn exists(&self, key: &str, value: u128) -> Result<bool> {
        (**self).exists(key, value)
    }

    fn members(&self, key: &str) -> Result<Vec<u128>> {
        (**self).members(key)
    }

    fn add(&self, key: &str, value: u128) -> Result<()> {
        (**self).add(key, value)
    }
}

/// Store backed by one keyed set in a shared service.
///
/// The namespace key scopes one ingest namespace, e.g. `"news:simhash_set"`.
/// Admission uses the inherited check-then-act sequence: two writers racing
/// on near-duplicate content can both admit. Deployments that need the
/// strict single-winner guarantee must serialize submissions externally or
/// use an in-process store.
///
/// Values read back from the service are reduced to the store's width, so a
/// namespace only ever yields comparable fingerprints.
#[derive(Debug)]
pub struct SharedStore<C> {
    client: C,
    namespace: String,
    bits: u32,
}

impl<C: KeyedSetClient> SharedStore<C> {
    /// Create a store over `client`, scoped to `namespace`.
    pub fn new(client: C, namespace: impl Into<String>, bits: u32) -> Result<Self> {
        check_width(bits)?;
        Ok(Self {
            client,
            namespace: namespace.into(),
            bits,
        })
    }

    /// The namespace key this store reads and writes.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Access the underlying client.
    pub fn client(&self) -> &C {
        &self.client
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

impl<C: KeyedSetClient> FingerprintStore for SharedStore<C> {
    fn bit_width(&self) -> u32 {
        self.bits
    }

    fn contains(&self, fingerprint: Fingerprint) -> Result<bool> {
        self.check_fingerprint(fingerprint)?;
        self.client.exists(&self.namespace, fingerprint.value())
    }

    fn members(&self) -> Result<Vec<Fingerprint>> {
        self.client
            .members(&self.namespace)?
            .into_iter()
            .map(|value| Fingerprint::from_value(value, self.bits))
            .collect()
    }

    fn insert(&self, fingerprint: Fingerprint) -> Result<()> {
        self.check_fingerprint(fingerprint)?;
        self.client.add(&self.namespace, fingerprint.value())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.client.members(&self.namespace)?.len())
    }
}

/// In-process [`KeyedSetClient`] for tests and single-binary deployments.
#[derive(Debug, Default)]
pub struct InMemoryKeyedSet {
    sets: Mutex<HashMap<String, HashSet<u128>>>,
}

impl InMemoryKeyedSet {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashSet<u128>>> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyedSetClient for InMemoryKeyedSet {
    fn exists(&self, key: &str, value: u128) -> Result<bool> {
        Ok(self
            .lock()
            .get(key)
            .map_or(false, |set| set.contains(&value)))
    }

    fn members(&self, key: &str) -> Result<Vec<u128>> {
        Ok(self
            .lock()
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn add(&self, key: &str, value: u128) -> Result<()> {
        self.lock().entry(key.to_string()).or_default().insert(value);
        Ok(())
    }
}

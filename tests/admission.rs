//! End-to-end admission scenarios.
//!
//! Drives the filter and every store backend through the behavior that
//! matters in an ingestion pipeline: first-sight admission, exact and near
//! rejection, threshold strictness, and what each backend guarantees (and
//! deliberately does not) under concurrent submission.

use simsieve::{
    Admission, DuplicateFilter, Feature, FilterConfig, Fingerprint, FingerprintStore,
    InMemoryKeyedSet, KeyedSetClient, LocalStore, Result, SegmentedStore, SharedStore,
    TokenHasher,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn config(bit_width: u32) -> FilterConfig {
    FilterConfig {
        bit_width,
        ..FilterConfig::default()
    }
}

fn fp(value: u128, bits: u32) -> Fingerprint {
    Fingerprint::from_value(value, bits).expect("valid width")
}

// =============================================================================
// Core admission flow
// =============================================================================

#[test]
fn first_submission_admitted_resubmission_exact() {
    let filter = DuplicateFilter::new(config(8), LocalStore::new(8).expect("valid width"))
        .expect("valid filter");
    let features = [Feature::new("snow", 1.0)];

    let first = filter.admit_features(&features).expect("admit");
    assert!(first.is_admitted());

    let second = filter.admit_features(&features).expect("admit");
    assert_eq!(second, Admission::DuplicateExact);

    let rebuilt = filter.fingerprint_features(&features).expect("fingerprint");
    assert_eq!(rebuilt.similarity(&rebuilt).expect("same width"), 1.0);
    assert_eq!(filter.store().len().expect("len"), 1);
}

#[test]
fn distant_fingerprints_coexist() {
    struct AllOnes;
    impl TokenHasher for AllOnes {
        fn hash_token(&self, _token: &str, bits: u32) -> u128 {
            if bits >= 128 {
                u128::MAX
            } else {
                (1u128 << bits) - 1
            }
        }
    }

    struct AllZeros;
    impl TokenHasher for AllZeros {
        fn hash_token(&self, _token: &str, _bits: u32) -> u128 {
            0
        }
    }

    // Two producers writing into one namespace with maximally disagreeing
    // hashers: fingerprints 0xFF and 0x00, similarity 0.0.
    let store = Arc::new(LocalStore::new(8).expect("valid width"));
    let ones = DuplicateFilter::with_hasher(
        config(8),
        store.clone(),
        simsieve::TermFrequencyExtractor,
        AllOnes,
    )
    .expect("valid filter");
    let zeros = DuplicateFilter::with_hasher(
        config(8),
        store.clone(),
        simsieve::TermFrequencyExtractor,
        AllZeros,
    )
    .expect("valid filter");

    let features = [Feature::new("snowstorm", 1.0)];
    assert!(ones.admit_features(&features).expect("admit").is_admitted());
    assert!(zeros.admit_features(&features).expect("admit").is_admitted());
    assert_eq!(store.len().expect("len"), 2);
}

#[test]
fn near_duplicate_rejected_with_distance() {
    let filter = DuplicateFilter::new(config(64), LocalStore::new(64).expect("valid width"))
        .expect("valid filter");
    let original = fp(0x0123_4567_89AB_CDEF, 64);
    let one_bit_off = fp(0x0123_4567_89AB_CDEE, 64);

    assert!(filter
        .admit_fingerprint(original)
        .expect("admit")
        .is_admitted());

    // Distance 1 of 64: similarity 63/64, well past the 0.8 default.
    let outcome = filter.admit_fingerprint(one_bit_off).expect("admit");
    assert_eq!(
        outcome,
        Admission::DuplicateNear {
            distance: 1,
            matched: original
        }
    );

    let stats = filter.stats();
    assert_eq!(stats.admitted, 1);
    assert_eq!(stats.duplicate_near, 1);
    assert_eq!(filter.store().len().expect("len"), 1);
}

#[test]
fn similarity_at_threshold_is_admitted() {
    // 4-bit fingerprints at distance 1 sit exactly at similarity 0.75.
    let store = LocalStore::new(4).expect("valid width");
    assert!(store.admit(fp(0b1111, 4), 0.75).expect("admit").is_admitted());
    assert!(store.admit(fp(0b1110, 4), 0.75).expect("admit").is_admitted());

    // One notch below the boundary, the same pair rejects.
    let lower = LocalStore::new(4).expect("valid width");
    assert!(lower.admit(fp(0b1111, 4), 0.74).expect("admit").is_admitted());
    assert!(lower
        .admit(fp(0b1110, 4), 0.74)
        .expect("admit")
        .is_duplicate());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn local_concurrent_near_duplicates_admit_one_winner() {
    let store = Arc::new(LocalStore::new(64).expect("valid width"));
    let start = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for value in [0xF0F0_0000u128, 0xF0F0_0001u128] {
        let store = store.clone();
        let start = start.clone();
        handles.push(thread::spawn(move || {
            start.wait();
            store.admit(fp(value, 64), 0.8).expect("admit")
        }));
    }

    let outcomes: Vec<Admission> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    let admitted = outcomes.iter().filter(|o| o.is_admitted()).count();
    let near = outcomes
        .iter()
        .filter(|o| matches!(o, Admission::DuplicateNear { distance: 1, .. }))
        .count();
    assert_eq!(admitted, 1, "outcomes: {outcomes:?}");
    assert_eq!(near, 1, "outcomes: {outcomes:?}");
    assert_eq!(store.len().expect("len"), 1);
}

/// Keyed-set client that parks every scan until both writers have scanned,
/// forcing the check-then-act window open.
struct RacingClient {
    inner: InMemoryKeyedSet,
    scans: Barrier,
}

impl KeyedSetClient for RacingClient {
    fn exists(&self, key: &str, value: u128) -> Result<bool> {
        self.inner.exists(key, value)
    }

    fn members(&self, key: &str) -> Result<Vec<u128>> {
        let members = self.inner.members(key);
        self.scans.wait();
        members
    }

    fn add(&self, key: &str, value: u128) -> Result<()> {
        self.inner.add(key, value)
    }
}

#[test]
fn shared_concurrent_near_duplicates_can_both_admit() {
    // The shared backend's admission is check-then-act across separate
    // service calls. With both scans completing before either insert, both
    // near-duplicate submissions win. This is the documented contract, not
    // a bug.
    let client = Arc::new(RacingClient {
        inner: InMemoryKeyedSet::new(),
        scans: Barrier::new(2),
    });
    let store = Arc::new(
        SharedStore::new(client.clone(), "race:simhash_set", 64).expect("valid store"),
    );

    let values = [0xA5A5_0000u128, 0xA5A5_0001u128];
    let mut handles = Vec::new();
    for value in values {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            store.admit(fp(value, 64), 0.8).expect("admit")
        }));
    }

    for handle in handles {
        assert!(handle.join().expect("thread panicked").is_admitted());
    }
    for value in values {
        assert!(client.exists("race:simhash_set", value).expect("exists"));
    }
}

// =============================================================================
// Backend parity
// =============================================================================

#[test]
fn all_backends_reach_the_same_decisions() {
    let bits = 16;
    let threshold = 0.75;
    let local = LocalStore::new(bits).expect("valid width");
    let segmented = SegmentedStore::new(bits, threshold).expect("valid config");
    let shared =
        SharedStore::new(InMemoryKeyedSet::new(), "parity:simhash_set", bits).expect("valid store");

    let probes: [u128; 8] = [0x0000, 0x0001, 0x00FF, 0x0F0F, 0xFFFF, 0xFFFE, 0x0000, 0x00F1];
    for value in probes {
        let probe = fp(value, bits);
        let a = local.admit(probe, threshold).expect("admit");
        let b = segmented.admit(probe, threshold).expect("admit");
        let c = shared.admit(probe, threshold).expect("admit");

        assert_eq!(
            a.is_admitted(),
            b.is_admitted(),
            "segmented diverged at {value:#06x}"
        );
        assert_eq!(
            a.is_admitted(),
            c.is_admitted(),
            "shared diverged at {value:#06x}"
        );
        assert_eq!(
            matches!(a, Admission::DuplicateExact),
            matches!(b, Admission::DuplicateExact),
            "segmented exact/near split at {value:#06x}"
        );
        assert_eq!(
            matches!(a, Admission::DuplicateExact),
            matches!(c, Admission::DuplicateExact),
            "shared exact/near split at {value:#06x}"
        );
    }

    assert_eq!(local.len().expect("len"), segmented.len().expect("len"));
    assert_eq!(local.len().expect("len"), shared.len().expect("len"));
}

#[test]
fn filter_works_over_every_backend() {
    let content = "fresh wire story about mountain weather";

    let over_local = DuplicateFilter::new(config(64), LocalStore::new(64).expect("valid width"))
        .expect("valid filter");
    let over_segmented =
        DuplicateFilter::new(config(64), SegmentedStore::new(64, 0.8).expect("valid config"))
            .expect("valid filter");
    let over_shared = DuplicateFilter::new(
        config(64),
        SharedStore::new(InMemoryKeyedSet::new(), "e2e:simhash_set", 64).expect("valid store"),
    )
    .expect("valid filter");

    assert!(over_local.admit_content(content).expect("admit").is_admitted());
    assert!(over_segmented
        .admit_content(content)
        .expect("admit")
        .is_admitted());
    assert!(over_shared
        .admit_content(content)
        .expect("admit")
        .is_admitted());

    assert_eq!(
        over_local.admit_content(content).expect("admit"),
        Admission::DuplicateExact
    );
    assert_eq!(
        over_segmented.admit_content(content).expect("admit"),
        Admission::DuplicateExact
    );
    assert_eq!(
        over_shared.admit_content(content).expect("admit"),
        Admission::DuplicateExact
    );
}

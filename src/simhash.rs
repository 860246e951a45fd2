//! SimHash fingerprints over weighted features.
//!
//! ## Algorithm
//!
//! For a document represented as weighted features:
//! 1. Initialize `bits` signed accumulators to 0
//! 2. For each feature with weight w: hash its token to a `bits`-wide
//!    pattern; where the pattern has a 1, add w to the accumulator, where it
//!    has a 0, subtract w
//! 3. Fingerprint bit i is 1 iff accumulator i is strictly positive
//!
//! Similar feature sets collapse to fingerprints with small Hamming
//! distance, so near-duplicate detection reduces to XOR + popcount.
//!
//! ## References
//!
//! - Charikar (2002). "Similarity estimation techniques from rounding algorithms"
//! - Manku et al. (2007). "Detecting near-duplicates for web crawling"

use crate::error::{Result, SieveError};
use crate::feature::Feature;
use crate::hasher::{check_width, width_mask, TokenHasher, Xxh3TokenHasher};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::fmt;

/// A SimHash fingerprint: a bit pattern of fixed width.
///
/// The value occupies only the low `bits` bits; construction masks anything
/// above them. Fingerprints of different widths never compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FingerprintWire")]
pub struct Fingerprint {
    value: u128,
    bits: u32,
}

impl Fingerprint {
    /// Create a fingerprint from a raw value.
    ///
    /// `value` is reduced to the low `bits` bits. Widths outside 1-128 are
    /// rejected.
    pub fn from_value(value: u128, bits: u32) -> Result<Self> {
        check_width(bits)?;
        Ok(Self {
            value: value & width_mask(bits),
            bits,
        })
    }

    /// The raw bit pattern.
    pub fn value(&self) -> u128 {
        self.value
    }

    /// Width in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of bit positions in which the two fingerprints differ.
    pub fn hamming_distance(&self, other: &Fingerprint) -> Result<u32> {
        self.check_same_width(other)?;
        Ok((self.value ^ other.value).count_ones())
    }

    /// Fraction of agreeing bit positions: `(bits - distance) / bits`.
    ///
    /// 1.0 for identical fingerprints, 0.0 for complementary ones.
    pub fn similarity(&self, other: &Fingerprint) -> Result<f64> {
        let distance = self.hamming_distance(other)?;
        Ok((self.bits - distance) as f64 / self.bits as f64)
    }

    /// Whether similarity strictly exceeds `threshold`.
    ///
    /// Equality at the threshold is not a near-duplicate.
    pub fn is_near_duplicate(&self, other: &Fingerprint, threshold: f64) -> Result<bool> {
        Ok(self.similarity(other)? > threshold)
    }

    fn check_same_width(&self, other: &Fingerprint) -> Result<()> {
        if self.bits != other.bits {
            return Err(SieveError::WidthMismatch {
                left: self.bits,
                right: other.bits,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Fingerprint {
    /// Lowercase hex, zero-padded to the width.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = (self.bits as usize + 3) / 4;
        write!(f, "{:0digits$x}", self.value)
    }
}

/// Checked deserialization target; keeps stored fingerprints inside the
/// width contract.
#[derive(Deserialize)]
struct FingerprintWire {
    value: u128,
    bits: u32,
}

impl TryFrom<FingerprintWire> for Fingerprint {
    type Error = SieveError;

    fn try_from(wire: FingerprintWire) -> Result<Self> {
        Fingerprint::from_value(wire.value, wire.bits)
    }
}

/// Builds fingerprints from weighted features.
///
/// Each token is hashed once per feature; bit positions where the hash has a
/// 1 accumulate `+weight`, positions with a 0 accumulate `-weight`. Only
/// strictly positive sums set a fingerprint bit, so a zero-sum position
/// collapses to 0 and an empty feature slice produces the all-zero
/// fingerprint of the configured width.
pub struct SimhashBuilder {
    bits: u32,
    hasher: Box<dyn TokenHasher + Send + Sync>,
}

impl SimhashBuilder {
    /// Create a builder using the default [`Xxh3TokenHasher`].
    pub fn new(bits: u32) -> Result<Self> {
        Self::with_hasher(bits, Xxh3TokenHasher::new())
    }

    /// Create a builder with a custom token hasher.
    pub fn with_hasher<H>(bits: u32, hasher: H) -> Result<Self>
    where
        H: TokenHasher + Send + Sync + 'static,
    {
        check_width(bits)?;
        Ok(Self {
            bits,
            hasher: Box::new(hasher),
        })
    }

    /// Fingerprint width in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Build the fingerprint for a feature set.
    ///
    /// Accumulation runs in a canonical feature order (token, then weight):
    /// floating-point addition is order-sensitive, and fingerprints must be
    /// bit-identical under permutation of the input.
    pub fn fingerprint(&self, features: &[Feature]) -> Fingerprint {
        let mut ordered: Vec<&Feature> = features.iter().collect();
        ordered.sort_by(|a, b| {
            a.token
                .cmp(&b.token)
                .then_with(|| a.weight.total_cmp(&b.weight))
        });

        let mut acc: SmallVec<[f64; 64]> = smallvec![0.0; self.bits as usize];
        for feature in ordered {
            let hash = self.hasher.hash_token(&feature.token, self.bits);
            for (i, sum) in acc.iter_mut().enumerate() {
                if (hash >> i) & 1 == 1 {
                    *sum += feature.weight;
                } else {
                    *sum -= feature.weight;
                }
            }
        }

        let mut value = 0u128;
        for (i, sum) in acc.iter().enumerate() {
            if *sum > 0.0 {
                value |= 1u128 << i;
            }
        }

        Fingerprint {
            value,
            bits: self.bits,
        }
    }
}

impl fmt::Debug for SimhashBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimhashBuilder")
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

//! Token hashing strategies for fingerprint construction.
//!
//! A token hasher maps one text token to a bit pattern of the configured
//! width. Fingerprint bits mirror the hash bits, so two deployments agree on
//! fingerprints only if they agree on the hasher (and its seed).
//!
//! ## Contract
//!
//! - Deterministic: the same token and width always produce the same value,
//!   across processes and restarts.
//! - Bounded: the output occupies only the low `bits` bits.
//! - Empty token hashes to 0.
//!
//! [`Xxh3TokenHasher`] is the default. [`PolyTokenHasher`] reproduces the
//! multiply-xor accumulator used by older crawler deployments, for namespaces
//! whose stored fingerprints predate the switch.

use crate::error::{Result, SieveError};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Maximum supported fingerprint width in bits.
pub const MAX_BITS: u32 = 128;

/// Mask covering the low `bits` bits.
pub(crate) fn width_mask(bits: u32) -> u128 {
    if bits >= MAX_BITS {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Validate a fingerprint width.
pub(crate) fn check_width(bits: u32) -> Result<()> {
    if bits == 0 || bits > MAX_BITS {
        return Err(SieveError::InvalidConfig(format!(
            "bit width must be 1-{MAX_BITS}, got {bits}"
        )));
    }
    Ok(())
}

/// Maps a text token to a `bits`-wide hash value.
///
/// Implementations must be deterministic, return values strictly below
/// `2^bits`, and hash the empty token to 0.
pub trait TokenHasher {
    /// Hash `token` into the low `bits` bits.
    fn hash_token(&self, token: &str, bits: u32) -> u128;
}

/// Seeded XXH3 token hasher (the default).
///
/// The 64-bit digest is widened to 128 bits by rehashing it, then masked to
/// the requested width. Deployments sharing a namespace must share the seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xxh3TokenHasher {
    seed: u64,
}

impl Xxh3TokenHasher {
    /// Create a hasher with seed 0.
    pub fn new() -> Self {
        Self { seed: 0 }
    }

    /// Create a hasher with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// The seed in use.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl TokenHasher for Xxh3TokenHasher {
    fn hash_token(&self, token: &str, bits: u32) -> u128 {
        if token.is_empty() {
            return 0;
        }
        let lo = xxh3_64_with_seed(token.as_bytes(), self.seed);
        let hi = xxh3_64_with_seed(&lo.to_le_bytes(), self.seed);
        ((lo as u128) | ((hi as u128) << 64)) & width_mask(bits)
    }
}

/// Multiply-xor accumulator hash over Unicode code points.
///
/// Starts from `first_char << 7`, folds every character through
/// `x = (x * 1000003) ^ char`, masked to the width each round, and finally
/// mixes in the character count. The trailing mix is re-masked so the output
/// honors the width bound at every width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolyTokenHasher;

impl PolyTokenHasher {
    /// Create the accumulator hasher.
    pub fn new() -> Self {
        Self
    }
}

impl TokenHasher for PolyTokenHasher {
    fn hash_token(&self, token: &str, bits: u32) -> u128 {
        let first = match token.chars().next() {
            Some(c) => c,
            None => return 0,
        };

        let mask = width_mask(bits);
        let mut x = (first as u128) << 7;
        let mut count: u128 = 0;
        for c in token.chars() {
            x = (x.wrapping_mul(1_000_003) ^ c as u128) & mask;
            count += 1;
        }
        (x ^ count) & mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_mask() {
        assert_eq!(width_mask(1), 1);
        assert_eq!(width_mask(8), 0xFF);
        assert_eq!(width_mask(64), u64::MAX as u128);
        assert_eq!(width_mask(128), u128::MAX);
    }

    #[test]
    fn test_check_width_bounds() {
        assert!(check_width(0).is_err());
        assert!(check_width(1).is_ok());
        assert!(check_width(64).is_ok());
        assert!(check_width(128).is_ok());
        assert!(check_width(129).is_err());
    }

    #[test]
    fn test_xxh3_deterministic() {
        let hasher = Xxh3TokenHasher::new();
        assert_eq!(hasher.hash_token("snow", 64), hasher.hash_token("snow", 64));
        assert_ne!(hasher.hash_token("snow", 64), hasher.hash_token("rain", 64));
    }

    #[test]
    fn test_xxh3_seed_changes_output() {
        let a = Xxh3TokenHasher::new();
        let b = Xxh3TokenHasher::with_seed(7);
        assert_eq!(a.seed(), 0);
        assert_eq!(b.seed(), 7);
        assert_ne!(a.hash_token("snow", 64), b.hash_token("snow", 64));
    }

    #[test]
    fn test_xxh3_respects_width() {
        let hasher = Xxh3TokenHasher::new();
        for bits in [1, 7, 8, 17, 64, 100, 128] {
            let h = hasher.hash_token("some moderately long token", bits);
            assert_eq!(h & !width_mask(bits), 0, "high bits set for width {bits}");
        }
    }

    #[test]
    fn test_empty_token_is_zero() {
        assert_eq!(Xxh3TokenHasher::new().hash_token("", 64), 0);
        assert_eq!(PolyTokenHasher::new().hash_token("", 64), 0);
    }

    #[test]
    fn test_poly_known_value() {
        // Hand-computed: x = ('a' << 7); fold 'a' then 'b' with
        // x = (x * 1000003 ^ c) & 0xFF; finally x ^= 2.
        assert_eq!(PolyTokenHasher::new().hash_token("ab", 8), 131);
    }

    #[test]
    fn test_poly_masks_trailing_length_mix() {
        // Character counts above the mask must not leak past the width.
        let token = "a".repeat(300);
        let h = PolyTokenHasher::new().hash_token(&token, 2);
        assert!(h < 4);
    }

    #[test]
    fn test_poly_deterministic() {
        let hasher = PolyTokenHasher::new();
        assert_eq!(
            hasher.hash_token("近似", 64),
            hasher.hash_token("近似", 64)
        );
    }
}

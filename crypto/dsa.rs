//! Textbook FIPS-186 DSA verification over `num-bigint`.
//!
//! No crate in this workspace's dependency graph implements classic
//! multiplicative-group DSA (the corpus's asymmetric-crypto crates are all
//! elliptic-curve). `ethrex-crypto` builds comparable primitives — KZG,
//! blake2f — directly on math crates rather than pulling in an opaque
//! `verify()`, so this module follows the same posture on top of
//! `num-bigint`'s `BigUint`.

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::types::DsaPublicKey;

/// A raw `(r, s)` DSA signature pair, each an unsigned big-endian integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsaSignature {
    pub r: BigUint,
    pub s: BigUint,
}

impl DsaSignature {
    pub fn from_be_bytes(r: &[u8], s: &[u8]) -> Self {
        Self {
            r: BigUint::from_bytes_be(r),
            s: BigUint::from_bytes_be(s),
        }
    }
}

/// Which hash-to-integer convention produced a signature.
///
/// Historical signers disagreed on how to reduce a SHA-256 digest into an
/// integer smaller than `q`: the standard ("canonical") convention takes
/// the leftmost `bit_length(q)` bits of the digest (`bits2int`, as FIPS
/// 186-4 mandates), while an older convention fed the full 256-bit digest
/// into the verification equation unreduced. Both conventions are accepted
/// for compatibility; whether the forced mode should ever be accepted for
/// *newly minted* blocks is left to policy review, so this crate retains
/// the permissive behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashReduction {
    Canonical,
    Raw,
}

fn bits2int(hash: &[u8], q_bits: u64) -> BigUint {
    let full = BigUint::from_bytes_be(hash);
    let hash_bits = (hash.len() * 8) as u64;
    if q_bits >= hash_bits {
        full
    } else {
        full >> (hash_bits - q_bits)
    }
}

fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let a = BigInt::from_biguint(Sign::Plus, a.clone());
    let m = BigInt::from_biguint(Sign::Plus, modulus.clone());
    let egcd = a.extended_gcd(&m);
    if egcd.gcd != BigInt::one() {
        return None;
    }
    let inv = ((egcd.x % &m) + &m) % &m;
    inv.to_biguint()
}

/// Verifies `(r, s)` over `hash` under `pub_key`, using the requested hash
/// reduction convention. Returns `false` (never panics) on any malformed
/// input: callers that need to distinguish "bad key" from "bad signature"
/// should validate the key shape themselves first.
pub fn verify(
    pub_key: &DsaPublicKey,
    hash: &[u8; 32],
    sig: &DsaSignature,
    reduction: HashReduction,
) -> bool {
    let p = BigUint::from_bytes_be(&pub_key.p);
    let q = BigUint::from_bytes_be(&pub_key.q);
    let g = BigUint::from_bytes_be(&pub_key.g);
    let y = BigUint::from_bytes_be(&pub_key.y);

    if p.is_zero() || q.is_zero() || q.bits() == 0 {
        return false;
    }
    if sig.r.is_zero() || sig.r >= q || sig.s.is_zero() || sig.s >= q {
        return false;
    }

    let Some(w) = mod_inverse(&sig.s, &q) else {
        return false;
    };

    let e = match reduction {
        HashReduction::Canonical => bits2int(hash, q.bits()),
        HashReduction::Raw => BigUint::from_bytes_be(hash),
    };

    let u1 = (&e * &w) % &q;
    let u2 = (&sig.r * &w) % &q;
    let v = ((g.modpow(&u1, &p) * y.modpow(&u2, &p)) % &p) % &q;
    v == sig.r
}

/// Verifies `(r, s)` over `hash`, trying both hash-reduction conventions.
/// Returns which convention succeeded, if either did.
pub fn verify_either_reduction(
    pub_key: &DsaPublicKey,
    hash: &[u8; 32],
    sig: &DsaSignature,
) -> Option<HashReduction> {
    if verify(pub_key, hash, sig, HashReduction::Canonical) {
        Some(HashReduction::Canonical)
    } else if verify(pub_key, hash, sig, HashReduction::Raw) {
        Some(HashReduction::Raw)
    } else {
        None
    }
}

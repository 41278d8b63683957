//! Signed Subspace Key (SSK) block: a self-verifying content block carrying
//! a fixed-size payload, a DSA signature over a layered hash, and the
//! metadata a downstream client needs to decrypt it.
//!
//! Construction performs the full verification pass (unless explicitly
//! skipped); a successfully constructed block is never re-verified. Storing
//! an `SSKBlock` in the durable object database is out of scope by design —
//! see [`store_in_database`].

use crate::crypto::{
    self,
    dsa::{self, DsaSignature, HashReduction},
};
use crate::error::BlockError;
use crate::traits::CheckerDatabase;
use crate::types::{Digest32, DsaPublicKey, NodeSsk, RoutingKey};

/// Exact payload size, in bytes.
pub const DATA_LENGTH: usize = 1024;
/// Largest payload that fits after compression (the trailing 2 bytes of the
/// pre-encryption payload reserve a length/flag field).
pub const MAX_COMPRESSED_DATA_LENGTH: usize = 1022;
/// Exact header size, in bytes.
pub const TOTAL_HEADERS_LENGTH: usize = 142;

/// Byte offset into `headers` where the encrypted header region begins
/// (after the 2+2+32 byte prefix).
const HEADERS_OFFSET: usize = 36;
/// The encrypted header region is 36 bytes; the signature starts right
/// after it.
const SIGNATURE_OFFSET: usize = HEADERS_OFFSET + 36;
const SIGNATURE_PART_LEN: usize = 32;
/// Bytes `[0..HEADER_PREFIX_FOR_EQUALITY)` of `headers` participate in
/// structural equality; the rest is signature and reserved tail, which may
/// legitimately differ between two signings of the same `(key, data)` pair.
const HEADER_PREFIX_FOR_EQUALITY: usize = 71;

/// A Signed Subspace Key block, parsed and verified from a flat byte
/// buffer produced by (possibly untrusted) peers.
#[derive(Debug, Clone)]
pub struct SSKBlock {
    data: Vec<u8>,
    headers: Vec<u8>,
    headers_offset: usize,
    node_key: NodeSsk,
    pub_key: DsaPublicKey,
    hash_identifier: u16,
    sym_cipher_identifier: u16,
    /// Which hash-reduction convention the signature verified under, if
    /// verification ran. `None` when constructed with `dont_verify = true`.
    hash_reduction: Option<HashReduction>,
}

impl SSKBlock {
    /// Parses and (unless `dont_verify`) fully verifies an SSK block.
    ///
    /// Structural checks run before the signature check, so callers can
    /// rely on e.g. `InvalidArgument` never masking a `VerifyFailed`.
    pub fn new(
        data: Vec<u8>,
        headers: Vec<u8>,
        node_key: NodeSsk,
        dont_verify: bool,
    ) -> Result<Self, BlockError> {
        if headers.len() != TOTAL_HEADERS_LENGTH {
            return Err(BlockError::InvalidArgument(format!(
                "headers must be {TOTAL_HEADERS_LENGTH} bytes, got {}",
                headers.len()
            )));
        }
        if data.len() != DATA_LENGTH {
            return Err(BlockError::VerifyFailed("data length wrong".to_string()));
        }
        let Some(pub_key) = node_key.pub_key.clone() else {
            return Err(BlockError::VerifyFailed("no pubkey".to_string()));
        };

        let hash_identifier = u16::from_be_bytes([headers[0], headers[1]]);
        let sym_cipher_identifier = u16::from_be_bytes([headers[2], headers[3]]);
        let mut encrypted_hashed_docname: Digest32 = [0u8; 32];
        encrypted_hashed_docname.copy_from_slice(&headers[4..36]);

        if hash_identifier != crypto::HASH_SHA256 {
            return Err(BlockError::VerifyFailed("hash not SHA-256".to_string()));
        }

        let mut hash_reduction = None;
        if !dont_verify {
            let data_hash = crypto::sha256(&data);
            let mut preimage = Vec::with_capacity(SIGNATURE_OFFSET + data_hash.len());
            preimage.extend_from_slice(&headers[0..SIGNATURE_OFFSET]);
            preimage.extend_from_slice(&data_hash);
            let overall_hash = crypto::sha256(&preimage);

            let r = &headers[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_PART_LEN];
            let s = &headers[SIGNATURE_OFFSET + SIGNATURE_PART_LEN
                ..SIGNATURE_OFFSET + 2 * SIGNATURE_PART_LEN];
            let sig = DsaSignature::from_be_bytes(r, s);

            hash_reduction = dsa::verify_either_reduction(&pub_key, &overall_hash, &sig);
            if hash_reduction.is_none() {
                return Err(BlockError::VerifyFailed("signature".to_string()));
            }

            if encrypted_hashed_docname != node_key.encrypted_hashed_docname {
                return Err(BlockError::VerifyFailed(
                    "E(H(docname)) mismatch".to_string(),
                ));
            }
        }

        Ok(Self {
            data,
            headers,
            headers_offset: HEADERS_OFFSET,
            node_key,
            pub_key,
            hash_identifier,
            sym_cipher_identifier,
            hash_reduction,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn headers(&self) -> &[u8] {
        &self.headers
    }

    pub fn headers_offset(&self) -> usize {
        self.headers_offset
    }

    pub fn hash_identifier(&self) -> u16 {
        self.hash_identifier
    }

    pub fn sym_cipher_identifier(&self) -> u16 {
        self.sym_cipher_identifier
    }

    pub fn node_key(&self) -> &NodeSsk {
        &self.node_key
    }

    pub fn pub_key(&self) -> &DsaPublicKey {
        &self.pub_key
    }

    pub fn pub_key_bytes(&self) -> Vec<u8> {
        self.pub_key.to_bytes()
    }

    /// `true` if verification accepted the signature under the "forced
    /// canonical hash reduction" convention rather than the raw-hash one.
    /// Retained for compatibility; flagged here for policy review. `None`
    /// if the block was constructed with `dont_verify = true`.
    pub fn used_forced_hash(&self) -> Option<bool> {
        self.hash_reduction
            .map(|r| matches!(r, HashReduction::Canonical))
    }

    /// The routing-level key identifying this block in the local store and
    /// on the wire: `SHA256(pubkey || E(H(docname)))`.
    pub fn routing_key(&self) -> RoutingKey {
        let mut preimage = self.pub_key.to_bytes();
        preimage.extend_from_slice(&self.node_key.encrypted_hashed_docname);
        RoutingKey(crypto::sha256(&preimage))
    }

    /// The "full" key: everything a peer needs to re-fetch and re-verify
    /// this block (the routing key, the header prefix, and the serialized
    /// public key) but nothing to decrypt it — decryption stays the
    /// client's responsibility (out of scope here).
    pub fn full_key(&self) -> Vec<u8> {
        let mut out = self.routing_key().0.to_vec();
        out.extend_from_slice(&self.headers[..HEADERS_OFFSET]);
        out.extend_from_slice(&self.pub_key.to_bytes());
        out
    }

    /// Always fails: storing an `SSKBlock` in the durable object database is
    /// out of scope by design. The database trait itself never offers a
    /// slot for one; this method exists so a caller that reaches for it
    /// gets a typed rejection instead of a missing API.
    pub fn store_in_database(&self, _db: &dyn CheckerDatabase) -> Result<(), BlockError> {
        Err(BlockError::Unsupported)
    }
}

impl PartialEq for SSKBlock {
    fn eq(&self, other: &Self) -> bool {
        self.pub_key == other.pub_key
            && self.node_key == other.node_key
            && self.headers_offset == other.headers_offset
            && self.hash_identifier == other.hash_identifier
            && self.sym_cipher_identifier == other.sym_cipher_identifier
            && self.data == other.data
            && self.headers[..HEADER_PREFIX_FOR_EQUALITY]
                == other.headers[..HEADER_PREFIX_FOR_EQUALITY]
    }
}

impl Eq for SSKBlock {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::dsa::DsaSignature;
    use num_bigint::{BigUint, RandBigInt};
    use num_traits::{One, Zero};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Small real DSA domain for block-level tests. Mirrors the one in
    /// `crypto::dsa::tests` but lives here too since block tests need to
    /// mutate raw header bytes, not just call `verify` directly.
    struct Domain {
        q: BigUint,
        p: BigUint,
        g: BigUint,
        x: BigUint,
        pub_key: DsaPublicKey,
    }

    fn is_probably_prime(n: &BigUint) -> bool {
        let small = [2u32, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
        if *n < BigUint::from(2u32) {
            return false;
        }
        for p in small {
            let bp = BigUint::from(p);
            if *n == bp {
                return true;
            }
            if (n % &bp).is_zero() {
                return false;
            }
        }
        let one = BigUint::one();
        let n_minus_1 = n - &one;
        let mut d = n_minus_1.clone();
        let mut r = 0u32;
        while (&d % 2u32).is_zero() {
            d /= 2u32;
            r += 1;
        }
        'witness: for a in small {
            let a = BigUint::from(a);
            if a >= *n {
                continue;
            }
            let mut x = a.modpow(&d, n);
            if x == one || x == n_minus_1 {
                continue 'witness;
            }
            for _ in 0..r.saturating_sub(1) {
                x = (&x * &x) % n;
                if x == n_minus_1 {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }

    fn domain(seed: u64) -> Domain {
        let mut rng = StdRng::seed_from_u64(seed);
        let (q, p) = loop {
            let mut candidate = rng.gen_biguint(48);
            candidate.set_bit(0, true);
            candidate.set_bit(47, true);
            if !is_probably_prime(&candidate) {
                continue;
            }
            let p = &candidate * 2u32 + BigUint::one();
            if is_probably_prime(&p) {
                break (candidate, p);
            }
        };
        let g = loop {
            let h = rng.gen_biguint_range(&BigUint::from(2u32), &p);
            let g = (&h * &h) % &p;
            if g != BigUint::one() {
                break g;
            }
        };
        let x = rng.gen_biguint_below(&q);
        let y = g.modpow(&x, &p);
        Domain {
            q: q.clone(),
            p: p.clone(),
            g: g.clone(),
            x,
            pub_key: DsaPublicKey {
                p: p.to_bytes_be(),
                q: q.to_bytes_be(),
                g: g.to_bytes_be(),
                y: y.to_bytes_be(),
            },
        }
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

    impl Domain {
        /// Signs under the canonical (leftmost-bits) hash reduction, the
        /// convention `SSKBlock::new` tries first.
        fn sign(&self, hash: &[u8; 32], k_seed: u64) -> DsaSignature {
            let mut rng = StdRng::seed_from_u64(k_seed);
            loop {
                let k = rng.gen_biguint_below(&self.q);
                if k.is_zero() {
                    continue;
                }
                let r = self.g.modpow(&k, &self.p) % &self.q;
                if r.is_zero() {
                    continue;
                }
                let e = bits2int(hash, self.q.bits());
                let Some(k_inv) = mod_inverse_for_tests(&k, &self.q) else {
                    continue;
                };
                let s = (&k_inv * (&e + &self.x * &r)) % &self.q;
                if s.is_zero() {
                    continue;
                }
                return DsaSignature { r, s };
            }
        }
    }

    fn mod_inverse_for_tests(a: &BigUint, m: &BigUint) -> Option<BigUint> {
        use num_bigint::{BigInt, Sign};
        use num_integer::Integer;
        let a = BigInt::from_biguint(Sign::Plus, a.clone());
        let modulus = BigInt::from_biguint(Sign::Plus, m.clone());
        let egcd = a.extended_gcd(&modulus);
        if egcd.gcd != BigInt::one() {
            return None;
        }
        let inv = ((egcd.x % &modulus) + &modulus) % &modulus;
        inv.to_biguint()
    }

    fn build_headers(domain: &Domain, data: &[u8], docname: &Digest32) -> Vec<u8> {
        let mut headers = vec![0u8; TOTAL_HEADERS_LENGTH];
        headers[0..2].copy_from_slice(&crypto::HASH_SHA256.to_be_bytes());
        headers[2..4].copy_from_slice(&7u16.to_be_bytes());
        headers[4..36].copy_from_slice(docname);
        // headers[36..68): encrypted data-decryption-key, opaque here.
        headers[36..68].copy_from_slice(&[0xAB; 32]);
        // headers[68..72): data length/flag + compression algorithm, opaque.
        headers[68..72].copy_from_slice(&[0xFF; 4]);

        let data_hash = crypto::sha256(data);
        let mut preimage = headers[0..SIGNATURE_OFFSET].to_vec();
        preimage.extend_from_slice(&data_hash);
        let overall_hash = crypto::sha256(&preimage);
        let sig = domain.sign(&overall_hash, 123);
        let r_bytes = sig.r.to_bytes_be();
        let s_bytes = sig.s.to_bytes_be();
        let mut r_padded = vec![0u8; 32 - r_bytes.len()];
        r_padded.extend_from_slice(&r_bytes);
        let mut s_padded = vec![0u8; 32 - s_bytes.len()];
        s_padded.extend_from_slice(&s_bytes);
        headers[72..104].copy_from_slice(&r_padded);
        headers[104..136].copy_from_slice(&s_padded);
        headers
    }

    fn valid_block() -> (SSKBlock, Domain, Vec<u8>, Vec<u8>, Digest32) {
        let domain = domain(1);
        let data = vec![0x42u8; DATA_LENGTH];
        let docname = [0x11u8; 32];
        let headers = build_headers(&domain, &data, &docname);
        let node_key = NodeSsk::new(domain.pub_key.clone(), docname);
        let block = SSKBlock::new(data.clone(), headers.clone(), node_key, false).unwrap();
        (block, domain, data, headers, docname)
    }

    #[test]
    fn constructs_and_verifies_valid_block() {
        let (block, _domain, _data, _headers, _docname) = valid_block();
        assert_eq!(block.hash_identifier(), crypto::HASH_SHA256);
        assert_eq!(block.headers_offset(), HEADERS_OFFSET);
    }

    #[test]
    fn rejects_wrong_header_length() {
        let (_block, domain, data, _headers, docname) = valid_block();
        let node_key = NodeSsk::new(domain.pub_key, docname);
        let err = SSKBlock::new(data, vec![0u8; 10], node_key, false).unwrap_err();
        assert!(matches!(err, BlockError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_wrong_data_length() {
        let (_block, domain, _data, headers, docname) = valid_block();
        let node_key = NodeSsk::new(domain.pub_key, docname);
        let err = SSKBlock::new(vec![0u8; 10], headers, node_key, false).unwrap_err();
        assert_eq!(err, BlockError::VerifyFailed("data length wrong".to_string()));
    }

    #[test]
    fn rejects_missing_pubkey() {
        let (_block, _domain, data, headers, docname) = valid_block();
        let node_key = NodeSsk {
            pub_key: None,
            encrypted_hashed_docname: docname,
        };
        let err = SSKBlock::new(data, headers, node_key, false).unwrap_err();
        assert_eq!(err, BlockError::VerifyFailed("no pubkey".to_string()));
    }

    #[test]
    fn rejects_non_sha256_hash_identifier() {
        let (_block, domain, data, mut headers, docname) = valid_block();
        headers[0..2].copy_from_slice(&9u16.to_be_bytes());
        let node_key = NodeSsk::new(domain.pub_key, docname);
        let err = SSKBlock::new(data, headers, node_key, false).unwrap_err();
        assert_eq!(err, BlockError::VerifyFailed("hash not SHA-256".to_string()));
    }

    #[test]
    fn mutating_data_byte_fails_verification() {
        let (_block, domain, mut data, headers, docname) = valid_block();
        data[0] ^= 0xFF;
        let node_key = NodeSsk::new(domain.pub_key, docname);
        let err = SSKBlock::new(data, headers, node_key, false).unwrap_err();
        assert_eq!(err, BlockError::VerifyFailed("signature".to_string()));
    }

    #[test]
    fn mutating_header_prefix_byte_fails_verification() {
        let (_block, domain, data, mut headers, docname) = valid_block();
        headers[40] ^= 0xFF;
        let node_key = NodeSsk::new(domain.pub_key, docname);
        let err = SSKBlock::new(data, headers, node_key, false).unwrap_err();
        assert_eq!(err, BlockError::VerifyFailed("signature".to_string()));
    }

    #[test]
    fn docname_mismatch_is_rejected_after_signature_checks_out() {
        // Sign over a header whose prefix carries one docname, then present
        // a NodeSsk claiming a different one: the signature still verifies
        // (it only covers the header bytes as signed) but the docname
        // cross-check must still fail.
        let domain_ = domain(2);
        let data = vec![0x77u8; DATA_LENGTH];
        let signed_docname = [0x22u8; 32];
        let headers = build_headers(&domain_, &data, &signed_docname);
        let other_docname = [0x33u8; 32];
        let node_key = NodeSsk::new(domain_.pub_key, other_docname);
        let err = SSKBlock::new(data, headers, node_key, false).unwrap_err();
        assert_eq!(
            err,
            BlockError::VerifyFailed("E(H(docname)) mismatch".to_string())
        );
    }

    #[test]
    fn dont_verify_skips_signature_check() {
        let (_block, domain, mut data, headers, docname) = valid_block();
        data[0] ^= 0xFF;
        let node_key = NodeSsk::new(domain.pub_key, docname);
        let block = SSKBlock::new(data, headers, node_key, true).unwrap();
        assert_eq!(block.used_forced_hash(), None);
    }

    #[test]
    fn equality_ignores_signature_tail_but_not_prefix() {
        let (block, domain, data, mut headers, docname) = valid_block();
        // Re-sign with a different (but still valid) k: changes R and S,
        // i.e. bytes [72..142), while [0..71) stays byte-identical.
        let data_hash = crypto::sha256(&data);
        let mut preimage = headers[0..SIGNATURE_OFFSET].to_vec();
        preimage.extend_from_slice(&data_hash);
        let overall_hash = crypto::sha256(&preimage);
        let other_sig = domain.sign(&overall_hash, 999);
        let r_bytes = other_sig.r.to_bytes_be();
        let s_bytes = other_sig.s.to_bytes_be();
        let mut r_padded = vec![0u8; 32usize.saturating_sub(r_bytes.len())];
        r_padded.extend_from_slice(&r_bytes);
        let mut s_padded = vec![0u8; 32usize.saturating_sub(s_bytes.len())];
        s_padded.extend_from_slice(&s_bytes);
        headers[72..104].copy_from_slice(&r_padded);
        headers[104..136].copy_from_slice(&s_padded);

        let node_key = NodeSsk::new(domain.pub_key, docname);
        let other = SSKBlock::new(data, headers, node_key, true).unwrap();
        assert_eq!(block, other);
    }

    #[test]
    fn store_in_database_is_unsupported() {
        use crate::checker::db::InMemoryCheckerDatabase;
        let (block, ..) = valid_block();
        let db = InMemoryCheckerDatabase::new();
        assert_eq!(
            block.store_in_database(&db),
            Err(BlockError::Unsupported)
        );
    }

    use proptest::prop_assert;

    proptest::proptest! {
        /// Flipping any single bit of `data`, or of `headers[0..136)` (signed
        /// prefix plus signature), must make a fresh block fail to construct.
        /// `headers[136..142)` is reserved/unused and isn't asserted against.
        #[test]
        fn mutating_any_signed_byte_breaks_construction(byte_idx in 0usize..DATA_LENGTH + 136, bit in 0u8..8) {
            let (_block, domain, mut data, mut headers, docname) = valid_block();
            if byte_idx < DATA_LENGTH {
                data[byte_idx] ^= 1 << bit;
            } else {
                headers[byte_idx - DATA_LENGTH] ^= 1 << bit;
            }
            let node_key = NodeSsk::new(domain.pub_key, docname);
            prop_assert!(SSKBlock::new(data, headers, node_key, false).is_err());
        }
    }
}

//! Cryptographic primitives consumed by [`crate::block`].
//!
//! SHA-256 is delegated to `sha2`. DSA verification has no off-the-shelf
//! crate in this workspace (see [`dsa`]'s module docs) and is implemented
//! directly on `num-bigint`.

pub mod dsa;

use sha2::{Digest, Sha256};

/// `HASH_SHA256`, the only hash identifier this layer accepts.
pub const HASH_SHA256: u16 = 1;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

//! Small value types shared between [`crate::block`] and [`crate::checker`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte digest, used for hashed docnames and routing-key identifiers.
pub type Digest32 = [u8; 32];

/// The DSA public key carried by a [`NodeSsk`] and embedded in every
/// [`crate::block::SSKBlock`].
///
/// This is the (p, q, g, y) tuple of classic FIPS-186 DSA: `p`/`q`/`g` are
/// the shared domain parameters, `y` is the publisher's public value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsaPublicKey {
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub g: Vec<u8>,
    pub y: Vec<u8>,
}

impl DsaPublicKey {
    /// Serializes the key as a flat byte string, big-endian length-prefixed
    /// per component.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in [&self.p, &self.q, &self.g, &self.y] {
            out.extend_from_slice(&(part.len() as u16).to_be_bytes());
            out.extend_from_slice(part);
        }
        out
    }
}

/// Routing-level key identifier: carries the publisher's public key and the
/// expected `E(H(docname))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSsk {
    pub pub_key: Option<DsaPublicKey>,
    pub encrypted_hashed_docname: Digest32,
}

impl NodeSsk {
    pub fn new(pub_key: DsaPublicKey, encrypted_hashed_docname: Digest32) -> Self {
        Self {
            pub_key: Some(pub_key),
            encrypted_hashed_docname,
        }
    }
}

/// Opaque routing key used to address a block in the local store and on the
/// wire. Distinct from [`NodeSsk`]: a `RoutingKey` identifies *a* block
/// (CHK or SSK), a `NodeSsk` identifies the SSK subspace slot a publisher
/// controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutingKey(pub Digest32);

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A content block as handed back by the local store or a caller-supplied
/// [`crate::traits::BlockSet`]. Opaque payload from the checker's point of
/// view — it only needs to move it to `tripPendingKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub key: RoutingKey,
    pub data: Vec<u8>,
}

/// Opaque handle to a [`crate::traits::SendableGet`] held by a
/// [`crate::checker::DatastoreChecker`].
///
/// The durable item carries only this handle, never a live back-reference;
/// resolving it to a live `Arc<dyn SendableGet>` goes through an explicit
/// [`crate::checker::registry::GetterRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GetterId(pub u64);

/// Monotonic identifier of the current node session. Used to detect
/// whether a persisted [`crate::checker::item::DatastoreCheckerItem`] was
/// already adopted during this boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootId(pub u64);

/// Identifies the node installation that owns a persisted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDbHandle(pub u64);

//! Hash-merge primitive: 2-ary personalised BLAKE2b over node bytes.

use blake2b_rs::{Blake2b, Blake2bBuilder};

/// Personalisation applied by [`Blake2bMerge`] and [`leaf_hash`].
pub const DEFAULT_PERSONAL: &[u8; 16] = b"mmr-default-hash";

/// Combines two nodes into their 32-byte parent hash.
///
/// `merge_peaks` exists so deployments can domain-separate peak bagging
/// from in-tree merging; by default both are identical.
pub trait Merge {
    /// Parent hash of two sibling nodes, left input first.
    fn merge(lhs: &[u8], rhs: &[u8]) -> [u8; 32];

    /// Hash used when bagging two peaks into the root.
    fn merge_peaks(lhs: &[u8], rhs: &[u8]) -> [u8; 32] {
        Self::merge(lhs, rhs)
    }
}

fn new_blake2b(personal: &[u8]) -> Blake2b {
    Blake2bBuilder::new(32).personal(personal).build()
}

/// `blake2b-256(lhs || rhs)` under an explicit personalisation, for
/// deployments and tests that substitute their own domain separation.
///
/// `personal` must be at most 16 bytes (the BLAKE2b personalisation
/// limit).
pub fn blake2b_merge_with_personal(personal: &[u8], lhs: &[u8], rhs: &[u8]) -> [u8; 32] {
    let mut hasher = new_blake2b(personal);
    let mut hash = [0u8; 32];
    hasher.update(lhs);
    hasher.update(rhs);
    hasher.finalize(&mut hash);
    hash
}

/// Hash a raw leaf payload into the 32-byte node value appended to the
/// MMR, under [`DEFAULT_PERSONAL`].
///
/// The verifier itself never hashes leaves; the leaf stream carries node
/// values verbatim. This is the convention the reference builder and the
/// tests append under.
pub fn leaf_hash(value: &[u8]) -> [u8; 32] {
    let mut hasher = new_blake2b(DEFAULT_PERSONAL);
    let mut hash = [0u8; 32];
    hasher.update(value);
    hasher.finalize(&mut hash);
    hash
}

/// The default merge: 32-byte BLAKE2b personalised with
/// [`DEFAULT_PERSONAL`].
#[derive(Debug)]
pub struct Blake2bMerge;

impl Merge for Blake2bMerge {
    fn merge(lhs: &[u8], rhs: &[u8]) -> [u8; 32] {
        blake2b_merge_with_personal(DEFAULT_PERSONAL, lhs, rhs)
    }
}

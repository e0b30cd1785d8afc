//! Verifier for packed Merkle Mountain Range (MMR) inclusion proofs.
//!
//! An MMR is an append-only accumulator built from a forest of perfect
//! binary Merkle trees ("peaks") laid out in a single linear index
//! space. A packed proof is a compact program for a small stack machine:
//! each command byte pushes a leaf record or an inlined sibling hash,
//! merges the top two stack entries into their parent, marks the top
//! entry as a peak, or bags two peaks. [`verify()`] runs the program and
//! accepts only if the lone surviving entry equals the claimed root and
//! both input streams are fully consumed.
//!
//! # Core entry points
//!
//! - [`verify()`] / [`verify_packed`]: check a packed proof against a
//!   root and `mmr_size`.
//! - [`MMR`]: reference builder (push, root, proof generation).
//! - [`MerkleProof::compile`] + [`CompiledProof::pack`] +
//!   [`pack_leaves`]: produce the wire-format buffers a verifier
//!   consumes.
//!
//! # Wire format
//!
//! The proof stream interleaves command bytes `{1..=5}` with nodes: a
//! pushed node follows its command byte as a 2-byte little-endian length
//! plus payload. The leaf stream is a run of records, each an 8-byte
//! little-endian position, a 2-byte little-endian length, and the
//! payload, in strictly ascending position order. The root is an
//! arbitrary byte string matched by length and content.
//!
//! ```
//! use mmr_packed_proof::{leaf_hash, pack_leaves, verify_packed, Blake2bMerge, MemStore, MMR};
//!
//! let store = MemStore::default();
//! let mut mmr = MMR::<Blake2bMerge, _>::new(0, &store);
//! let positions: Vec<u64> = (0u32..5)
//!     .map(|i| mmr.push(leaf_hash(&i.to_le_bytes()).to_vec()).unwrap())
//!     .collect();
//! let root = mmr.get_root().unwrap();
//! mmr.commit().unwrap();
//!
//! let proof = mmr.gen_proof(vec![positions[2]]).unwrap();
//! let packed_proof = proof.compile(vec![positions[2]]).unwrap().pack().unwrap();
//! let packed_leaves = pack_leaves(&[(positions[2], leaf_hash(&2u32.to_le_bytes()).to_vec())])
//!     .unwrap();
//!
//! verify_packed::<Blake2bMerge>(&root, mmr.mmr_size(), &packed_proof, &packed_leaves)
//!     .expect("proof verifies");
//! ```

#![warn(missing_docs)]

mod compile;
mod error;
pub mod helper;
mod mem_store;
mod merge;
mod mmr;
mod mmr_store;
mod node;
mod reader;
#[cfg(test)]
mod tests;
mod verify;

pub use compile::{compile_proof, pack_leaves, CompiledProof, ProofCommand};
pub use error::{Error, Result};
pub use mem_store::MemStore;
pub use merge::{blake2b_merge_with_personal, leaf_hash, Blake2bMerge, Merge, DEFAULT_PERSONAL};
pub use mmr::{MerkleProof, MMR};
pub use mmr_store::{MMRBatch, MMRStoreReadOps, MMRStoreWriteOps};
pub use node::{Node, MAX_INLINE_LEN};
pub use reader::{LeafReader, ProofReader, SliceReader};
pub use verify::{verify, verify_packed, MAX_STACK_SIZE};

//! Reference MMR builder and sibling-list proof generator.
//!
//! Node values are stored verbatim, so callers append pre-hashed leaves
//! (see [`leaf_hash`](crate::leaf_hash)). The builder exists to produce
//! the roots and proofs that the packed verifier checks; it is not
//! itself part of the verification path.

use std::{borrow::Cow, collections::VecDeque, marker::PhantomData};

use crate::{
    compile::{compile_proof, take_while_vec, CompiledProof},
    helper::{
        get_peak_map, get_peaks, leaf_index_to_pos, parent_offset, pos_height_in_tree,
        sibling_offset,
    },
    mmr_store::{MMRBatch, MMRStoreReadOps, MMRStoreWriteOps},
    Error, Merge, Result,
};

/// An append-only MMR over raw byte values, backed by a pluggable store.
///
/// `M` supplies the hash merge, `S` the backing store. Mutations are
/// buffered in an [`MMRBatch`]; call [`MMR::commit`] to flush them.
#[allow(clippy::upper_case_acronyms)]
pub struct MMR<M, S> {
    mmr_size: u64,
    batch: MMRBatch<S>,
    merge: PhantomData<M>,
}

impl<M, S> MMR<M, S> {
    /// Create a new MMR starting at the given size, backed by `store`.
    ///
    /// Use `mmr_size = 0` for a fresh, empty MMR; to resume, pass the
    /// size returned by [`MMR::mmr_size`] after the last committed
    /// operation.
    pub fn new(mmr_size: u64, store: S) -> Self {
        MMR {
            mmr_size,
            batch: MMRBatch::new(store),
            merge: PhantomData,
        }
    }

    /// The current total number of nodes (leaves + internal) in the MMR.
    pub fn mmr_size(&self) -> u64 {
        self.mmr_size
    }

    /// Returns `true` if the MMR contains no elements.
    pub fn is_empty(&self) -> bool {
        self.mmr_size == 0
    }

    /// Return a reference to the underlying store.
    pub fn store(&self) -> &S {
        self.batch.store()
    }
}

impl<M: Merge, S: MMRStoreReadOps> MMR<M, S> {
    // Find an element by position, checking the in-flight batch first.
    fn find_element_at_position<'b>(
        &self,
        pos: u64,
        hashes: &'b [Vec<u8>],
    ) -> Result<Cow<'b, Vec<u8>>> {
        let pos_offset = pos.checked_sub(self.mmr_size);
        if let Some(elem) = pos_offset.and_then(|i| hashes.get(i as usize)) {
            return Ok(Cow::Borrowed(elem));
        }
        self.batch
            .element_at_position(pos)?
            .map(Cow::Owned)
            .ok_or(Error::InconsistentStore)
    }

    /// Append a leaf value and return its position in the MMR.
    ///
    /// This may also create internal (merged) nodes. The new nodes are
    /// buffered until [`MMR::commit`] is called.
    pub fn push(&mut self, elem: Vec<u8>) -> Result<u64> {
        let mut elems = vec![elem];
        let elem_pos = self.mmr_size;
        let peak_map = get_peak_map(self.mmr_size);
        let mut pos = self.mmr_size;
        let mut peak = 1;
        while (peak_map & peak) != 0 {
            peak <<= 1;
            pos += 1;
            let left_pos = pos - peak;
            let left_elem = self.find_element_at_position(left_pos, &elems)?;
            let right_elem = elems.last().expect("checked");
            let parent_elem = M::merge(&left_elem, right_elem).to_vec();
            elems.push(parent_elem);
        }
        // store hashes
        self.batch.append(elem_pos, elems);
        // update mmr_size
        self.mmr_size = pos + 1;
        Ok(elem_pos)
    }

    /// Compute the root by bagging all peaks right-to-left.
    ///
    /// Returns [`Error::GetRootOnEmpty`] for an empty MMR.
    pub fn get_root(&self) -> Result<Vec<u8>> {
        if self.mmr_size == 0 {
            return Err(Error::GetRootOnEmpty);
        } else if self.mmr_size == 1 {
            return self
                .batch
                .element_at_position(0)?
                .ok_or(Error::InconsistentStore);
        }
        let peaks = get_peaks(self.mmr_size)
            .into_iter()
            .map(|peak_pos| {
                self.batch
                    .element_at_position(peak_pos)
                    .and_then(|elem| elem.ok_or(Error::InconsistentStore))
            })
            .collect::<Result<Vec<_>>>()?;
        bag_peaks::<M>(peaks).ok_or(Error::InconsistentStore)
    }

    // Generate the proof fragment for a single peak sub-tree.
    // `pos_list` must be sorted.
    fn gen_proof_for_peak(
        &self,
        proof: &mut Vec<Vec<u8>>,
        pos_list: Vec<u64>,
        peak_pos: u64,
    ) -> Result<()> {
        // do nothing if position itself is the peak
        if pos_list.len() == 1 && pos_list == [peak_pos] {
            return Ok(());
        }
        // take peak root from store if no positions need to be proof
        if pos_list.is_empty() {
            proof.push(
                self.batch
                    .element_at_position(peak_pos)?
                    .ok_or(Error::InconsistentStore)?,
            );
            return Ok(());
        }

        let mut queue: VecDeque<_> = pos_list.into_iter().map(|pos| (pos, 0u32)).collect();

        // Generate sub-tree merkle proof for positions
        while let Some((pos, height)) = queue.pop_front() {
            debug_assert!(pos <= peak_pos);
            if pos == peak_pos {
                if queue.is_empty() {
                    break;
                } else {
                    return Err(Error::NodeProofsNotSupported);
                }
            }

            // calculate sibling
            let (sib_pos, parent_pos) = {
                let next_height = pos_height_in_tree(pos + 1);
                let offset = sibling_offset(height);
                if next_height > height {
                    // implies pos is right sibling
                    (pos - offset, pos + 1)
                } else {
                    // pos is left sibling
                    (pos + offset, pos + parent_offset(height))
                }
            };

            if Some(&sib_pos) == queue.front().map(|(pos, _)| pos) {
                // drop sibling
                queue.pop_front();
            } else {
                proof.push(
                    self.batch
                        .element_at_position(sib_pos)?
                        .ok_or(Error::InconsistentStore)?,
                );
            }
            if parent_pos < peak_pos {
                // save pos to tree buf
                queue.push_back((parent_pos, height + 1));
            }
        }
        Ok(())
    }

    /// Generate a sibling-list inclusion proof for the given leaf
    /// positions.
    ///
    /// Positions are sorted and deduplicated internally. Returns
    /// [`Error::GenProofForInvalidLeaves`] if the list is empty or any
    /// position is out of range.
    pub fn gen_proof(&self, mut pos_list: Vec<u64>) -> Result<MerkleProof> {
        if pos_list.is_empty() {
            return Err(Error::GenProofForInvalidLeaves);
        }
        if self.mmr_size == 1 && pos_list == [0] {
            return Ok(MerkleProof::new(self.mmr_size, Vec::new()));
        }
        if pos_list.iter().any(|pos| pos_height_in_tree(*pos) > 0) {
            return Err(Error::NodeProofsNotSupported);
        }
        // ensure positions are sorted and unique
        pos_list.sort_unstable();
        pos_list.dedup();
        let peaks = get_peaks(self.mmr_size);
        let mut proof: Vec<Vec<u8>> = Vec::new();
        // generate merkle proof for each peaks
        let mut bagging_track = 0;
        for peak_pos in peaks {
            let pos_list: Vec<_> = take_while_vec(&mut pos_list, |&pos| pos <= peak_pos);
            if pos_list.is_empty() {
                bagging_track += 1;
            } else {
                bagging_track = 0;
            }
            self.gen_proof_for_peak(&mut proof, pos_list, peak_pos)?;
        }

        // ensure no remain positions
        if !pos_list.is_empty() {
            return Err(Error::GenProofForInvalidLeaves);
        }

        // consecutive right peaks with no proved leaves collapse into a
        // single pre-bagged proof item
        if bagging_track > 1 {
            let rhs_peaks = proof.split_off(proof.len() - bagging_track);
            let bagged = bag_peaks::<M>(rhs_peaks).ok_or(Error::InconsistentStore)?;
            proof.push(bagged);
        }

        Ok(MerkleProof::new(self.mmr_size, proof))
    }

    /// Generate a sibling-list inclusion proof for 0-based leaf indices.
    ///
    /// Indices are validated against the current leaf count and
    /// converted to MMR positions before delegating to
    /// [`MMR::gen_proof`]. Returns
    /// [`Error::GenProofForInvalidLeaves`] for an index at or beyond the
    /// leaf count.
    pub fn gen_proof_for_leaves(&self, leaf_indices: &[u64]) -> Result<MerkleProof> {
        // the peak map bitmap doubles as the leaf count
        let leaf_count = get_peak_map(self.mmr_size);
        let mut pos_list = Vec::with_capacity(leaf_indices.len());
        for &index in leaf_indices {
            if index >= leaf_count {
                return Err(Error::GenProofForInvalidLeaves);
            }
            pos_list.push(leaf_index_to_pos(index));
        }
        self.gen_proof(pos_list)
    }
}

impl<M, S: MMRStoreWriteOps> MMR<M, S> {
    /// Flush all buffered mutations to the underlying store.
    pub fn commit(&mut self) -> Result<()> {
        self.batch.commit()
    }
}

/// Bag peaks right-to-left: `merge_peaks(right, left)` until one remains.
pub(crate) fn bag_peaks<M: Merge>(mut peaks: Vec<Vec<u8>>) -> Option<Vec<u8>> {
    while peaks.len() > 1 {
        let right_peak = peaks.pop().expect("pop");
        let left_peak = peaks.pop().expect("pop");
        peaks.push(M::merge_peaks(&right_peak, &left_peak).to_vec());
    }
    peaks.pop()
}

/// A sibling-list inclusion proof produced by [`MMR::gen_proof`].
///
/// Compile it with [`MerkleProof::compile`] to obtain the command
/// program the packed verifier consumes.
#[derive(Clone, Debug)]
pub struct MerkleProof {
    mmr_size: u64,
    proof: Vec<Vec<u8>>,
}

impl MerkleProof {
    /// Construct a proof from pre-computed proof items.
    pub fn new(mmr_size: u64, proof: Vec<Vec<u8>>) -> Self {
        MerkleProof { mmr_size, proof }
    }

    /// The MMR size at the time this proof was generated.
    pub fn mmr_size(&self) -> u64 {
        self.mmr_size
    }

    /// The raw proof items (sibling/peak hashes).
    pub fn proof_items(&self) -> &[Vec<u8>] {
        &self.proof
    }

    /// Compile into the packed command program for `pos_list`, the same
    /// sorted positions the proof was generated for.
    pub fn compile(&self, pos_list: Vec<u64>) -> Result<CompiledProof> {
        compile_proof(self.mmr_size, self.proof.clone(), pos_list)
    }
}

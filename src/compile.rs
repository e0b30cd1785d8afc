//! Compile a sibling-list proof into the packed command program.
//!
//! The compiler replays the reference verification walk over symbolic
//! values instead of hashes, recording which source (leaf stream or
//! inlined proof node) feeds each stack slot, then emits the program in
//! the order the verifier's stack machine expects.

use std::{collections::VecDeque, ops::RangeInclusive, slice};

use crate::{
    helper::{get_peaks, parent_offset, pos_height_in_tree, sibling_offset},
    Error, Result,
};

/// One instruction of the packed proof program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofCommand {
    /// Push the next record from the leaf stream (opcode 1).
    PushLeaf,
    /// Push an inlined proof node (opcode 2, node follows on the wire).
    PushNode(Vec<u8>),
    /// Merge the top two stack entries into their parent (opcode 3).
    Merge,
    /// Bag the two topmost peaks (opcode 4).
    BagPeaks,
    /// Retag the top entry as a peak (opcode 5).
    MarkPeak,
}

/// A proof compiled to the command program understood by the verifier.
#[derive(Clone, Debug)]
pub struct CompiledProof(Vec<ProofCommand>);

impl CompiledProof {
    /// The command program.
    pub fn commands(&self) -> &[ProofCommand] {
        &self.0
    }

    /// Serialize to the wire format: one byte per command, pushed nodes
    /// inlined as a 2-byte little-endian length followed by the payload.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut ret = Vec::new();
        for command in &self.0 {
            match command {
                ProofCommand::PushLeaf => ret.push(1),
                ProofCommand::PushNode(node) => {
                    if node.len() > u16::MAX as usize {
                        return Err(Error::NodeTooLarge);
                    }
                    ret.push(2);
                    ret.extend_from_slice(&(node.len() as u16).to_le_bytes());
                    ret.extend_from_slice(node);
                }
                ProofCommand::Merge => ret.push(3),
                ProofCommand::BagPeaks => ret.push(4),
                ProofCommand::MarkPeak => ret.push(5),
            }
        }
        Ok(ret)
    }
}

/// Serialize leaf records for the leaf stream: 8-byte little-endian
/// position, 2-byte little-endian length, payload.
pub fn pack_leaves(leaves: &[(u64, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut ret = Vec::new();
    for (pos, payload) in leaves {
        if payload.len() > u16::MAX as usize {
            return Err(Error::NodeTooLarge);
        }
        ret.extend_from_slice(&pos.to_le_bytes());
        ret.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        ret.extend_from_slice(payload);
    }
    Ok(ret)
}

// Symbolic stack value used while laying out the program: an inlined
// proof node, the i-th proved leaf, or a merge of two sub-trees covering
// a contiguous range of proved leaf indices.
#[derive(Clone, Debug)]
pub(crate) enum Value {
    Proof(Vec<u8>),
    LeafIndex(usize),
    Merged(Box<Value>, Box<Value>, RangeInclusive<usize>),
}

impl Value {
    pub(crate) fn leaf_range(&self) -> RangeInclusive<usize> {
        #[allow(clippy::reversed_empty_ranges)]
        match self {
            Value::LeafIndex(i) => *i..=*i,
            Value::Merged(.., range) => range.clone(),
            // proof nodes cover no proved leaves
            Value::Proof(_) => 1..=0,
        }
    }
}

pub(crate) fn merge_values(left: Value, right: Value) -> Result<Value> {
    let lr = left.leaf_range();
    let rr = right.leaf_range();

    let range = if lr.is_empty() {
        rr
    } else if rr.is_empty() {
        lr
    } else if lr.end() + 1 == *rr.start() {
        *lr.start()..=*rr.end()
    } else if rr.end() + 1 == *lr.start() {
        *rr.start()..=*lr.end()
    } else {
        return Err(Error::InvalidRange);
    };

    Ok(Value::Merged(Box::new(left), Box::new(right), range))
}

// Replays the verifier's per-peak reconstruction over symbolic values.
fn peak_value(
    leaves: Vec<(u64, Value)>,
    peak_pos: u64,
    proof_iter: &mut slice::Iter<Vec<u8>>,
) -> Result<Value> {
    debug_assert!(!leaves.is_empty(), "can't be empty");

    let mut queue: VecDeque<_> = leaves
        .into_iter()
        .map(|(pos, value)| (pos, value, 0u32))
        .collect();

    while let Some((pos, value, height)) = queue.pop_front() {
        if pos == peak_pos {
            if queue.is_empty() {
                return Ok(value);
            }
            return Err(Error::InvalidProof);
        }
        let next_height = pos_height_in_tree(pos + 1);
        let offset = sibling_offset(height);
        let (parent_pos, parent_value) = if next_height > height {
            // pos is a right child
            let sib_pos = pos - offset;
            let parent_pos = pos + 1;
            let parent_value = if Some(&sib_pos) == queue.front().map(|(pos, ..)| pos) {
                let sibling = queue.pop_front().map(|(_, value, _)| value).expect("front");
                merge_values(sibling, value)?
            } else {
                let sibling = proof_iter.next().ok_or(Error::InvalidProof)?;
                merge_values(Value::Proof(sibling.clone()), value)?
            };
            (parent_pos, parent_value)
        } else {
            // pos is a left child
            let sib_pos = pos + offset;
            let parent_pos = pos + parent_offset(height);
            let parent_value = if Some(&sib_pos) == queue.front().map(|(pos, ..)| pos) {
                let sibling = queue.pop_front().map(|(_, value, _)| value).expect("front");
                merge_values(value, sibling)?
            } else {
                let sibling = proof_iter.next().ok_or(Error::InvalidProof)?;
                merge_values(value, Value::Proof(sibling.clone()))?
            };
            (parent_pos, parent_value)
        };

        if parent_pos <= peak_pos {
            queue.push_back((parent_pos, parent_value, height + 1));
        } else {
            return Err(Error::InvalidProof);
        }
    }
    Err(Error::InvalidProof)
}

fn peaks_values(
    mut leaves: Vec<(u64, Value)>,
    mmr_size: u64,
    proof_items: &[Vec<u8>],
) -> Result<Vec<Value>> {
    // special handle the only 1 leaf MMR
    if mmr_size == 1 && leaves.len() == 1 && leaves[0].0 == 0 {
        return Ok(leaves.into_iter().map(|(_pos, value)| value).collect());
    }

    let peaks = get_peaks(mmr_size);
    let mut proof_iter = proof_items.iter();
    let mut values: Vec<Value> = Vec::with_capacity(peaks.len() + 1);
    for peak_pos in peaks {
        let mut peak_leaves: Vec<_> = take_while_vec(&mut leaves, |(pos, _)| *pos <= peak_pos);
        let value = if peak_leaves.len() == 1 && peak_leaves[0].0 == peak_pos {
            // leaf is the peak
            peak_leaves.remove(0).1
        } else if peak_leaves.is_empty() {
            // an untouched peak comes straight from the proof; once the
            // proof runs out, the remaining right peaks were pre-bagged
            match proof_iter.next() {
                Some(peak_root) => Value::Proof(peak_root.clone()),
                None => break,
            }
        } else {
            peak_value(peak_leaves, peak_pos, &mut proof_iter)?
        };
        values.push(value);
    }

    if !leaves.is_empty() {
        return Err(Error::GenProofForInvalidLeaves);
    }

    // the pre-bagged right-hand-side root, if any
    if let Some(rhs_bagged) = proof_iter.next() {
        values.push(Value::Proof(rhs_bagged.clone()));
    }
    if proof_iter.next().is_some() {
        return Err(Error::InvalidProof);
    }
    Ok(values)
}

fn emit_value(commands: &mut Vec<ProofCommand>, value: &Value) {
    match value {
        Value::Merged(lhs, rhs, _) => {
            // emit the side covering earlier leaves first so the leaf
            // stream is consumed in ascending position order
            if lhs.leaf_range().start() < rhs.leaf_range().start() {
                emit_value(commands, lhs);
                emit_value(commands, rhs);
            } else {
                emit_value(commands, rhs);
                emit_value(commands, lhs);
            }
            commands.push(ProofCommand::Merge);
        }
        Value::LeafIndex(_) => commands.push(ProofCommand::PushLeaf),
        Value::Proof(node) => commands.push(ProofCommand::PushNode(node.clone())),
    }
}

/// Compile a sibling-list proof into the command program proving
/// `pos_list`.
///
/// `pos_list` must hold strictly ascending leaf positions, the same
/// sorted positions the proof was generated for; `proof_items` are the
/// sibling hashes exactly as the generator produced them.
pub fn compile_proof(
    mmr_size: u64,
    proof_items: Vec<Vec<u8>>,
    pos_list: Vec<u64>,
) -> Result<CompiledProof> {
    if pos_list.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(Error::LeavesUnsorted);
    }
    if pos_list.iter().any(|pos| pos_height_in_tree(*pos) > 0) {
        return Err(Error::NodeProofsNotSupported);
    }

    let leaves = pos_list
        .into_iter()
        .enumerate()
        .map(|(i, pos)| (pos, Value::LeafIndex(i)))
        .collect();

    let peaks = peaks_values(leaves, mmr_size, &proof_items)?;
    // peaks with proved leaves must cover contiguous leaf-index ranges;
    // anything else means positions and proof items disagree
    if peaks.windows(2).any(|pair| {
        let lhs_range = pair[0].leaf_range();
        let rhs_range = pair[1].leaf_range();
        !lhs_range.is_empty() && !rhs_range.is_empty() && lhs_range.end() + 1 != *rhs_range.start()
    }) {
        return Err(Error::InvalidRange);
    }

    let mut commands = Vec::new();
    for peak in &peaks {
        emit_value(&mut commands, peak);
        commands.push(ProofCommand::MarkPeak);
    }

    // bagging scans peaks right to left; the stack already keeps the
    // rightmost value on top, so a run of bag commands suffices
    for _ in 1..peaks.len() {
        commands.push(ProofCommand::BagPeaks);
    }

    Ok(CompiledProof(commands))
}

/// Drain elements from the front of `v` while `p` returns true.
pub(crate) fn take_while_vec<T, P: Fn(&T) -> bool>(v: &mut Vec<T>, p: P) -> Vec<T> {
    for i in 0..v.len() {
        if !p(&v[i]) {
            return v.drain(..i).collect();
        }
    }
    std::mem::take(v)
}

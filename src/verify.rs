//! The proof verification engine: a command-driven stack machine.
//!
//! One command byte is consumed per iteration until the proof stream
//! ends. Each command pushes a leaf or proof node, merges the top two
//! entries into their parent, marks the top entry as a peak, or bags two
//! peaks; the surviving entry must equal the claimed root.

use crate::{
    helper::{parent_offset, pos_height_in_tree, sibling_offset, PeakCursor},
    reader::{LeafReader, ProofReader, SliceReader},
    Error, Merge, Node, Result,
};

/// Upper bound on in-flight stack entries during verification.
///
/// Covers the maximum tree height of any practical MMR plus headroom for
/// pushed proof nodes; proofs that exceed it are rejected, never
/// reallocated.
pub const MAX_STACK_SIZE: usize = 257;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryKind {
    /// A reconstructed subtree root with a trusted position and height.
    Node,
    /// A sibling hash supplied by the proof; position unknown until it
    /// participates in a merge.
    Proof,
    /// A finalized peak root.
    Peak,
}

#[derive(Clone, Copy, Debug)]
struct StackEntry<'buf> {
    kind: EntryKind,
    node: Node<'buf>,
    pos: u64,
    height: u32,
}

/// Verify a packed proof and leaf buffer against `root` using the
/// default in-memory readers.
pub fn verify_packed<M: Merge>(
    root: &[u8],
    mmr_size: u64,
    proof: &[u8],
    leaves: &[u8],
) -> Result<()> {
    verify::<M, _, _>(
        root,
        mmr_size,
        &mut SliceReader::new(proof),
        &mut SliceReader::new(leaves),
    )
}

/// Verify that the command program in `proof` reconstructs `root` from
/// the records in `leaves`.
///
/// Acceptance requires the command stream to end cleanly, exactly one
/// stack entry to survive, the leaf stream to be exhausted, and the
/// surviving entry to equal `root` by length and bytes. Every violation
/// is fatal and reported with a specific [`Error`]; nothing external is
/// mutated, so identical inputs always produce identical results.
pub fn verify<'buf, M, P, L>(
    root: &[u8],
    mmr_size: u64,
    proof: &mut P,
    leaves: &mut L,
) -> Result<()>
where
    M: Merge,
    P: ProofReader<'buf>,
    L: LeafReader<'buf>,
{
    // nothing to verify against an empty MMR
    if mmr_size == 0 {
        return Err(Error::InvalidProof);
    }

    let mut stack: Vec<StackEntry<'buf>> = Vec::with_capacity(MAX_STACK_SIZE);
    let mut next_peak = PeakCursor::new(mmr_size);
    let mut last_leaf_pos: Option<u64> = None;

    while let Some(command) = proof.read_command()? {
        match command {
            // push the next record from the leaf stream
            1 => {
                if stack.len() >= MAX_STACK_SIZE {
                    return Err(Error::InvalidStack);
                }
                let (pos, node) = leaves.read_leaf()?.ok_or(Error::NoMoreLeaves)?;
                if let Some(last) = last_leaf_pos {
                    // leaves must arrive in strictly ascending order
                    if last >= pos {
                        return Err(Error::InvalidProof);
                    }
                }
                if pos >= mmr_size {
                    return Err(Error::InvalidProof);
                }
                if pos_height_in_tree(pos) > 0 {
                    return Err(Error::InvalidProof);
                }
                last_leaf_pos = Some(pos);
                stack.push(StackEntry {
                    kind: EntryKind::Node,
                    node,
                    pos,
                    height: 0,
                });
            }
            // push an inlined proof node
            2 => {
                if stack.len() >= MAX_STACK_SIZE {
                    return Err(Error::InvalidStack);
                }
                let node = proof.read_node()?;
                stack.push(StackEntry {
                    kind: EntryKind::Proof,
                    node,
                    pos: 0,
                    height: 0,
                });
            }
            // merge the top two entries into their parent
            3 => {
                if stack.len() < 2 {
                    return Err(Error::InvalidStack);
                }
                let top = stack[stack.len() - 1];
                let second = stack[stack.len() - 2];
                // the entry with a trusted position drives the
                // sibling/parent arithmetic; a proof entry's position is
                // unknown until it participates here
                let (trusted, other) = if second.kind == EntryKind::Proof {
                    (top, second)
                } else {
                    (second, top)
                };
                let pos = trusted.pos;
                let height = trusted.height;
                let next_height = pos_height_in_tree(pos + 1);
                let offset = sibling_offset(height);
                let (sib_pos, parent_pos) = if next_height > height {
                    // pos is a right child
                    (pos - offset, pos + 1)
                } else {
                    (pos + offset, pos + parent_offset(height))
                };
                if other.kind != EntryKind::Proof && other.pos != sib_pos {
                    return Err(Error::InvalidProof);
                }
                let parent_hash = if next_height > height {
                    M::merge(other.node.value(), trusted.node.value())
                } else {
                    M::merge(trusted.node.value(), other.node.value())
                };
                stack.pop();
                *stack.last_mut().expect("len checked") = StackEntry {
                    kind: EntryKind::Node,
                    node: Node::from_hash(parent_hash),
                    pos: parent_pos,
                    height: height + 1,
                };
            }
            // bag the two topmost peaks
            4 => {
                if stack.len() < 2 {
                    return Err(Error::InvalidStack);
                }
                let top = stack[stack.len() - 1];
                let second = stack[stack.len() - 2];
                if top.kind != EntryKind::Peak || second.kind != EntryKind::Peak {
                    return Err(Error::InvalidProof);
                }
                // on-wire contract: top of stack is hashed first
                let bagged = M::merge_peaks(top.node.value(), second.node.value());
                stack.pop();
                let entry = stack.last_mut().expect("len checked");
                entry.node = Node::from_hash(bagged);
                entry.height = 0;
            }
            // retag the top entry as a peak
            5 => {
                let entry = stack.last_mut().ok_or(Error::InvalidStack)?;
                if entry.kind != EntryKind::Proof {
                    // single-pass walk: skip past non-matching peaks,
                    // then consume the matched one
                    while let Some(peak_pos) = next_peak.pos() {
                        if peak_pos == entry.pos {
                            break;
                        }
                        next_peak.advance();
                    }
                    if next_peak.pos().is_none() {
                        return Err(Error::InvalidProof);
                    }
                    next_peak.advance();
                }
                // a proof-supplied peak has no position to check; the
                // bagging step and root comparison cover it by hash
                entry.kind = EntryKind::Peak;
            }
            unknown => return Err(Error::InvalidCommand(unknown)),
        }
    }

    if stack.len() != 1 {
        return Err(Error::InvalidProof);
    }
    // a parseable residual leaf means the proof did not consume the
    // whole stream; residual garbage surfaces the reader's own error
    if leaves.read_leaf()?.is_some() {
        return Err(Error::InvalidProof);
    }
    let computed = &stack[0].node;
    if computed.len() != root.len() || computed.value() != root {
        return Err(Error::InvalidProof);
    }
    Ok(())
}

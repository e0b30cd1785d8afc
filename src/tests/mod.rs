
use crate::{leaf_hash, pack_leaves, Blake2bMerge, MemStore, MMR};

/// Leaf node value for an integer payload (test convenience).
pub(crate) fn leaf_from_u32(i: u32) -> Vec<u8> {
    leaf_hash(&i.to_le_bytes()).to_vec()
}

/// Build an MMR over hashed integer leaves; returns the handle and the
/// position of each leaf.
pub(crate) fn build_mmr(store: &MemStore, count: u32) -> (MMR<Blake2bMerge, &MemStore>, Vec<u64>) {
    let mut mmr = MMR::<Blake2bMerge, _>::new(0, store);
    let positions = (0..count)
        .map(|i| mmr.push(leaf_from_u32(i)).expect("push"))
        .collect();
    (mmr, positions)
}

/// Generate the packed proof and leaf buffers proving `leaf_indices`
/// (which must be sorted and unique).
pub(crate) fn packed_proof_for(
    mmr: &MMR<Blake2bMerge, &MemStore>,
    positions: &[u64],
    leaf_indices: &[u32],
) -> (Vec<u8>, Vec<u8>) {
    let indices: Vec<u64> = leaf_indices.iter().map(|&i| u64::from(i)).collect();
    let proof = mmr.gen_proof_for_leaves(&indices).expect("gen proof");
    let proved_positions: Vec<u64> = leaf_indices
        .iter()
        .map(|i| positions[*i as usize])
        .collect();
    let packed_proof = proof
        .compile(proved_positions)
        .expect("compile proof")
        .pack()
        .expect("pack proof");
    let leaves: Vec<(u64, Vec<u8>)> = leaf_indices
        .iter()
        .map(|i| (positions[*i as usize], leaf_from_u32(*i)))
        .collect();
    let packed_leaves = pack_leaves(&leaves).expect("pack leaves");
    (packed_proof, packed_leaves)
}

/// Append one leaf record to a packed leaf buffer.
pub(crate) fn push_leaf_record(buf: &mut Vec<u8>, pos: u64, payload: &[u8]) {
    buf.extend_from_slice(&pos.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    buf.extend_from_slice(payload);
}

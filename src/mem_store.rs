use std::{cell::RefCell, collections::BTreeMap};

use crate::{MMRStoreReadOps, MMRStoreWriteOps, Result};

/// In-memory MMR store backed by a `BTreeMap`.
///
/// Useful for tests and for building the reference MMRs that proofs are
/// generated from.
#[derive(Clone, Default)]
pub struct MemStore(RefCell<BTreeMap<u64, Vec<u8>>>);

impl MMRStoreReadOps for &MemStore {
    fn element_at_position(&self, pos: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.0.borrow().get(&pos).cloned())
    }
}

impl MMRStoreWriteOps for &MemStore {
    fn append(&mut self, pos: u64, elems: Vec<Vec<u8>>) -> Result<()> {
        let mut store = self.0.borrow_mut();
        for (i, elem) in elems.into_iter().enumerate() {
            store.insert(pos + i as u64, elem);
        }
        Ok(())
    }
}

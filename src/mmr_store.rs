use crate::Result;

/// Write-ahead batch buffer for MMR mutations.
///
/// Appended elements are held in memory and served back on reads
/// (overlay semantics). [`MMRBatch::commit`] flushes the buffer to the
/// underlying store.
#[derive(Default)]
pub struct MMRBatch<Store> {
    memory_batch: Vec<(u64, Vec<Vec<u8>>)>,
    store: Store,
}

impl<Store> MMRBatch<Store> {
    /// Create a new batch wrapping the given store.
    pub fn new(store: Store) -> Self {
        MMRBatch {
            memory_batch: Vec::new(),
            store,
        }
    }

    /// Buffer a contiguous run of elements starting at `pos`.
    pub fn append(&mut self, pos: u64, elems: Vec<Vec<u8>>) {
        self.memory_batch.push((pos, elems));
    }

    /// Return a reference to the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl<Store: MMRStoreReadOps> MMRBatch<Store> {
    /// Look up an element by position, checking the in-memory batch
    /// first.
    pub fn element_at_position(&self, pos: u64) -> Result<Option<Vec<u8>>> {
        for (start_pos, elems) in self.memory_batch.iter().rev() {
            if pos < *start_pos {
                continue;
            } else if pos < start_pos + elems.len() as u64 {
                return Ok(elems.get((pos - start_pos) as usize).cloned());
            } else {
                break;
            }
        }
        self.store.element_at_position(pos)
    }
}

impl<Store: MMRStoreWriteOps> MMRBatch<Store> {
    /// Flush all buffered elements to the underlying store.
    pub fn commit(&mut self) -> Result<()> {
        for (pos, elems) in self.memory_batch.drain(..) {
            self.store.append(pos, elems)?;
        }
        Ok(())
    }
}

/// Read access to the MMR backing store.
///
/// Implementations return the node value at a given MMR position, or
/// `None` if the position has not been written yet.
pub trait MMRStoreReadOps {
    /// Retrieve the element stored at `pos`, if any.
    fn element_at_position(&self, pos: u64) -> Result<Option<Vec<u8>>>;
}

/// Write access to the MMR backing store.
///
/// Implementations persist a contiguous run of elements starting at
/// `pos`.
pub trait MMRStoreWriteOps {
    /// Persist `elems` starting at position `pos`.
    fn append(&mut self, pos: u64, elems: Vec<Vec<u8>>) -> Result<()>;
}

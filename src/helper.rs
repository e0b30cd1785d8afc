//! Position arithmetic over the MMR's linear post-order layout.
//!
//! Positions are `u64` indices into the canonical layout where a perfect
//! subtree of height `h` rooted at `p` spans `p - (2^(h+1) - 2) ..= p`:
//!
//! ```text
//!           14
//!        /       \
//!      6          13
//!    /   \       /   \
//!   2     5     9     12     17
//!  / \   /  \  / \   /  \   /  \
//! 0   1 3   4 7   8 10  11 15  16 18
//! ```

/// Offset from a node at `height` to its parent.
pub fn parent_offset(height: u32) -> u64 {
    2 << height
}

/// Offset between siblings at `height`.
pub fn sibling_offset(height: u32) -> u64 {
    (2 << height) - 1
}

/// True iff `num` is non-zero and has no zero bits below its most
/// significant one.
pub fn all_ones(num: u64) -> bool {
    num != 0 && num.count_zeros() == num.leading_zeros()
}

fn jump_left(pos: u64) -> u64 {
    let bit_length = 64 - pos.leading_zeros();
    let most_significant_bit = 1 << (bit_length - 1);
    pos - (most_significant_bit - 1)
}

/// Height of the perfect subtree rooted at `pos`; leaf positions have
/// height 0.
pub fn pos_height_in_tree(mut pos: u64) -> u32 {
    pos += 1;

    while !all_ones(pos) {
        pos = jump_left(pos);
    }

    64 - pos.leading_zeros() - 1
}

/// Convert a 0-based leaf index to its MMR position.
///
/// Overflows for `index >= 2^63 - 1`; callers validate indices first.
pub fn leaf_index_to_pos(index: u64) -> u64 {
    // mmr_size - H - 1, H is the height(intervals) of last peak
    leaf_index_to_mmr_size(index) - (index + 1).trailing_zeros() as u64 - 1
}

/// MMR size after `index + 1` leaves have been appended.
pub fn leaf_index_to_mmr_size(index: u64) -> u64 {
    // leaf index start with 0
    let leaves_count = index + 1;

    // the peak count(k) is the count of 1 in leaves count's binary
    // representation
    let peak_count = leaves_count.count_ones() as u64;

    2 * leaves_count - peak_count
}

/// Heights of the peaks of the MMR, presented as a bitmap.
///
/// For an MMR with 11 leaves (`mmr_size` 19) this returns `0b1011`:
/// peaks at heights 0, 1 and 3. An invalid `mmr_size` yields the bitmap
/// of the last valid MMR below it.
pub fn get_peak_map(mmr_size: u64) -> u64 {
    if mmr_size == 0 {
        return 0;
    }

    let mut pos = mmr_size;
    let mut peak_size = u64::MAX >> pos.leading_zeros();
    let mut peak_map = 0;
    while peak_size > 0 {
        peak_map <<= 1;
        if pos >= peak_size {
            pos -= peak_size;
            peak_map |= 1;
        }
        peak_size >>= 1;
    }

    peak_map
}

fn peak_pos_by_height(height: u32) -> u64 {
    (1 << (height + 1)) - 2
}

/// Cursor over the expected peak positions of an MMR, from the leftmost
/// (highest) peak to the rightmost (smallest).
///
/// The verifier walks this cursor in a single pass while replaying the
/// proof's peak markers; once exhausted it stays exhausted.
#[derive(Clone, Copy, Debug)]
pub struct PeakCursor {
    mmr_size: u64,
    pos: u64,
    height: u32,
    present: bool,
}

impl PeakCursor {
    /// Position the cursor at the leftmost peak.
    ///
    /// `mmr_size` must be non-zero; the verifier rejects empty MMRs
    /// before building a cursor.
    pub fn new(mmr_size: u64) -> Self {
        let mut height = 1;
        let mut prev_pos = 0;
        let mut pos = peak_pos_by_height(height);
        while pos < mmr_size {
            height += 1;
            prev_pos = pos;
            pos = peak_pos_by_height(height);
        }
        PeakCursor {
            mmr_size,
            pos: prev_pos,
            height: height - 1,
            present: true,
        }
    }

    /// Position of the current peak, or `None` once no peaks remain.
    pub fn pos(&self) -> Option<u64> {
        self.present.then_some(self.pos)
    }

    /// Move to the next peak to the right.
    pub fn advance(&mut self) {
        if !self.present {
            return;
        }
        let mut height = self.height;
        // move to the right sibling position, then descend until the
        // position falls inside the MMR
        let mut pos = self.pos + sibling_offset(height);
        while pos > self.mmr_size - 1 {
            if height == 0 {
                self.present = false;
                return;
            }
            pos -= parent_offset(height - 1);
            height -= 1;
        }
        self.pos = pos;
        self.height = height;
    }
}

/// Positions of all peaks for `mmr_size`, left to right.
pub fn get_peaks(mmr_size: u64) -> Vec<u64> {
    if mmr_size == 0 {
        return Vec::new();
    }
    let mut peaks = Vec::new();
    let mut cursor = PeakCursor::new(mmr_size);
    while let Some(pos) = cursor.pos() {
        peaks.push(pos);
        cursor.advance();
    }
    peaks
}

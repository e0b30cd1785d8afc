use thiserror::Error;

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for proof verification and proof building.
///
/// The first group of variants covers every way a packed proof can be
/// rejected by [`verify`](crate::verify()); each of those carries a stable
/// numeric code (see [`Error::code`]) so constrained deployments can
/// surface the result as a single exit status. The remaining variants
/// come from the reference builder and the proof compiler and have no
/// wire code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The verifier stack overflowed its fixed capacity, or a command
    /// found fewer entries than it consumes.
    #[error("proof stack overflow or underflow")]
    InvalidStack,
    /// The proof stream contained a command byte outside the known set.
    #[error("unknown proof command 0x{0:02x}")]
    InvalidCommand(u8),
    /// Any structural or semantic violation: bad leaf positions,
    /// mismatched siblings, wrong peak, residual leaves, root mismatch,
    /// or an empty MMR.
    #[error("invalid proof")]
    InvalidProof,
    /// The proof stream ended where more data was required.
    #[error("unexpected end of proof stream")]
    ProofEof,
    /// The leaf stream ended in the middle of a record's position prefix.
    #[error("truncated leaf record")]
    LeafEof,
    /// A command requested a leaf but the leaf stream was exhausted.
    #[error("no more leaves")]
    NoMoreLeaves,
    /// A command was requested but the command stream was exhausted.
    #[error("no more commands")]
    NoMoreCommands,
    /// A length-prefixed node extends past the end of its buffer.
    #[error("truncated node")]
    NodeEof,

    /// Tried to compute the root hash of an empty MMR.
    #[error("get root on an empty MMR")]
    GetRootOnEmpty,
    /// The backing store returned data inconsistent with the expected
    /// MMR structure.
    #[error("inconsistent store")]
    InconsistentStore,
    /// Proof generation was asked for an empty or out-of-range leaf set.
    #[error("generate proof for invalid leaves")]
    GenProofForInvalidLeaves,
    /// Tried to prove membership of a non-leaf position.
    #[error("tried to prove a non-leaf position")]
    NodeProofsNotSupported,
    /// Positions handed to the proof compiler must be strictly ascending.
    #[error("leaves are unsorted")]
    LeavesUnsorted,
    /// Compiled sub-proofs cover leaf-index ranges that are not
    /// contiguous.
    #[error("discontiguous leaf range")]
    InvalidRange,
    /// A node payload exceeds the `u16` length prefix of the wire format.
    #[error("node payload too large to pack")]
    NodeTooLarge,
}

impl Error {
    /// Stable numeric code for verification failures.
    ///
    /// Codes start at 80 to stay disjoint from surrounding components.
    /// Builder and compiler errors return `None`; they never escape a
    /// `verify` call.
    pub const fn code(&self) -> Option<u8> {
        match self {
            Error::InvalidStack => Some(80),
            Error::InvalidCommand(_) => Some(81),
            Error::InvalidProof => Some(82),
            Error::ProofEof => Some(83),
            Error::LeafEof => Some(84),
            Error::NoMoreLeaves => Some(85),
            Error::NoMoreCommands => Some(86),
            Error::NodeEof => Some(87),
            _ => None,
        }
    }
}

use rust_decimal::Decimal;

use crate::member::{MemberId, Position};

/// Error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid Argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// No open slot within the depth bound.
    #[error("tree full: no open slot under sponsor {sponsor} within {max_level} levels")]
    TreeFull {
        /// The sponsor whose downline was searched.
        sponsor: MemberId,
        /// The depth bound.
        max_level: u8,
    },
    /// The slot was taken before the edge could be inserted.
    #[error("slot occupied: {parent} already has a {position} child")]
    SlotOccupied {
        /// Structural parent.
        parent: MemberId,
        /// Requested position.
        position: Position,
    },
    /// The member already has a structural parent or a downline of its own.
    #[error("member {0} has already been placed")]
    AlreadyPlaced(MemberId),
    /// The member is the sponsor or one of the sponsor's structural ancestors.
    #[error("placing {member} under {sponsor} would create a cycle")]
    WouldCycle {
        /// The member to place.
        member: MemberId,
        /// The sponsor.
        sponsor: MemberId,
    },
    /// Missing wallet row.
    #[error("missing wallet for member {0}")]
    MissingWallet(MemberId),
    /// Wallet has been opened.
    #[error("wallet for member {0} already exists")]
    WalletExists(MemberId),
    /// Band percentages do not sum to exactly one hundred.
    #[error("level band percentages sum to {sum}, expected 100")]
    ConfigurationChecksum {
        /// The actual sum.
        sum: Decimal,
    },
    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// Level out of range.
    #[error("invalid level: {0}")]
    InvalidLevel(u8),
    /// Concurrent write conflict at the storage layer.
    #[error("transaction conflict")]
    TransactionConflict,
    /// The transaction kept conflicting.
    #[error("transaction conflict persisted after {0} attempts")]
    ConflictRetriesExhausted(usize),
    /// Storage error reported by a store implementation.
    #[error("storage: {0}")]
    Storage(String),
    /// Overflow.
    #[error("overflow")]
    Overflow,
    /// Unknown computation error.
    #[error("unknown computation error: {0}")]
    Computation(&'static str),
}

impl Error {
    /// Returns whether the failed operation is safe to retry from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict | Self::SlotOccupied { .. })
    }
}

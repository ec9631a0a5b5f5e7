#![deny(missing_docs)]
#![deny(unreachable_pub)]

//! Core of a binary referral network: placement tree, level-banded community
//! distribution, referral-gated unlocks and the point ledger.

/// Members and placement edges.
pub mod member;

/// Network params.
pub mod params;

/// Placement tree.
pub mod tree;

/// Wallets, buckets and ledger.
pub mod ledger;

/// Actions.
pub mod action;

/// Domain events.
pub mod event;

/// Transactional stores.
pub mod store;

/// Workflow runner.
pub mod network;

/// Error type.
pub mod error;


pub use action::{NetworkAction, NetworkStoreExt};
pub use error::Error;
pub use event::{EventSink, EventSource, RecordingSink, RewardEvent};
pub use ledger::{LedgerStore, LedgerStoreExt};
pub use member::{MemberId, PlacementEdge, Position, MAX_LEVEL};
pub use network::Network;
pub use params::Params;
pub use store::{MemoryStore, Transactional};
pub use tree::{TreeStore, TreeStoreExt};

/// Alias for result.
pub type Result<T> = std::result::Result<T, Error>;

/// In-memory store.
pub mod memory;

pub use memory::{MemoryState, MemoryStore, MemoryTxn, Snapshot};

use crate::{ledger::LedgerStore, tree::TreeStore};

/// A store that runs operations in isolated transactions.
pub trait Transactional {
    /// Transaction type.
    type Txn: TreeStore + LedgerStore;

    /// Begin a new transaction.
    fn begin(&self) -> crate::Result<Self::Txn>;

    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns [`Error::TransactionConflict`](crate::Error::TransactionConflict) and applies
    /// nothing if another transaction committed since `txn` began.
    fn commit(&self, txn: Self::Txn) -> crate::Result<()>;
}

impl<T: Transactional + ?Sized> Transactional for std::sync::Arc<T> {
    type Txn = T::Txn;

    fn begin(&self) -> crate::Result<Self::Txn> {
        (**self).begin()
    }

    fn commit(&self, txn: Self::Txn) -> crate::Result<()> {
        (**self).commit(txn)
    }
}

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    ledger::{LedgerEntry, LedgerStore, LevelBucket, Wallet},
    member::{is_valid_level, MemberId, PlacementEdge, Position},
    tree::{TreeStore, TreeStoreExt},
};

use super::Transactional;

/// Plain in-memory tables implementing both store contracts.
///
/// Writes apply immediately; wrap it in a [`MemoryStore`] for transactions.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    edges: BTreeMap<MemberId, PlacementEdge>,
    children: BTreeMap<(MemberId, Position), MemberId>,
    wallets: BTreeMap<MemberId, Wallet>,
    buckets: BTreeMap<(MemberId, u8), LevelBucket>,
    entries: Vec<LedgerEntry>,
    entries_by_member: HashMap<MemberId, Vec<usize>>,
    last_sequence: u64,
}

/// Serializable export of a [`MemoryState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Snapshot {
    /// Placement edges, ordered by child.
    pub edges: Vec<PlacementEdge>,
    /// Wallets, ordered by member.
    pub wallets: Vec<Wallet>,
    /// Buckets, ordered by `(member, level)`.
    pub buckets: Vec<LevelBucket>,
    /// Ledger entries in append order.
    pub entries: Vec<LedgerEntry>,
}

impl MemoryState {
    /// Get the number of placement edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get all placement edges, ordered by child.
    pub fn edges(&self) -> impl Iterator<Item = &PlacementEdge> {
        self.edges.values()
    }

    /// Get all wallets, ordered by member.
    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    /// Get the sequence number of the last appended entry, `0` if none.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Export the tables.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            edges: self.edges.values().copied().collect(),
            wallets: self.wallets.values().cloned().collect(),
            buckets: self.buckets.values().cloned().collect(),
            entries: self.entries.clone(),
        }
    }

    /// Rebuild the tables from a [`Snapshot`], checking the same constraints as the
    /// regular write paths.
    pub fn from_snapshot(snapshot: Snapshot) -> crate::Result<Self> {
        let mut state = Self::default();
        for edge in snapshot.edges {
            state.insert_edge(edge)?;
        }
        let members = state.edges.keys().copied().collect::<Vec<_>>();
        for member in members {
            if let Some(edge) = state.edges.get(&member) {
                if state.is_in_upline(member, edge.parent)? {
                    return Err(crate::Error::WouldCycle {
                        member,
                        sponsor: edge.sponsor,
                    });
                }
            }
        }
        for wallet in snapshot.wallets {
            if state.wallets.contains_key(&wallet.member()) {
                return Err(crate::Error::WalletExists(wallet.member()));
            }
            if !is_valid_level(wallet.unlocked_level()) {
                return Err(crate::Error::InvalidLevel(wallet.unlocked_level()));
            }
            state.put_wallet(wallet)?;
        }
        for bucket in snapshot.buckets {
            if state.buckets.contains_key(&(bucket.member(), bucket.level())) {
                return Err(crate::Error::Storage(format!(
                    "duplicate bucket for member {} at level {}",
                    bucket.member(),
                    bucket.level()
                )));
            }
            state.put_bucket(bucket)?;
        }
        for entry in snapshot.entries {
            if entry.sequence <= state.last_sequence {
                return Err(crate::Error::Storage(format!(
                    "ledger sequence {} is not increasing",
                    entry.sequence
                )));
            }
            state.last_sequence = entry.sequence;
            state.push_entry(entry);
        }
        Ok(state)
    }

    /// Remove a wallet row, leaving its buckets and entries in place.
    #[cfg(any(test, feature = "test"))]
    pub fn remove_wallet(&mut self, member: MemberId) -> Option<Wallet> {
        self.wallets.remove(&member)
    }

    fn push_entry(&mut self, entry: LedgerEntry) {
        self.entries_by_member
            .entry(entry.member)
            .or_default()
            .push(self.entries.len());
        self.entries.push(entry);
    }
}

impl TreeStore for MemoryState {
    fn child(&self, parent: MemberId, position: Position) -> crate::Result<Option<MemberId>> {
        Ok(self.children.get(&(parent, position)).copied())
    }

    fn parent_edge(&self, child: MemberId) -> crate::Result<Option<PlacementEdge>> {
        Ok(self.edges.get(&child).copied())
    }

    fn insert_edge(&mut self, edge: PlacementEdge) -> crate::Result<()> {
        if edge.parent == edge.child {
            return Err(crate::Error::InvalidArgument("self-referencing edge"));
        }
        if self.edges.contains_key(&edge.child) {
            return Err(crate::Error::AlreadyPlaced(edge.child));
        }
        let slot = (edge.parent, edge.position);
        if self.children.contains_key(&slot) {
            return Err(crate::Error::SlotOccupied {
                parent: edge.parent,
                position: edge.position,
            });
        }
        self.children.insert(slot, edge.child);
        self.edges.insert(edge.child, edge);
        Ok(())
    }
}

impl LedgerStore for MemoryState {
    fn wallet(&self, member: MemberId) -> crate::Result<Option<Wallet>> {
        Ok(self.wallets.get(&member).cloned())
    }

    fn put_wallet(&mut self, wallet: Wallet) -> crate::Result<()> {
        self.wallets.insert(wallet.member(), wallet);
        Ok(())
    }

    fn bucket(&self, member: MemberId, level: u8) -> crate::Result<Option<LevelBucket>> {
        Ok(self.buckets.get(&(member, level)).cloned())
    }

    fn put_bucket(&mut self, bucket: LevelBucket) -> crate::Result<()> {
        if !is_valid_level(bucket.level()) {
            return Err(crate::Error::InvalidLevel(bucket.level()));
        }
        self.buckets
            .insert((bucket.member(), bucket.level()), bucket);
        Ok(())
    }

    fn buckets(&self, member: MemberId) -> crate::Result<Vec<LevelBucket>> {
        Ok(self
            .buckets
            .range((member, 0)..=(member, u8::MAX))
            .map(|(_, bucket)| bucket.clone())
            .collect())
    }

    fn append_entry(&mut self, mut entry: LedgerEntry) -> crate::Result<u64> {
        let sequence = self
            .last_sequence
            .checked_add(1)
            .ok_or(crate::Error::Overflow)?;
        entry.sequence = sequence;
        self.last_sequence = sequence;
        self.push_entry(entry);
        Ok(sequence)
    }

    fn entries(&self, member: MemberId) -> crate::Result<Vec<LedgerEntry>> {
        Ok(self
            .entries_by_member
            .get(&member)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|idx| self.entries.get(*idx))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct Shared {
    version: u64,
    state: MemoryState,
}

/// Transactional in-memory store.
///
/// Every transaction works on a private copy of the state taken at
/// [`begin`](Transactional::begin). Commit succeeds only if no other transaction
/// committed in between. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    /// Create a store with the given initial state.
    pub fn with_state(state: MemoryState) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared { version: 0, state })),
        }
    }

    /// Create a store from a [`Snapshot`].
    pub fn from_snapshot(snapshot: Snapshot) -> crate::Result<Self> {
        Ok(Self::with_state(MemoryState::from_snapshot(snapshot)?))
    }

    /// Export the committed state.
    pub fn snapshot(&self) -> crate::Result<Snapshot> {
        Ok(self.lock()?.state.snapshot())
    }

    /// Get the number of commits applied so far.
    pub fn version(&self) -> crate::Result<u64> {
        Ok(self.lock()?.version)
    }

    /// Run `f` against the committed state.
    pub fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> crate::Result<T> {
        Ok(f(&self.lock()?.state))
    }

    fn lock(&self) -> crate::Result<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|_| crate::Error::Storage("memory store lock poisoned".to_owned()))
    }
}

/// Transaction of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTxn {
    base: u64,
    dirty: bool,
    state: MemoryState,
}

impl MemoryTxn {
    /// Get the state seen by this transaction.
    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    /// Returns whether the transaction has written anything.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl TreeStore for MemoryTxn {
    fn child(&self, parent: MemberId, position: Position) -> crate::Result<Option<MemberId>> {
        self.state.child(parent, position)
    }

    fn parent_edge(&self, child: MemberId) -> crate::Result<Option<PlacementEdge>> {
        self.state.parent_edge(child)
    }

    fn insert_edge(&mut self, edge: PlacementEdge) -> crate::Result<()> {
        self.state.insert_edge(edge)?;
        self.dirty = true;
        Ok(())
    }
}

impl LedgerStore for MemoryTxn {
    fn wallet(&self, member: MemberId) -> crate::Result<Option<Wallet>> {
        self.state.wallet(member)
    }

    fn put_wallet(&mut self, wallet: Wallet) -> crate::Result<()> {
        self.state.put_wallet(wallet)?;
        self.dirty = true;
        Ok(())
    }

    fn bucket(&self, member: MemberId, level: u8) -> crate::Result<Option<LevelBucket>> {
        self.state.bucket(member, level)
    }

    fn put_bucket(&mut self, bucket: LevelBucket) -> crate::Result<()> {
        self.state.put_bucket(bucket)?;
        self.dirty = true;
        Ok(())
    }

    fn buckets(&self, member: MemberId) -> crate::Result<Vec<LevelBucket>> {
        self.state.buckets(member)
    }

    fn append_entry(&mut self, entry: LedgerEntry) -> crate::Result<u64> {
        let sequence = self.state.append_entry(entry)?;
        self.dirty = true;
        Ok(sequence)
    }

    fn entries(&self, member: MemberId) -> crate::Result<Vec<LedgerEntry>> {
        self.state.entries(member)
    }
}

impl Transactional for MemoryStore {
    type Txn = MemoryTxn;

    fn begin(&self) -> crate::Result<Self::Txn> {
        let shared = self.lock()?;
        Ok(MemoryTxn {
            base: shared.version,
            dirty: false,
            state: shared.state.clone(),
        })
    }

    fn commit(&self, txn: Self::Txn) -> crate::Result<()> {
        if !txn.dirty {
            return Ok(());
        }
        let mut shared = self.lock()?;
        if shared.version != txn.base {
            return Err(crate::Error::TransactionConflict);
        }
        shared.state = txn.state;
        shared.version = shared
            .version
            .checked_add(1)
            .ok_or(crate::Error::Overflow)?;
        Ok(())
    }
}

use std::{fmt, sync::Arc};

use rust_decimal::Decimal;

use crate::{
    action::{
        DistributionReport, EnrollmentReport, NetworkAction, NetworkStoreExt, ReferralReport,
    },
    event::{EventSink, EventSource, RewardEvent},
    ledger::{LedgerEntry, LedgerStore, LedgerStoreExt, LevelBucket, Reconciliation, Wallet},
    member::MemberId,
    params::Params,
    store::Transactional,
    tree::{PathHop, Placement, RelativePosition, Slot, TreeStatistics, TreeStoreExt},
};

/// Workflow runner.
///
/// Every operation runs inside one transaction of the underlying store and is
/// retried from scratch when the commit conflicts. Events are delivered to the
/// registered sinks only after a successful commit.
pub struct Network<S> {
    store: S,
    params: Arc<Params>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<S: fmt::Debug> fmt::Debug for Network<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("store", &self.store)
            .field("params", &self.params)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl<S: Clone> Clone for Network<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            params: self.params.clone(),
            sinks: self.sinks.clone(),
        }
    }
}

impl<S: Transactional> Network<S> {
    /// Create a new [`Network`] over `store`.
    ///
    /// # Errors
    /// Returns an error if `params` is invalid.
    pub fn try_new(store: S, params: impl Into<Arc<Params>>) -> crate::Result<Self> {
        let params = params.into();
        params.validate()?;
        Ok(Self {
            store,
            params,
            sinks: Vec::new(),
        })
    }

    /// Register an event sink.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Get the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the params.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Run `f` in a transaction, retrying from scratch on conflicts.
    pub fn transact<T>(
        &self,
        operation: &str,
        mut f: impl FnMut(&mut S::Txn, &Params) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let max_attempts = self.params.max_attempts();
        for attempt in 1..=max_attempts {
            let mut txn = self.store.begin()?;
            let result = f(&mut txn, &*self.params).and_then(|output| {
                self.store.commit(txn)?;
                Ok(output)
            });
            match result {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(operation, attempt, max_attempts, %err, "retrying");
                }
                Err(err) => return Err(err),
            }
        }
        Err(crate::Error::ConflictRetriesExhausted(max_attempts))
    }

    /// Run `f` against a fresh read-only view of the store.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&S::Txn) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let txn = self.store.begin()?;
        f(&txn)
    }

    fn emit(&self, events: Vec<RewardEvent>) {
        for event in &events {
            for sink in &self.sinks {
                if let Err(err) = sink.deliver(event) {
                    tracing::warn!(member = %event.member(), %err, "failed to deliver event");
                }
            }
        }
    }

    /// Open the wallet of `member`.
    pub fn open_wallet(&self, member: MemberId) -> crate::Result<Wallet> {
        self.transact("open_wallet", |txn, params| {
            txn.open_wallet(member, params.unlock_steps())
        })
    }

    /// Place `member` in the downline of `sponsor`.
    ///
    /// Only the structural edge is written. Use [`enroll`](Self::enroll) to also
    /// record the referral and pay out a reward.
    pub fn place(&self, sponsor: MemberId, member: MemberId) -> crate::Result<Placement> {
        let placement = self.transact("place", |txn, _| txn.place(sponsor, member)?.execute())?;
        self.emit(placement.events());
        Ok(placement)
    }

    /// Record a direct referral of `member` and release newly unlocked levels.
    pub fn record_referral(
        &self,
        member: MemberId,
        origin: Option<&str>,
    ) -> crate::Result<ReferralReport> {
        let report = self.transact("record_referral", |txn, params| {
            txn.record_referral(params.unlock_steps(), member, origin)
                .execute()
        })?;
        self.emit(report.events());
        Ok(report)
    }

    /// Distribute `pool` across the structural ancestors of `anchor`.
    pub fn distribute(
        &self,
        anchor: MemberId,
        pool: Decimal,
        origin: Option<&str>,
    ) -> crate::Result<DistributionReport> {
        let report = self.transact("distribute", |txn, params| {
            txn.distribute(params.bands(), anchor, pool, origin)?
                .execute()
        })?;
        self.emit(report.events());
        Ok(report)
    }

    /// Enroll `member` under `sponsor` with an enrollment reward of `reward`.
    pub fn enroll(
        &self,
        sponsor: MemberId,
        member: MemberId,
        reward: Decimal,
        origin: Option<&str>,
    ) -> crate::Result<EnrollmentReport> {
        let report = self.transact("enroll", |txn, params| {
            txn.enroll(params, sponsor, member, reward, origin)?
                .execute()
        })?;
        self.emit(report.events());
        Ok(report)
    }

    /// Find the slot the next member sponsored by `sponsor` would take.
    pub fn find_open_slot(&self, sponsor: MemberId) -> crate::Result<Slot> {
        self.read(|txn| txn.find_open_slot(sponsor))
    }

    /// Compute subtree statistics of `root`.
    pub fn statistics(&self, root: MemberId) -> crate::Result<TreeStatistics> {
        self.read(|txn| txn.statistics(root))
    }

    /// Get the structural ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: MemberId) -> crate::Result<Vec<PathHop>> {
        self.read(|txn| txn.ancestors(node))
    }

    /// Resolve the position of `node` relative to `ancestor`.
    pub fn position(
        &self,
        node: MemberId,
        ancestor: MemberId,
    ) -> crate::Result<Option<RelativePosition>> {
        self.read(|txn| txn.position(node, ancestor))
    }

    /// Get the wallet of `member`.
    pub fn wallet(&self, member: MemberId) -> crate::Result<Option<Wallet>> {
        self.read(|txn| txn.wallet(member))
    }

    /// Get the buckets of `member`, ordered by level.
    pub fn buckets(&self, member: MemberId) -> crate::Result<Vec<LevelBucket>> {
        self.read(|txn| txn.buckets(member))
    }

    /// Get the ledger entries of `member`, in append order.
    pub fn entries(&self, member: MemberId) -> crate::Result<Vec<LedgerEntry>> {
        self.read(|txn| txn.entries(member))
    }

    /// Compare the buckets of `member` with their wallet.
    pub fn reconcile(&self, member: MemberId) -> crate::Result<Reconciliation> {
        self.read(|txn| txn.reconcile(member))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use rust_decimal_macros::dec;

    use crate::{
        event::{RecordingSink, SinkError},
        store::{MemoryStore, MemoryTxn},
        Error,
    };

    use super::*;

    fn network() -> crate::Result<(Network<MemoryStore>, RecordingSink)> {
        let sink = RecordingSink::default();
        let network = Network::try_new(MemoryStore::default(), Params::default())?
            .with_sink(sink.clone());
        Ok((network, sink))
    }

    #[test]
    fn enroll_commits_and_emits_after_commit() -> crate::Result<()> {
        let (network, sink) = network()?;
        network.open_wallet(MemberId(1))?;
        assert!(sink.events().is_empty());

        let report = network.enroll(MemberId(1), MemberId(2), dec!(100), Some("signup"))?;
        assert_eq!(sink.take(), report.events());
        assert_eq!(network.wallet(MemberId(1))?.map(|w| w.referral_count()), Some(1));
        assert_eq!(
            network.position(MemberId(2), MemberId(1))?.map(|p| p.level()),
            Some(1)
        );
        assert!(network.reconcile(MemberId(1))?.is_balanced());
        Ok(())
    }

    #[test]
    fn failed_operation_changes_nothing() -> crate::Result<()> {
        let (network, sink) = network()?;
        network.open_wallet(MemberId(1))?;
        let version = network.store().version()?;

        let err = network
            .enroll(MemberId(9), MemberId(2), dec!(10), None)
            .unwrap_err();
        assert!(matches!(err, Error::MissingWallet(MemberId(9))));
        assert_eq!(network.store().version()?, version);
        assert!(network.wallet(MemberId(2))?.is_none());
        assert!(sink.events().is_empty());

        assert!(matches!(
            network.open_wallet(MemberId(1)),
            Err(Error::WalletExists(MemberId(1)))
        ));
        Ok(())
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = Params::builder().max_attempts(0).build();
        assert!(Network::try_new(MemoryStore::default(), params).is_err());
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn deliver(&self, _event: &RewardEvent) -> Result<(), SinkError> {
            Err("notifier unavailable".into())
        }
    }

    #[test]
    fn failing_sink_does_not_affect_the_outcome() -> crate::Result<()> {
        let sink = RecordingSink::default();
        let network = Network::try_new(MemoryStore::default(), Params::default())?
            .with_sink(FailingSink)
            .with_sink(sink.clone());
        network.open_wallet(MemberId(1))?;
        let placement = network.place(MemberId(1), MemberId(2))?;
        assert_eq!(placement.parent(), MemberId(1));
        assert_eq!(sink.events().len(), 1);
        assert_eq!(network.store().read(|state| state.edge_count())?, 1);
        Ok(())
    }

    /// A store whose first commits conflict.
    #[derive(Debug)]
    struct Flaky {
        inner: MemoryStore,
        conflicts: AtomicUsize,
        begins: Mutex<usize>,
    }

    impl Flaky {
        fn new(conflicts: usize) -> Self {
            Self {
                inner: MemoryStore::default(),
                conflicts: AtomicUsize::new(conflicts),
                begins: Mutex::new(0),
            }
        }
    }

    impl Transactional for Flaky {
        type Txn = MemoryTxn;

        fn begin(&self) -> crate::Result<Self::Txn> {
            *self.begins.lock().unwrap() += 1;
            self.inner.begin()
        }

        fn commit(&self, txn: Self::Txn) -> crate::Result<()> {
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::TransactionConflict);
            }
            self.inner.commit(txn)
        }
    }

    #[test]
    fn conflicts_are_retried() -> crate::Result<()> {
        let network = Network::try_new(Flaky::new(2), Params::default())?;
        network.open_wallet(MemberId(1))?;
        assert_eq!(*network.store().begins.lock().unwrap(), 3);
        assert!(network.wallet(MemberId(1))?.is_some());
        Ok(())
    }

    #[test]
    fn conflicts_exhaust_the_retry_budget() -> crate::Result<()> {
        let params = Params::builder().max_attempts(3).build();
        let network = Network::try_new(Flaky::new(10), params)?;
        assert!(matches!(
            network.open_wallet(MemberId(1)),
            Err(Error::ConflictRetriesExhausted(3))
        ));
        assert!(network.wallet(MemberId(1))?.is_none());
        Ok(())
    }

    #[test]
    fn only_storage_races_are_retryable() {
        assert!(Error::TransactionConflict.is_retryable());
        assert!(Error::SlotOccupied {
            parent: MemberId(1),
            position: crate::member::Position::Left,
        }
        .is_retryable());
        assert!(!Error::AlreadyPlaced(MemberId(1)).is_retryable());
        assert!(!Error::MissingWallet(MemberId(1)).is_retryable());
    }
}

/// Wallet.
pub mod wallet;

/// Per-level bucket.
pub mod bucket;

/// Ledger entry.
pub mod entry;

use rust_decimal::Decimal;

pub use self::{
    bucket::LevelBucket,
    entry::{Category, EntryKind, LedgerEntry},
    wallet::{BalanceSnapshot, Wallet},
};

use crate::{member::MemberId, params::UnlockSteps};

/// Persisted wallets, per-level buckets and the append-only ledger.
pub trait LedgerStore {
    /// Get the wallet of `member`.
    fn wallet(&self, member: MemberId) -> crate::Result<Option<Wallet>>;

    /// Insert or replace a wallet row.
    fn put_wallet(&mut self, wallet: Wallet) -> crate::Result<()>;

    /// Get the bucket of `member` at `level`.
    fn bucket(&self, member: MemberId, level: u8) -> crate::Result<Option<LevelBucket>>;

    /// Insert or replace a bucket row.
    fn put_bucket(&mut self, bucket: LevelBucket) -> crate::Result<()>;

    /// Get all buckets of `member`, ordered by level.
    fn buckets(&self, member: MemberId) -> crate::Result<Vec<LevelBucket>>;

    /// Append an entry to the ledger.
    /// Return the assigned sequence number.
    fn append_entry(&mut self, entry: LedgerEntry) -> crate::Result<u64>;

    /// Get all entries of `member` in append order.
    fn entries(&self, member: MemberId) -> crate::Result<Vec<LedgerEntry>>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for &mut T {
    fn wallet(&self, member: MemberId) -> crate::Result<Option<Wallet>> {
        (**self).wallet(member)
    }

    fn put_wallet(&mut self, wallet: Wallet) -> crate::Result<()> {
        (**self).put_wallet(wallet)
    }

    fn bucket(&self, member: MemberId, level: u8) -> crate::Result<Option<LevelBucket>> {
        (**self).bucket(member, level)
    }

    fn put_bucket(&mut self, bucket: LevelBucket) -> crate::Result<()> {
        (**self).put_bucket(bucket)
    }

    fn buckets(&self, member: MemberId) -> crate::Result<Vec<LevelBucket>> {
        (**self).buckets(member)
    }

    fn append_entry(&mut self, entry: LedgerEntry) -> crate::Result<u64> {
        (**self).append_entry(entry)
    }

    fn entries(&self, member: MemberId) -> crate::Result<Vec<LedgerEntry>> {
        (**self).entries(member)
    }
}

/// Result of comparing a member's buckets against their wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reconciliation {
    /// The member.
    pub member: MemberId,
    /// Sum of locked bucket amounts.
    pub bucket_locked: Decimal,
    /// Sum of available bucket amounts.
    pub bucket_available: Decimal,
    /// Locked community subtotal of the wallet.
    pub wallet_locked: Decimal,
    /// Available community subtotal of the wallet.
    pub wallet_available: Decimal,
}

impl Reconciliation {
    /// Returns whether both sides agree.
    pub fn is_balanced(&self) -> bool {
        self.bucket_locked == self.wallet_locked && self.bucket_available == self.wallet_available
    }
}

/// Extension trait for [`LedgerStore`] with posting operations.
///
/// Every posting writes the wallet row back and appends exactly one ledger entry.
pub trait LedgerStoreExt: LedgerStore {
    /// Open a wallet for `member`, unlocked according to zero referrals.
    fn open_wallet(&mut self, member: MemberId, steps: &UnlockSteps) -> crate::Result<Wallet> {
        if self.wallet(member)?.is_some() {
            return Err(crate::Error::WalletExists(member));
        }
        let wallet = Wallet::new(member, steps.max_unlocked_level(0));
        self.put_wallet(wallet.clone())?;
        Ok(wallet)
    }

    /// Get the wallet of `member`, which must exist.
    fn require_wallet(&self, member: MemberId) -> crate::Result<Wallet> {
        self.wallet(member)?
            .ok_or(crate::Error::MissingWallet(member))
    }

    /// Post a non-community credit.
    fn post_credit(
        &mut self,
        wallet: &mut Wallet,
        category: Category,
        amount: &Decimal,
        origin: Option<&str>,
    ) -> crate::Result<LedgerEntry> {
        if category == Category::Community {
            return Err(crate::Error::InvalidArgument(
                "community credits must be posted to a level bucket",
            ));
        }
        wallet.apply_credit(category, amount, false)?;
        let entry = LedgerEntry::credit(
            wallet.member(),
            category,
            *amount,
            false,
            None,
            origin,
            wallet.balance()?,
        );
        self.put_wallet(wallet.clone())?;
        append(self, entry)
    }

    /// Post a community credit at `level`.
    ///
    /// The credit is locked iff `level` is deeper than the wallet's unlocked level.
    fn post_community_credit(
        &mut self,
        wallet: &mut Wallet,
        level: u8,
        amount: &Decimal,
        origin: Option<&str>,
    ) -> crate::Result<LedgerEntry> {
        let member = wallet.member();
        let locked = wallet.is_locked_at(level);
        let mut bucket = self
            .bucket(member, level)?
            .unwrap_or_else(|| LevelBucket::new(member, level));
        bucket.credit(amount, locked)?;
        wallet.apply_credit(Category::Community, amount, locked)?;
        let entry = LedgerEntry::credit(
            member,
            Category::Community,
            *amount,
            locked,
            Some(level),
            origin,
            wallet.balance()?,
        );
        self.put_bucket(bucket)?;
        self.put_wallet(wallet.clone())?;
        append(self, entry)
    }

    /// Release every locked bucket in the level range `(previous, new]`.
    ///
    /// The wallet row is always written back. A ledger entry is appended only
    /// when something was released.
    fn post_release(
        &mut self,
        wallet: &mut Wallet,
        previous: u8,
        new: u8,
        origin: Option<&str>,
    ) -> crate::Result<(Decimal, Option<LedgerEntry>)> {
        let member = wallet.member();
        let mut released = Decimal::ZERO;
        for level in previous.saturating_add(1)..=new {
            let Some(mut bucket) = self.bucket(member, level)? else {
                continue;
            };
            let amount = bucket.release()?;
            if amount.is_zero() {
                continue;
            }
            released = released
                .checked_add(amount)
                .ok_or(crate::Error::Overflow)?;
            self.put_bucket(bucket)?;
        }
        wallet.apply_release(&released)?;
        self.put_wallet(wallet.clone())?;
        if released.is_zero() {
            return Ok((released, None));
        }
        let entry = LedgerEntry::release(member, released, previous, new, origin, wallet.balance()?);
        Ok((released, Some(append(self, entry)?)))
    }

    /// Compare the bucket sums of `member` with their wallet subtotals.
    fn reconcile(&self, member: MemberId) -> crate::Result<Reconciliation> {
        let wallet = self.require_wallet(member)?;
        let (bucket_locked, bucket_available) = self.buckets(member)?.iter().try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(locked, available), bucket| {
                Some((
                    locked.checked_add(*bucket.locked())?,
                    available.checked_add(*bucket.available())?,
                ))
            },
        )
        .ok_or(crate::Error::Overflow)?;
        Ok(Reconciliation {
            member,
            bucket_locked,
            bucket_available,
            wallet_locked: *wallet.community_locked(),
            wallet_available: *wallet.community_available(),
        })
    }
}

impl<S: LedgerStore + ?Sized> LedgerStoreExt for S {}

fn append<S: LedgerStore + ?Sized>(store: &mut S, mut entry: LedgerEntry) -> crate::Result<LedgerEntry> {
    entry.sequence = store.append_entry(entry.clone())?;
    Ok(entry)
}

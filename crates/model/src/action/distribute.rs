use rust_decimal::Decimal;

use crate::{
    action::NetworkAction,
    ledger::{LedgerStore, LedgerStoreExt},
    member::MemberId,
    params::LevelBandTable,
    tree::{TreeStore, TreeStoreExt},
};

/// Distribute a community pool across the structural ancestors of an anchor.
#[must_use]
pub struct Distribute<'a, S> {
    store: S,
    bands: &'a LevelBandTable,
    anchor: MemberId,
    pool: Decimal,
    origin: Option<String>,
}

/// A credit made at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelCredit {
    /// The credited ancestor.
    pub member: MemberId,
    /// Level of the ancestor above the anchor.
    pub level: u8,
    /// Credited amount.
    pub amount: Decimal,
    /// Whether the amount landed in the locked sub-bucket.
    pub locked: bool,
    /// Sequence number of the ledger entry.
    pub sequence: u64,
}

/// A share that could not be credited because the ancestor has no wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionGap {
    /// The ancestor without a wallet.
    pub member: MemberId,
    /// Level of the ancestor above the anchor.
    pub level: u8,
    /// The share that was not credited.
    pub amount: Decimal,
}

/// Distribution Report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionReport {
    anchor: MemberId,
    pool: Decimal,
    credits: Vec<LevelCredit>,
    gaps: Vec<DistributionGap>,
    credited_total: Decimal,
    undistributed: Decimal,
}

impl DistributionReport {
    pub(crate) fn empty(anchor: MemberId) -> Self {
        Self {
            anchor,
            pool: Decimal::ZERO,
            credits: Vec::new(),
            gaps: Vec::new(),
            credited_total: Decimal::ZERO,
            undistributed: Decimal::ZERO,
        }
    }

    /// Get the anchor.
    pub fn anchor(&self) -> MemberId {
        self.anchor
    }

    /// Get the distributed pool.
    pub fn pool(&self) -> &Decimal {
        &self.pool
    }

    /// Get per-level credits, nearest ancestor first.
    pub fn credits(&self) -> &[LevelCredit] {
        &self.credits
    }

    /// Get shares that were not credited for lack of a wallet.
    pub fn gaps(&self) -> &[DistributionGap] {
        &self.gaps
    }

    /// Returns whether some ancestor share was skipped.
    pub fn is_distributed_with_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// Get the total credited amount.
    pub fn credited_total(&self) -> &Decimal {
        &self.credited_total
    }

    /// Get the part of the pool that was not credited to anyone,
    /// because of a short ancestor chain or gaps.
    pub fn undistributed(&self) -> &Decimal {
        &self.undistributed
    }
}

impl<'a, S: TreeStore + LedgerStore> Distribute<'a, S> {
    /// Create a new [`Distribute`] action.
    pub fn try_new(
        store: S,
        bands: &'a LevelBandTable,
        anchor: MemberId,
        pool: Decimal,
        origin: Option<&str>,
    ) -> crate::Result<Self> {
        if pool <= Decimal::ZERO {
            return Err(crate::Error::InvalidArgument("pool amount must be positive"));
        }
        Ok(Self {
            store,
            bands,
            anchor,
            pool,
            origin: origin.map(str::to_owned),
        })
    }
}

impl<S: TreeStore + LedgerStore> NetworkAction for Distribute<'_, S> {
    type Report = DistributionReport;

    /// Levels beyond the end of the ancestor chain are skipped. No unlock check
    /// happens here; a locked credit waits for the owner's next unlock release.
    fn execute(mut self) -> crate::Result<Self::Report> {
        let hops = self.store.ancestors(self.anchor)?;
        let mut credits = Vec::with_capacity(hops.len());
        let mut gaps = Vec::new();
        let mut credited_total = Decimal::ZERO;

        for hop in hops {
            let amount = self.bands.share(&self.pool, hop.level)?;
            if amount <= Decimal::ZERO {
                continue;
            }
            let Some(mut wallet) = self.store.wallet(hop.ancestor)? else {
                tracing::warn!(
                    anchor = %self.anchor,
                    member = %hop.ancestor,
                    level = hop.level,
                    %amount,
                    "ancestor has no wallet, share not credited"
                );
                gaps.push(DistributionGap {
                    member: hop.ancestor,
                    level: hop.level,
                    amount,
                });
                continue;
            };
            let entry = self.store.post_community_credit(
                &mut wallet,
                hop.level,
                &amount,
                self.origin.as_deref(),
            )?;
            credited_total = credited_total
                .checked_add(amount)
                .ok_or(crate::Error::Overflow)?;
            credits.push(LevelCredit {
                member: hop.ancestor,
                level: hop.level,
                amount,
                locked: entry.locked,
                sequence: entry.sequence,
            });
        }

        let undistributed = self
            .pool
            .checked_sub(credited_total)
            .ok_or(crate::Error::Computation("calculating undistributed amount"))?;
        tracing::debug!(
            anchor = %self.anchor,
            pool = %self.pool,
            credited = %credited_total,
            %undistributed,
            levels = credits.len(),
            "distributed community pool"
        );
        Ok(DistributionReport {
            anchor: self.anchor,
            pool: self.pool,
            credits,
            gaps,
            credited_total,
            undistributed,
        })
    }
}

use rust_decimal::Decimal;

use crate::{
    ledger::{Category, LedgerStore, LedgerStoreExt},
    member::MemberId,
    params::{Params, SplitAmounts},
    tree::{PlaceMember, Placement, TreeStore},
};

use super::{
    Distribute, DistributionReport, NetworkAction, RecordReferral, ReferralReport,
};

/// Enroll a new member: place them, record the referral and pay out the reward.
#[must_use]
pub struct Enroll<'a, S> {
    store: S,
    params: &'a Params,
    sponsor: MemberId,
    member: MemberId,
    reward: Decimal,
    origin: Option<String>,
}

/// A non-community credit made during enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectCredit {
    /// The credited member.
    pub member: MemberId,
    /// Category of the credit.
    pub category: Category,
    /// Credited amount.
    pub amount: Decimal,
    /// Sequence number of the ledger entry.
    pub sequence: u64,
}

/// Enrollment Report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnrollmentReport {
    member: MemberId,
    wallet_opened: bool,
    placement: Placement,
    referral: ReferralReport,
    split: SplitAmounts,
    personal: Option<DirectCredit>,
    referral_credit: Option<DirectCredit>,
    distribution: DistributionReport,
    reserve: Option<DirectCredit>,
    unallocated: Decimal,
}

impl EnrollmentReport {
    /// Get the enrolled member.
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Returns whether the wallet of the new member was opened by this enrollment.
    pub fn is_wallet_opened(&self) -> bool {
        self.wallet_opened
    }

    /// Get the placement.
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Get the referral report of the sponsor.
    pub fn referral(&self) -> &ReferralReport {
        &self.referral
    }

    /// Get the reward split.
    pub fn split(&self) -> &SplitAmounts {
        &self.split
    }

    /// Get the personal credit of the new member.
    pub fn personal_credit(&self) -> Option<&DirectCredit> {
        self.personal.as_ref()
    }

    /// Get the referral credit of the sponsor.
    pub fn referral_credit(&self) -> Option<&DirectCredit> {
        self.referral_credit.as_ref()
    }

    /// Get the community distribution report.
    pub fn distribution(&self) -> &DistributionReport {
        &self.distribution
    }

    /// Get the reserve credit, if a reserve account is configured.
    pub fn reserve_credit(&self) -> Option<&DirectCredit> {
        self.reserve.as_ref()
    }

    /// Get the amount credited to nobody.
    ///
    /// Non-zero only when no reserve account is configured.
    pub fn unallocated(&self) -> &Decimal {
        &self.unallocated
    }

    /// Get all direct credits, in posting order.
    pub fn direct_credits(&self) -> impl Iterator<Item = &DirectCredit> {
        self.personal
            .iter()
            .chain(self.referral_credit.iter())
            .chain(self.reserve.iter())
    }
}

impl<'a, S: TreeStore + LedgerStore> Enroll<'a, S> {
    /// Create a new [`Enroll`] action.
    pub fn try_new(
        store: S,
        params: &'a Params,
        sponsor: MemberId,
        member: MemberId,
        reward: Decimal,
        origin: Option<&str>,
    ) -> crate::Result<Self> {
        if sponsor == member {
            return Err(crate::Error::InvalidArgument(
                "a member cannot sponsor itself",
            ));
        }
        if reward < Decimal::ZERO {
            return Err(crate::Error::InvalidArgument(
                "reward amount must not be negative",
            ));
        }
        Ok(Self {
            store,
            params,
            sponsor,
            member,
            reward,
            origin: origin.map(str::to_owned),
        })
    }

    fn credit(
        &mut self,
        member: MemberId,
        category: Category,
        amount: &Decimal,
    ) -> crate::Result<Option<DirectCredit>> {
        if amount.is_zero() {
            return Ok(None);
        }
        let mut wallet = self.store.require_wallet(member)?;
        let entry =
            self.store
                .post_credit(&mut wallet, category, amount, self.origin.as_deref())?;
        Ok(Some(DirectCredit {
            member,
            category,
            amount: *amount,
            sequence: entry.sequence,
        }))
    }
}

impl<S: TreeStore + LedgerStore> NetworkAction for Enroll<'_, S> {
    type Report = EnrollmentReport;

    /// Partial writes are left in the store on failure; run inside a transaction.
    fn execute(mut self) -> crate::Result<Self::Report> {
        if self.store.parent_edge(self.member)?.is_some() {
            return Err(crate::Error::AlreadyPlaced(self.member));
        }
        // Checked before anything is written.
        self.store.require_wallet(self.sponsor)?;
        let wallet_opened = match self.store.wallet(self.member)? {
            Some(_) => false,
            None => {
                self.store
                    .open_wallet(self.member, self.params.unlock_steps())?;
                true
            }
        };

        let placement =
            PlaceMember::try_new(&mut self.store, self.sponsor, self.member)?.execute()?;
        let referral = RecordReferral::new(
            &mut self.store,
            self.params.unlock_steps(),
            self.sponsor,
            self.origin.as_deref(),
        )
        .execute()?;

        let split = self.params.reward_split().split(&self.reward)?;
        let personal = self.credit(self.member, Category::Personal, &split.personal)?;
        let referral_credit = self.credit(self.sponsor, Category::Referral, &split.referral)?;
        let distribution = if split.community.is_zero() {
            DistributionReport::empty(self.member)
        } else {
            Distribute::try_new(
                &mut self.store,
                self.params.bands(),
                self.member,
                split.community,
                self.origin.as_deref(),
            )?
            .execute()?
        };

        let leftover = split
            .reserve
            .checked_add(*distribution.undistributed())
            .ok_or(crate::Error::Overflow)?;
        let (reserve, unallocated) = match self.params.reserve_account() {
            Some(account) => {
                if !leftover.is_zero() && self.store.wallet(account)?.is_none() {
                    self.store
                        .open_wallet(account, self.params.unlock_steps())?;
                }
                (
                    self.credit(account, Category::Reserve, &leftover)?,
                    Decimal::ZERO,
                )
            }
            None => (None, leftover),
        };

        tracing::debug!(
            sponsor = %self.sponsor,
            member = %self.member,
            reward = %self.reward,
            %unallocated,
            "enrolled member"
        );
        Ok(EnrollmentReport {
            member: self.member,
            wallet_opened,
            placement,
            referral,
            split,
            personal,
            referral_credit,
            distribution,
            reserve,
            unallocated,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        ledger::EntryKind,
        member::Position,
        test::{chain, TestStore},
        tree::TreeStoreExt,
    };

    use super::*;

    #[test]
    fn enroll_under_a_short_chain() -> crate::Result<()> {
        let mut store = TestStore::default();
        // 1 <- 2, sponsor is 2.
        let members = chain(&mut store, 2)?;
        let params = Params::default();
        let sponsor = members[1];
        let member = MemberId(10);

        let report =
            Enroll::try_new(&mut store, &params, sponsor, member, dec!(100), Some("signup-10"))?
                .execute()?;
        assert!(report.is_wallet_opened());
        assert_eq!(report.placement().parent(), sponsor);
        assert_eq!(report.placement().position(), Position::Left);
        assert_eq!(report.referral().referral_count(), 1);

        assert_eq!(report.personal_credit().map(|c| c.amount), Some(dec!(10)));
        assert_eq!(report.referral_credit().map(|c| c.amount), Some(dec!(20)));
        // Two ancestors: levels 1 and 2 at 5% each of a pool of 60.
        assert_eq!(report.distribution().credits().len(), 2);
        assert_eq!(report.distribution().credited_total(), &dec!(6));
        assert_eq!(report.distribution().undistributed(), &dec!(54));
        // No reserve account: reserve share plus the remainder stays unallocated.
        assert!(report.reserve_credit().is_none());
        assert_eq!(report.unallocated(), &dec!(64));

        let wallet = store.require_wallet(member)?;
        assert_eq!(wallet.personal_total(), &dec!(10));
        let wallet = store.require_wallet(sponsor)?;
        assert_eq!(wallet.referral_total(), &dec!(20));
        assert_eq!(wallet.community_available(), &dec!(3));
        assert_eq!(wallet.referral_count(), 1);
        Ok(())
    }

    #[test]
    fn leftover_goes_to_the_reserve_account() -> crate::Result<()> {
        let mut store = TestStore::default();
        let members = chain(&mut store, 1)?;
        let reserve = MemberId(999);
        let params = Params::builder().reserve_account(reserve).build();

        let report = Enroll::try_new(&mut store, &params, members[0], MemberId(2), dec!(50), None)?
            .execute()?;
        // Reserve 5 plus 30 of community minus 1.5 credited to the sponsor.
        let credit = report.reserve_credit().expect("reserve is configured");
        assert_eq!(credit.member, reserve);
        assert_eq!(credit.amount, dec!(33.5));
        assert!(report.unallocated().is_zero());

        let total = report
            .direct_credits()
            .map(|c| c.amount)
            .sum::<Decimal>()
            + report.distribution().credited_total();
        assert_eq!(total, dec!(50));
        assert_eq!(store.require_wallet(reserve)?.reserve_total(), &dec!(33.5));
        Ok(())
    }

    #[test]
    fn enrollment_unlocks_the_sponsor() -> crate::Result<()> {
        let mut store = TestStore::default();
        let members = chain(&mut store, 1)?;
        let sponsor = members[0];
        let params = Params::default();

        let report =
            Enroll::try_new(&mut store, &params, sponsor, MemberId(2), dec!(0), None)?.execute()?;
        let unlock = report.referral().unlock().expect("first referral unlocks");
        assert_eq!((unlock.previous_level, unlock.unlocked_level), (5, 10));
        // Zero reward posts nothing.
        assert!(report.direct_credits().next().is_none());
        assert!(report.distribution().credits().is_empty());
        assert!(store
            .entries(sponsor)?
            .iter()
            .all(|e| e.kind != EntryKind::Credit));
        Ok(())
    }

    #[test]
    fn refuses_placed_members_and_missing_sponsors() -> crate::Result<()> {
        let mut store = TestStore::default();
        let members = chain(&mut store, 2)?;
        let params = Params::default();

        let err = Enroll::try_new(&mut store, &params, members[0], members[1], dec!(1), None)?
            .execute()
            .unwrap_err();
        assert!(matches!(err, crate::Error::AlreadyPlaced(m) if m == members[1]));

        let err = Enroll::try_new(&mut store, &params, MemberId(77), MemberId(78), dec!(1), None)?
            .execute()
            .unwrap_err();
        assert!(matches!(err, crate::Error::MissingWallet(MemberId(77))));
        assert!(store.wallet(MemberId(78))?.is_none());
        assert!(store.parent_edge(MemberId(78))?.is_none());

        assert!(Enroll::try_new(&mut store, &params, members[0], members[0], dec!(1), None).is_err());
        assert!(Enroll::try_new(&mut store, &params, members[0], MemberId(5), dec!(-1), None).is_err());
        assert_eq!(store.statistics(members[0])?.total, 1);
        Ok(())
    }
}

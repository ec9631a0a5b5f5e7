use rust_decimal::Decimal;

use crate::{
    action::NetworkAction,
    ledger::{LedgerStore, LedgerStoreExt},
    member::MemberId,
    params::UnlockSteps,
};

/// Record a direct referral and release newly unlocked levels.
#[must_use]
pub struct RecordReferral<'a, S> {
    store: S,
    steps: &'a UnlockSteps,
    member: MemberId,
    origin: Option<String>,
}

/// An unlock release.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unlock {
    /// Unlocked level before the release.
    pub previous_level: u8,
    /// Unlocked level after the release.
    pub unlocked_level: u8,
    /// Amount moved from locked to available.
    pub released: Decimal,
    /// Sequence number of the consolidated ledger entry, if anything was released.
    pub sequence: Option<u64>,
}

/// Record Referral Report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferralReport {
    member: MemberId,
    referral_count: u64,
    unlock: Option<Unlock>,
}

impl ReferralReport {
    /// Get the referring member.
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Get the lifetime direct-referral count after recording.
    pub fn referral_count(&self) -> u64 {
        self.referral_count
    }

    /// Get the unlock release, if the threshold rose.
    pub fn unlock(&self) -> Option<&Unlock> {
        self.unlock.as_ref()
    }
}

impl<'a, S: LedgerStore> RecordReferral<'a, S> {
    /// Create a new [`RecordReferral`] action.
    pub fn new(store: S, steps: &'a UnlockSteps, member: MemberId, origin: Option<&str>) -> Self {
        Self {
            store,
            steps,
            member,
            origin: origin.map(str::to_owned),
        }
    }
}

impl<S: LedgerStore> NetworkAction for RecordReferral<'_, S> {
    type Report = ReferralReport;

    /// Must run in the same transaction that recorded the referral, so the
    /// threshold is never evaluated against a stale count.
    fn execute(mut self) -> crate::Result<Self::Report> {
        let mut wallet = self.store.require_wallet(self.member)?;
        wallet.record_referral();
        let referral_count = wallet.referral_count();
        let target = self.steps.max_unlocked_level(referral_count);

        let Some(previous_level) = wallet.raise_unlocked_level(target) else {
            self.store.put_wallet(wallet)?;
            return Ok(ReferralReport {
                member: self.member,
                referral_count,
                unlock: None,
            });
        };

        let (released, entry) = self.store.post_release(
            &mut wallet,
            previous_level,
            target,
            self.origin.as_deref(),
        )?;
        tracing::info!(
            member = %self.member,
            referral_count,
            previous_level,
            unlocked_level = target,
            %released,
            "unlocked levels"
        );
        Ok(ReferralReport {
            member: self.member,
            referral_count,
            unlock: Some(Unlock {
                previous_level,
                unlocked_level: target,
                released,
                sequence: entry.map(|entry| entry.sequence),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        action::Distribute,
        ledger::EntryKind,
        params::LevelBandTable,
        test::{chain, TestStore},
    };

    use super::*;

    #[test]
    fn referral_below_threshold_changes_nothing_else() -> crate::Result<()> {
        let mut store = TestStore::default();
        let members = chain(&mut store, 1)?;
        let steps = UnlockSteps::new(vec![5, 5, 10])?;

        let report = RecordReferral::new(&mut store, &steps, members[0], None).execute()?;
        assert_eq!(report.referral_count(), 1);
        assert!(report.unlock().is_none());
        assert!(store.entries(members[0])?.is_empty());
        Ok(())
    }

    #[test]
    fn unlock_releases_exactly_the_opened_range() -> crate::Result<()> {
        let mut store = TestStore::default();
        let members = chain(&mut store, 31)?;
        let bands = LevelBandTable::default();
        let steps = UnlockSteps::default();
        let top = members[0];

        // Top is 30 levels above the anchor, so it gets a level-30 credit. Lower
        // members get credits at other levels.
        _ = Distribute::try_new(&mut store, &bands, members[30], dec!(1000), None)?.execute()?;
        _ = Distribute::try_new(&mut store, &bands, members[22], dec!(1000), None)?.execute()?;
        // Top: level 30 (5) and level 22 (5), both locked.
        assert_eq!(store.require_wallet(top)?.community_locked(), &dec!(10));

        // 1..=4 referrals open up to level 25: releases nothing for top.
        for count in 1..=4 {
            let report = RecordReferral::new(&mut store, &steps, top, None).execute()?;
            let unlock = report.unlock().expect("threshold rises");
            assert_eq!(unlock.unlocked_level, 5 + 5 * count);
            if unlock.unlocked_level < 22 {
                assert_eq!(unlock.released, dec!(0));
                assert_eq!(unlock.sequence, None);
            } else {
                assert_eq!(unlock.released, dec!(5));
                assert!(unlock.sequence.is_some());
            }
        }
        let wallet = store.require_wallet(top)?;
        assert_eq!(wallet.community_locked(), &dec!(5));
        assert_eq!(wallet.community_available(), &dec!(5));

        // Fifth referral opens (25, 30].
        let report = RecordReferral::new(&mut store, &steps, top, Some("ref-5")).execute()?;
        let unlock = report.unlock().expect("threshold rises");
        assert_eq!((unlock.previous_level, unlock.unlocked_level), (25, 30));
        assert_eq!(unlock.released, dec!(5));

        // Saturated: nothing further.
        let report = RecordReferral::new(&mut store, &steps, top, None).execute()?;
        assert!(report.unlock().is_none());
        assert_eq!(report.referral_count(), 6);

        let wallet = store.require_wallet(top)?;
        assert_eq!(wallet.community_locked(), &dec!(0));
        assert_eq!(wallet.community_available(), &dec!(10));
        assert!(store.reconcile(top)?.is_balanced());

        let releases = store
            .entries(top)?
            .into_iter()
            .filter(|e| e.kind == EntryKind::Release)
            .collect::<Vec<_>>();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[1].released_levels(), Some(26..=30));
        assert_eq!(releases[1].origin.as_deref(), Some("ref-5"));
        Ok(())
    }

    #[test]
    fn missing_wallet_is_an_error() {
        let mut store = TestStore::default();
        let steps = UnlockSteps::default();
        let err = RecordReferral::new(&mut store, &steps, MemberId(9), None)
            .execute()
            .unwrap_err();
        assert!(matches!(err, crate::Error::MissingWallet(MemberId(9))));
    }
}

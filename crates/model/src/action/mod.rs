/// Distribute a community pool.
pub mod distribute;

/// Record a direct referral.
pub mod record_referral;

/// Enroll a new member.
pub mod enroll;

pub use self::{
    distribute::{Distribute, DistributionGap, DistributionReport, LevelCredit},
    enroll::{DirectCredit, Enroll, EnrollmentReport},
    record_referral::{RecordReferral, ReferralReport, Unlock},
};

use rust_decimal::Decimal;

use crate::{
    ledger::LedgerStore,
    member::MemberId,
    params::{LevelBandTable, Params, UnlockSteps},
    tree::TreeStore,
};

/// Network Action.
#[must_use = "actions do nothing unless you `execute` them"]
pub trait NetworkAction {
    /// The type of the execution report of the action.
    type Report;

    /// Execute.
    fn execute(self) -> crate::Result<Self::Report>;
}

/// Extension trait creating reward actions on a store.
pub trait NetworkStoreExt: TreeStore + LedgerStore {
    /// Create a [`Distribute`] action anchored at `anchor`.
    fn distribute<'a>(
        &mut self,
        bands: &'a LevelBandTable,
        anchor: MemberId,
        pool: Decimal,
        origin: Option<&str>,
    ) -> crate::Result<Distribute<'a, &mut Self>>
    where
        Self: Sized,
    {
        Distribute::try_new(self, bands, anchor, pool, origin)
    }

    /// Create a [`RecordReferral`] action for `member`.
    fn record_referral<'a>(
        &mut self,
        steps: &'a UnlockSteps,
        member: MemberId,
        origin: Option<&str>,
    ) -> RecordReferral<'a, &mut Self>
    where
        Self: Sized,
    {
        RecordReferral::new(self, steps, member, origin)
    }

    /// Create an [`Enroll`] action placing `member` under `sponsor`.
    fn enroll<'a>(
        &mut self,
        params: &'a Params,
        sponsor: MemberId,
        member: MemberId,
        reward: Decimal,
        origin: Option<&str>,
    ) -> crate::Result<Enroll<'a, &mut Self>>
    where
        Self: Sized,
    {
        Enroll::try_new(self, params, sponsor, member, reward, origin)
    }
}

impl<S: TreeStore + LedgerStore + ?Sized> NetworkStoreExt for S {}

use rust_decimal::Decimal;
use typed_builder::TypedBuilder;

/// How an enrollment reward is split across point categories, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardSplit {
    /// Credited to the new member.
    personal: Decimal,
    /// Credited to the sponsor.
    referral: Decimal,
    /// Distributed across structural ancestors.
    community: Decimal,
    /// Kept by the reserve account.
    reserve: Decimal,
}

/// Amounts produced by [`RewardSplit::split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitAmounts {
    /// Personal share.
    pub personal: Decimal,
    /// Referral share.
    pub referral: Decimal,
    /// Community pool.
    pub community: Decimal,
    /// Reserve share.
    pub reserve: Decimal,
}

impl RewardSplit {
    /// Validate the split.
    /// # Errors
    /// - Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if any part is negative
    ///   or the parts do not sum to exactly `100`.
    pub fn validate(&self) -> crate::Result<()> {
        let parts = [self.personal, self.referral, self.community, self.reserve];
        if parts.iter().any(|p| *p < Decimal::ZERO) {
            return Err(crate::Error::InvalidConfig("negative reward split"));
        }
        let sum = parts
            .iter()
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p))
            .ok_or(crate::Error::Overflow)?;
        if sum != Decimal::ONE_HUNDRED {
            return Err(crate::Error::InvalidConfig("reward split must sum to 100"));
        }
        Ok(())
    }

    /// Get personal percent.
    pub fn personal(&self) -> &Decimal {
        &self.personal
    }

    /// Get referral percent.
    pub fn referral(&self) -> &Decimal {
        &self.referral
    }

    /// Get community percent.
    pub fn community(&self) -> &Decimal {
        &self.community
    }

    /// Get reserve percent.
    pub fn reserve(&self) -> &Decimal {
        &self.reserve
    }

    /// Split `amount`.
    ///
    /// The reserve part absorbs any rounding so that the parts always add up to `amount`.
    pub fn split(&self, amount: &Decimal) -> crate::Result<SplitAmounts> {
        let part = |percent: &Decimal| {
            amount
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or(crate::Error::Overflow)
        };
        let personal = part(&self.personal)?;
        let referral = part(&self.referral)?;
        let community = part(&self.community)?;
        let reserve = personal
            .checked_add(referral)
            .and_then(|v| v.checked_add(community))
            .and_then(|v| amount.checked_sub(v))
            .ok_or(crate::Error::Computation("calculating reserve share"))?;
        Ok(SplitAmounts {
            personal,
            referral,
            community,
            reserve,
        })
    }
}

impl Default for RewardSplit {
    fn default() -> Self {
        Self {
            personal: Decimal::TEN,
            referral: Decimal::new(20, 0),
            community: Decimal::new(60, 0),
            reserve: Decimal::TEN,
        }
    }
}

use rust_decimal::Decimal;

use crate::member::MemberId;

use super::entry::Category;

/// Balance snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceSnapshot {
    /// Available balance.
    pub available: Decimal,
    /// Locked balance.
    pub locked: Decimal,
}

/// Per-member wallet aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wallet {
    member: MemberId,
    referral_count: u64,
    /// Highest level ever unlocked. It never decreases.
    unlocked_level: u8,
    community_locked: Decimal,
    community_available: Decimal,
    referral_total: Decimal,
    personal_total: Decimal,
    reserve_total: Decimal,
}

impl Wallet {
    /// Create an empty wallet.
    pub fn new(member: MemberId, unlocked_level: u8) -> Self {
        Self {
            member,
            referral_count: 0,
            unlocked_level,
            community_locked: Decimal::ZERO,
            community_available: Decimal::ZERO,
            referral_total: Decimal::ZERO,
            personal_total: Decimal::ZERO,
            reserve_total: Decimal::ZERO,
        }
    }

    /// Get the owner.
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Get lifetime direct-referral count.
    pub fn referral_count(&self) -> u64 {
        self.referral_count
    }

    /// Get the deepest unlocked level.
    pub fn unlocked_level(&self) -> u8 {
        self.unlocked_level
    }

    /// Returns whether a community credit at `level` would be locked.
    pub fn is_locked_at(&self, level: u8) -> bool {
        level > self.unlocked_level
    }

    /// Get locked community subtotal.
    pub fn community_locked(&self) -> &Decimal {
        &self.community_locked
    }

    /// Get available community subtotal.
    pub fn community_available(&self) -> &Decimal {
        &self.community_available
    }

    /// Get referral total.
    pub fn referral_total(&self) -> &Decimal {
        &self.referral_total
    }

    /// Get personal total.
    pub fn personal_total(&self) -> &Decimal {
        &self.personal_total
    }

    /// Get reserve total.
    pub fn reserve_total(&self) -> &Decimal {
        &self.reserve_total
    }

    /// Get community total, locked or not.
    pub fn community_total(&self) -> crate::Result<Decimal> {
        self.community_locked
            .checked_add(self.community_available)
            .ok_or(crate::Error::Overflow)
    }

    /// Get available balance across all categories.
    pub fn available_balance(&self) -> crate::Result<Decimal> {
        [
            self.referral_total,
            self.personal_total,
            self.reserve_total,
        ]
        .into_iter()
        .try_fold(self.community_available, |acc, v| acc.checked_add(v))
        .ok_or(crate::Error::Overflow)
    }

    /// Get locked balance.
    pub fn locked_balance(&self) -> &Decimal {
        &self.community_locked
    }

    /// Get balance snapshot.
    pub fn balance(&self) -> crate::Result<BalanceSnapshot> {
        Ok(BalanceSnapshot {
            available: self.available_balance()?,
            locked: self.community_locked,
        })
    }

    pub(crate) fn record_referral(&mut self) {
        self.referral_count = self.referral_count.saturating_add(1);
    }

    /// Raise the unlocked level watermark.
    /// Return the previous level if it was raised.
    pub(crate) fn raise_unlocked_level(&mut self, level: u8) -> Option<u8> {
        if level > self.unlocked_level {
            let previous = self.unlocked_level;
            self.unlocked_level = level;
            Some(previous)
        } else {
            None
        }
    }

    pub(crate) fn apply_credit(
        &mut self,
        category: Category,
        amount: &Decimal,
        locked: bool,
    ) -> crate::Result<()> {
        let target = match category {
            Category::Community if locked => &mut self.community_locked,
            Category::Community => &mut self.community_available,
            Category::Referral => &mut self.referral_total,
            Category::Personal => &mut self.personal_total,
            Category::Reserve => &mut self.reserve_total,
        };
        *target = target.checked_add(*amount).ok_or(crate::Error::Overflow)?;
        Ok(())
    }

    pub(crate) fn apply_release(&mut self, amount: &Decimal) -> crate::Result<()> {
        let locked = self
            .community_locked
            .checked_sub(*amount)
            .filter(|v| *v >= Decimal::ZERO)
            .ok_or(crate::Error::Computation("releasing more than the locked balance"))?;
        let available = self
            .community_available
            .checked_add(*amount)
            .ok_or(crate::Error::Overflow)?;
        self.community_locked = locked;
        self.community_available = available;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn credits_and_release() -> crate::Result<()> {
        let mut wallet = Wallet::new(MemberId(1), 5);
        wallet.apply_credit(Category::Community, &dec!(8), true)?;
        wallet.apply_credit(Category::Community, &dec!(5), false)?;
        wallet.apply_credit(Category::Referral, &dec!(20), false)?;
        wallet.apply_credit(Category::Personal, &dec!(1), false)?;
        assert_eq!(wallet.community_total()?, dec!(13));
        assert_eq!(
            wallet.balance()?,
            BalanceSnapshot {
                available: dec!(26),
                locked: dec!(8),
            }
        );

        wallet.apply_release(&dec!(8))?;
        assert_eq!(wallet.community_locked(), &dec!(0));
        assert_eq!(wallet.community_available(), &dec!(13));
        assert_eq!(wallet.available_balance()?, dec!(34));

        assert!(wallet.apply_release(&dec!(0.1)).is_err());
        Ok(())
    }

    #[test]
    fn watermark_never_decreases() {
        let mut wallet = Wallet::new(MemberId(1), 5);
        assert!(wallet.is_locked_at(6));
        assert_eq!(wallet.raise_unlocked_level(10), Some(5));
        assert_eq!(wallet.raise_unlocked_level(10), None);
        assert_eq!(wallet.raise_unlocked_level(7), None);
        assert_eq!(wallet.unlocked_level(), 10);
        assert!(!wallet.is_locked_at(6));
    }
}

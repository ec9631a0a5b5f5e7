use rust_decimal::Decimal;

use crate::member::MemberId;

/// Per-level community point bucket, keyed by `(member, level)`.
///
/// Unlocked credits land in `available` and never move again. Locked credits
/// wait in `locked` until the one release covering this level moves the whole
/// locked balance to `available`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelBucket {
    member: MemberId,
    level: u8,
    locked: Decimal,
    available: Decimal,
}

impl LevelBucket {
    /// Create an empty bucket.
    pub fn new(member: MemberId, level: u8) -> Self {
        Self {
            member,
            level,
            locked: Decimal::ZERO,
            available: Decimal::ZERO,
        }
    }

    /// Get the owner.
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Get the level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Get locked amount.
    pub fn locked(&self) -> &Decimal {
        &self.locked
    }

    /// Get available amount.
    pub fn available(&self) -> &Decimal {
        &self.available
    }

    /// Get total amount.
    pub fn total(&self) -> crate::Result<Decimal> {
        self.locked
            .checked_add(self.available)
            .ok_or(crate::Error::Overflow)
    }

    pub(crate) fn credit(&mut self, amount: &Decimal, locked: bool) -> crate::Result<()> {
        let target = if locked {
            &mut self.locked
        } else {
            &mut self.available
        };
        *target = target.checked_add(*amount).ok_or(crate::Error::Overflow)?;
        Ok(())
    }

    /// Move the whole locked amount to available.
    /// Return the moved amount.
    pub(crate) fn release(&mut self) -> crate::Result<Decimal> {
        let released = self.locked;
        self.available = self
            .available
            .checked_add(released)
            .ok_or(crate::Error::Overflow)?;
        self.locked = Decimal::ZERO;
        Ok(released)
    }
}

use std::{fmt, ops::RangeInclusive};

use rust_decimal::Decimal;

use crate::member::MemberId;

use super::wallet::BalanceSnapshot;

/// Point category.
#[derive(
    Debug,
    Clone,
    Copy,
    num_enum::TryFromPrimitive,
    num_enum::IntoPrimitive,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[cfg_attr(feature = "strum", derive(strum::EnumIter, strum::EnumString))]
#[cfg_attr(feature = "strum", strum(serialize_all = "snake_case"))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Category {
    /// Points earned by the member's own activity.
    Personal,
    /// Direct-referral points paid to the sponsor.
    Referral,
    /// Points distributed across structural ancestors.
    Community,
    /// Points kept by the reserve account.
    Reserve,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Personal => "personal",
            Self::Referral => "referral",
            Self::Community => "community",
            Self::Reserve => "reserve",
        };
        f.write_str(name)
    }
}

/// Entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntryKind {
    /// New points credited.
    Credit,
    /// Locked points moved to available.
    Release,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerEntry {
    /// Sequence number, assigned by the store on append.
    pub sequence: u64,
    /// Owner of the entry.
    pub member: MemberId,
    /// Category.
    pub category: Category,
    /// Kind.
    pub kind: EntryKind,
    /// Amount.
    pub amount: Decimal,
    /// Whether the amount was credited as locked.
    pub locked: bool,
    /// Level of a community credit.
    pub level: Option<u8>,
    /// Released level range, `(previous, new]`.
    pub released: Option<(u8, u8)>,
    /// Reference to the event that caused this entry.
    pub origin: Option<String>,
    /// Balance right after this entry.
    pub balance: BalanceSnapshot,
}

impl LedgerEntry {
    /// Create a credit entry.
    pub fn credit(
        member: MemberId,
        category: Category,
        amount: Decimal,
        locked: bool,
        level: Option<u8>,
        origin: Option<&str>,
        balance: BalanceSnapshot,
    ) -> Self {
        Self {
            sequence: 0,
            member,
            category,
            kind: EntryKind::Credit,
            amount,
            locked,
            level,
            released: None,
            origin: origin.map(str::to_owned),
            balance,
        }
    }

    /// Create a release entry for the level range `(previous, new]`.
    pub fn release(
        member: MemberId,
        amount: Decimal,
        previous: u8,
        new: u8,
        origin: Option<&str>,
        balance: BalanceSnapshot,
    ) -> Self {
        Self {
            sequence: 0,
            member,
            category: Category::Community,
            kind: EntryKind::Release,
            amount,
            locked: false,
            level: None,
            released: Some((previous, new)),
            origin: origin.map(str::to_owned),
            balance,
        }
    }

    /// Get the released levels, if this is a release entry.
    pub fn released_levels(&self) -> Option<RangeInclusive<u8>> {
        self.released
            .map(|(previous, new)| previous.saturating_add(1)..=new)
    }
}

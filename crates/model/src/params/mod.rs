/// Level band table.
pub mod band;

/// Unlock step table.
pub mod unlock;

/// Reward split.
pub mod split;

use typed_builder::TypedBuilder;

pub use band::{LevelBand, LevelBandTable};
pub use split::{RewardSplit, SplitAmounts};
pub use unlock::UnlockSteps;

use crate::member::MemberId;

/// Default number of attempts for a conflicting transaction.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Network Parameters.
///
/// Loaded once at start-up and shared immutably by every operation.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Params {
    #[builder(default)]
    bands: LevelBandTable,
    #[builder(default)]
    unlock_steps: UnlockSteps,
    #[builder(default)]
    reward_split: RewardSplit,
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,
    #[builder(default, setter(strip_option))]
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    reserve_account: Option<MemberId>,
}

impl Params {
    /// Validate the parts that are not checked on construction.
    pub fn validate(&self) -> crate::Result<()> {
        self.reward_split.validate()?;
        if self.max_attempts == 0 {
            return Err(crate::Error::InvalidConfig("`max_attempts` must be positive"));
        }
        Ok(())
    }

    /// Get level band table.
    pub fn bands(&self) -> &LevelBandTable {
        &self.bands
    }

    /// Get unlock steps.
    pub fn unlock_steps(&self) -> &UnlockSteps {
        &self.unlock_steps
    }

    /// Get reward split.
    pub fn reward_split(&self) -> &RewardSplit {
        &self.reward_split
    }

    /// Get max attempts of a conflicting transaction.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Get the reserve account.
    pub fn reserve_account(&self) -> Option<MemberId> {
        self.reserve_account
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::builder().build()
    }
}

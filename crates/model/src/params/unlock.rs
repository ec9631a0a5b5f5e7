use crate::member::{is_valid_level, MAX_LEVEL};

/// Step table mapping a lifetime direct-referral count to the deepest unlocked level.
///
/// `levels[n]` is the unlocked level of a member with `n` direct referrals;
/// counts past the end of the table saturate at the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<u8>", into = "Vec<u8>"))]
pub struct UnlockSteps {
    levels: Vec<u8>,
}

impl UnlockSteps {
    /// Create a new [`UnlockSteps`].
    /// # Errors
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if:
    /// - `levels` is empty.
    /// - any level is outside `1..=30`.
    /// - `levels` is decreasing somewhere.
    pub fn new(levels: Vec<u8>) -> crate::Result<Self> {
        if levels.is_empty() {
            return Err(crate::Error::InvalidConfig("empty unlock step table"));
        }
        if !levels.iter().copied().all(is_valid_level) {
            return Err(crate::Error::InvalidConfig("unlock level out of range"));
        }
        // Steps must be sorted.
        if !levels.windows(2).all(|ab| {
            if let [a, b] = &ab {
                a <= b
            } else {
                false
            }
        }) {
            return Err(crate::Error::InvalidConfig("unlock steps must not decrease"));
        }
        Ok(Self { levels })
    }

    /// Get the deepest unlocked level for the given direct-referral count.
    pub fn max_unlocked_level(&self, direct_referrals: u64) -> u8 {
        let idx = usize::try_from(direct_referrals)
            .unwrap_or(usize::MAX)
            .min(self.levels.len() - 1);
        self.levels[idx]
    }

    /// The referral count from which the table saturates.
    pub fn saturated_at(&self) -> u64 {
        (self.levels.len() - 1) as u64
    }

    /// Get the raw step levels.
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }
}

impl Default for UnlockSteps {
    fn default() -> Self {
        Self {
            levels: vec![5, 10, 15, 20, 25, MAX_LEVEL],
        }
    }
}

impl TryFrom<Vec<u8>> for UnlockSteps {
    type Error = crate::Error;

    fn try_from(levels: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<UnlockSteps> for Vec<u8> {
    fn from(steps: UnlockSteps) -> Self {
        steps.levels
    }
}

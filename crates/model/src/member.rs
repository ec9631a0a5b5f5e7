use std::{fmt, num::ParseIntError, str::FromStr};

/// Maximum depth of the placement tree, and the number of distribution levels.
pub const MAX_LEVEL: u8 = 30;

/// Member identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = ParseIntError;

    /// Accepts both `7` and `#7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('#').unwrap_or(s).parse().map(Self)
    }
}

impl From<u64> for MemberId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Slot of a child under its structural parent.
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
pub enum Position {
    /// Left.
    Left,
    /// Right.
    Right,
}

impl Position {
    /// Both positions, left first.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Placement edge.
///
/// `parent` is the structural parent chosen by placement while `sponsor` is the
/// member who introduced the child. They differ whenever the child spilled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementEdge {
    /// Structural parent.
    pub parent: MemberId,
    /// The child.
    pub child: MemberId,
    /// Slot under the parent.
    pub position: Position,
    /// Who introduced the child.
    pub sponsor: MemberId,
}

impl PlacementEdge {
    /// Returns whether the child was placed away from its sponsor.
    pub fn is_spillover(&self) -> bool {
        self.parent != self.sponsor
    }
}

/// Returns whether `level` is a valid distribution level.
#[inline]
pub fn is_valid_level(level: u8) -> bool {
    (1..=MAX_LEVEL).contains(&level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_member_id() {
        assert_eq!("7".parse::<MemberId>(), Ok(MemberId(7)));
        assert_eq!("#7".parse::<MemberId>(), Ok(MemberId(7)));
        assert!("seven".parse::<MemberId>().is_err());
        assert_eq!(MemberId(7).to_string().parse::<MemberId>(), Ok(MemberId(7)));
    }
}

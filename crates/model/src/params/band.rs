use rust_decimal::Decimal;

use crate::member::{is_valid_level, MAX_LEVEL};

const LEVELS: usize = MAX_LEVEL as usize;

/// A run of consecutive levels sharing the same percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelBand {
    /// First level of the band (inclusive).
    pub from: u8,
    /// Last level of the band (inclusive).
    pub to: u8,
    /// Percentage of the pool paid at each level of the band.
    pub percent: Decimal,
}

impl LevelBand {
    /// Create a new [`LevelBand`].
    pub fn new(from: u8, to: u8, percent: Decimal) -> Self {
        Self { from, to, percent }
    }
}

/// Percentage schedule mapping each level in `1..=30` to a share of a pool.
///
/// The per-level percentages always sum to exactly `100`; a table that does not
/// is rejected when it is built, so holders of a [`LevelBandTable`] never need
/// to check again.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<LevelBand>", into = "Vec<LevelBand>")
)]
pub struct LevelBandTable {
    percents: [Decimal; LEVELS],
}

impl LevelBandTable {
    /// Create from per-level percentages, index `0` being level 1.
    /// # Errors
    /// - Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if any percentage is negative.
    /// - Returns [`Error::ConfigurationChecksum`](crate::Error::ConfigurationChecksum) if the
    ///   percentages do not sum to exactly `100`.
    pub fn new(percents: [Decimal; LEVELS]) -> crate::Result<Self> {
        if percents.iter().any(|p| *p < Decimal::ZERO) {
            return Err(crate::Error::InvalidConfig("negative level percentage"));
        }
        let sum = percents
            .iter()
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(*p))
            .ok_or(crate::Error::Overflow)?;
        if sum != Decimal::ONE_HUNDRED {
            return Err(crate::Error::ConfigurationChecksum { sum });
        }
        Ok(Self { percents })
    }

    /// Create from bands.
    ///
    /// The bands must cover every level in `1..=30` exactly once; their order
    /// does not matter.
    pub fn from_bands(bands: &[LevelBand]) -> crate::Result<Self> {
        let mut percents: [Option<Decimal>; LEVELS] = [None; LEVELS];
        for band in bands {
            if band.from > band.to {
                return Err(crate::Error::InvalidConfig("band `from` is greater than `to`"));
            }
            if !is_valid_level(band.from) || !is_valid_level(band.to) {
                return Err(crate::Error::InvalidConfig("band level out of range"));
            }
            for level in band.from..=band.to {
                let slot = &mut percents[usize::from(level - 1)];
                if slot.is_some() {
                    return Err(crate::Error::InvalidConfig("overlapping bands"));
                }
                *slot = Some(band.percent);
            }
        }
        let mut resolved = [Decimal::ZERO; LEVELS];
        for (target, percent) in resolved.iter_mut().zip(percents) {
            *target = percent.ok_or(crate::Error::InvalidConfig("bands leave a level uncovered"))?;
        }
        Self::new(resolved)
    }

    /// Get the percentage paid at `level`.
    ///
    /// Returns `None` if `level` is outside `1..=30`.
    pub fn percent(&self, level: u8) -> Option<Decimal> {
        if is_valid_level(level) {
            Some(self.percents[usize::from(level - 1)])
        } else {
            None
        }
    }

    /// Compute the share of `pool` paid at `level`: `pool * percent / 100`.
    pub fn share(&self, pool: &Decimal, level: u8) -> crate::Result<Decimal> {
        let percent = self
            .percent(level)
            .ok_or(crate::Error::InvalidLevel(level))?;
        pool.checked_mul(percent)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(crate::Error::Overflow)
    }

    /// Iterate over `(level, percent)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Decimal)> + '_ {
        (1..=MAX_LEVEL).zip(self.percents.iter().copied())
    }

    /// Collapse the table back into bands of equal consecutive percentages.
    pub fn bands(&self) -> Vec<LevelBand> {
        let mut bands: Vec<LevelBand> = Vec::new();
        for (level, percent) in self.iter() {
            match bands.last_mut() {
                Some(last) if last.percent == percent => last.to = level,
                _ => bands.push(LevelBand::new(level, level, percent)),
            }
        }
        bands
    }
}

impl Default for LevelBandTable {
    fn default() -> Self {
        let mut percents = [Decimal::ZERO; LEVELS];
        for (idx, percent) in percents.iter_mut().enumerate() {
            *percent = match idx + 1 {
                1..=3 => Decimal::new(5, 0),
                4..=6 => Decimal::new(15, 0),
                7..=9 => Decimal::new(8, 0),
                10..=20 => Decimal::ONE,
                _ => Decimal::new(5, 1),
            };
        }
        Self { percents }
    }
}

impl TryFrom<Vec<LevelBand>> for LevelBandTable {
    type Error = crate::Error;

    fn try_from(bands: Vec<LevelBand>) -> Result<Self, Self::Error> {
        Self::from_bands(&bands)
    }
}

impl From<LevelBandTable> for Vec<LevelBand> {
    fn from(table: LevelBandTable) -> Self {
        table.bands()
    }
}

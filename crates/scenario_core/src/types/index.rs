//! Sample and date index conventions.
//!
//! Three numbering schemes meet in this workspace:
//!
//! | Where                         | Sample numbering | Date numbering        |
//! |-------------------------------|------------------|-----------------------|
//! | Scenario dump, cube           | 1-based          | 1-based, 0 = t0       |
//! | Aggregation scenario file     | 0-based          | 1-based, 0 = t0       |
//! | Schema lists (tenors, ...)    | -                | 0-based positions     |
//!
//! [`SampleIndex`] always carries the 1-based convention. The aggregation
//! file's 0-based row number is only ever produced by
//! [`SampleIndex::aggregation_row`], so the shift lives in one place.

use std::fmt;

/// Shift between a [`SampleIndex`] and the aggregation file's sample column.
///
/// The aggregation file numbers samples from 0 while the scenario dump and
/// the cube number them from 1: aggregation row `r` is sample `r + 1`.
/// Changing this must be confirmed against the valuation service's own
/// convention first.
pub const AGGREGATION_SAMPLE_SHIFT: u32 = 1;

/// Monte-Carlo sample (path) number in the 1-based dump/cube convention.
///
/// # Examples
///
/// ```
/// use scenario_core::types::SampleIndex;
///
/// let sample = SampleIndex::new(1);
/// assert_eq!(sample.aggregation_row(), Some(0));
/// assert_eq!(SampleIndex::from_aggregation_row(0), sample);
/// assert_eq!(SampleIndex::new(0).aggregation_row(), None);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SampleIndex(u32);

impl SampleIndex {
    /// Wraps a 1-based sample number.
    #[inline]
    pub const fn new(sample: u32) -> Self {
        Self(sample)
    }

    /// Returns the raw 1-based number.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Sample column value used by the aggregation scenario file.
    ///
    /// `None` for sample 0, which has no counterpart there.
    #[inline]
    pub fn aggregation_row(self) -> Option<u32> {
        self.0.checked_sub(AGGREGATION_SAMPLE_SHIFT)
    }

    /// Inverse of [`SampleIndex::aggregation_row`].
    #[inline]
    pub fn from_aggregation_row(row: u32) -> Self {
        Self(row + AGGREGATION_SAMPLE_SHIFT)
    }
}

impl fmt::Display for SampleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SampleIndex {
    fn from(sample: u32) -> Self {
        Self(sample)
    }
}

/// Position on the simulation date grid; `0` is t0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateIndex(u32);

impl DateIndex {
    /// The run's global as-of date.
    pub const T0: DateIndex = DateIndex(0);

    /// Wraps a grid position.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw grid position.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns true for t0.
    #[inline]
    pub fn is_t0(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_shift_is_one() {
        assert_eq!(AGGREGATION_SAMPLE_SHIFT, 1);
    }

    #[test]
    fn test_sample_to_aggregation_row() {
        assert_eq!(SampleIndex::new(1).aggregation_row(), Some(0));
        assert_eq!(SampleIndex::new(42).aggregation_row(), Some(41));
        assert_eq!(SampleIndex::new(0).aggregation_row(), None);
    }

    #[test]
    fn test_aggregation_row_round_trip() {
        for row in [0u32, 1, 7, 999] {
            let sample = SampleIndex::from_aggregation_row(row);
            assert_eq!(sample.get(), row + 1);
            assert_eq!(sample.aggregation_row(), Some(row));
        }
    }

    #[test]
    fn test_date_index_t0() {
        assert!(DateIndex::T0.is_t0());
        assert!(!DateIndex::new(1).is_t0());
    }
}

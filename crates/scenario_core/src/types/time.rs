//! Time types for scenario replay.
//!
//! This module provides:
//! - `Date`: Type-safe date wrapper around chrono::NaiveDate
//! - `Tenor`: Period strings such as `3M` or `10Y`
//! - `DateGrid`: The simulation date grid mapping a [`DateIndex`] to a calendar date
//! - [`time_from_t0`]: Elapsed time on the fixed 365.25-day year
//!
//! # Examples
//!
//! ```
//! use scenario_core::types::time::{time_from_t0, Date};
//!
//! let t0 = Date::from_ymd(2025, 1, 1).unwrap();
//! let asof = Date::from_ymd(2026, 1, 1).unwrap();
//! assert!((time_from_t0(t0, asof) - 365.0 / 365.25).abs() < 1e-12);
//! ```

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use super::error::DateError;
use super::index::DateIndex;

/// Year length used for every elapsed-time figure in the cube.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Type-safe date wrapper around chrono::NaiveDate.
///
/// Displays and serialises as ISO 8601 (`YYYY-MM-DD`), which is also the
/// format written into market-data, fixing and cube files.
///
/// # Examples
///
/// ```
/// use scenario_core::types::time::Date;
///
/// let date = Date::from_ymd(2025, 6, 15).unwrap();
/// let parsed: Date = "2025-06-15".parse().unwrap();
/// assert_eq!(date, parsed);
///
/// // Compact form used by some valuation engines
/// assert_eq!(Date::parse("20250615").unwrap(), date);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a Date from year, month, and day components.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or(DateError::InvalidDate { year, month, day })
    }

    /// Parses `YYYY-MM-DD` or `YYYYMMDD`.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        let s = s.trim();
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
            .map(Date)
            .map_err(|e| DateError::ParseError(format!("'{}': {}", s, e)))
    }

    /// Returns the underlying NaiveDate.
    pub fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// Returns the year component.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Signed number of calendar days from `self` to `other`.
    pub fn days_until(&self, other: Date) -> i64 {
        other - *self
    }

    /// Shifts the date forward by `tenor`, clamping month-end days.
    pub fn advance(&self, tenor: Tenor) -> Result<Date, DateError> {
        let shifted = match tenor.unit {
            TenorUnit::Days => self.0.checked_add_days(Days::new(u64::from(tenor.count))),
            TenorUnit::Weeks => self
                .0
                .checked_add_days(Days::new(7 * u64::from(tenor.count))),
            TenorUnit::Months => self.0.checked_add_months(Months::new(tenor.count)),
            TenorUnit::Years => self
                .0
                .checked_add_months(Months::new(12 * tenor.count)),
        };
        shifted
            .map(Date)
            .ok_or_else(|| DateError::OutOfRange(format!("{} + {}", self, tenor)))
    }
}

impl Sub for Date {
    type Output = i64;

    fn sub(self, other: Self) -> i64 {
        (self.0 - other.0).num_days()
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        Date::parse(s)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

/// Elapsed time in years from `t0` to `asof` on a 365.25-day year.
///
/// Negative when `asof` precedes `t0`.
#[inline]
pub fn time_from_t0(t0: Date, asof: Date) -> f64 {
    (asof - t0) as f64 / DAYS_PER_YEAR
}

/// Period unit of a [`Tenor`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TenorUnit {
    /// Calendar days
    Days,
    /// Weeks of 7 days
    Weeks,
    /// Calendar months
    Months,
    /// Calendar years
    Years,
}

impl TenorUnit {
    fn suffix(&self) -> char {
        match self {
            TenorUnit::Days => 'D',
            TenorUnit::Weeks => 'W',
            TenorUnit::Months => 'M',
            TenorUnit::Years => 'Y',
        }
    }
}

/// A period such as `6M` or `10Y`.
///
/// # Examples
///
/// ```
/// use scenario_core::types::time::{Tenor, TenorUnit};
///
/// let tenor: Tenor = "6m".parse().unwrap();
/// assert_eq!(tenor, Tenor::new(6, TenorUnit::Months));
/// assert_eq!(tenor.to_string(), "6M");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tenor {
    /// Number of units
    pub count: u32,
    /// Period unit
    pub unit: TenorUnit,
}

impl Tenor {
    /// Creates a tenor.
    pub const fn new(count: u32, unit: TenorUnit) -> Self {
        Self { count, unit }
    }

    /// The tenor repeated `k` times (`3M × 4 = 12M`).
    pub fn times(&self, k: u32) -> Option<Tenor> {
        self.count.checked_mul(k).map(|count| Tenor::new(count, self.unit))
    }
}

impl FromStr for Tenor {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        let s = s.trim();
        let invalid = || DateError::InvalidTenor(s.to_string());
        let unit_char = s.chars().last().ok_or_else(invalid)?;
        let unit = match unit_char.to_ascii_uppercase() {
            'D' => TenorUnit::Days,
            'W' => TenorUnit::Weeks,
            'M' => TenorUnit::Months,
            'Y' => TenorUnit::Years,
            _ => return Err(invalid()),
        };
        let count = s[..s.len() - unit_char.len_utf8()]
            .parse::<u32>()
            .map_err(|_| invalid())?;
        Ok(Tenor::new(count, unit))
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

/// Simulation date grid.
///
/// Parsed from the `Parameters/Grid` node of a simulation configuration,
/// either as `<count>,<tenor>` (a regular grid) or as an explicit list of
/// tenors measured from t0. Date index `k ≥ 1` is the k-th grid date and
/// index `0` is t0 itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateGrid {
    /// `count` dates spaced by `step`: `t0 + k·step` for `k = 1..=count`.
    Regular {
        /// Number of simulation dates
        count: u32,
        /// Spacing between dates
        step: Tenor,
    },
    /// Explicit offsets from t0, one per simulation date.
    Tenors(Vec<Tenor>),
}

impl DateGrid {
    /// Parses a grid specification such as `88,3M` or `3M,6M,1Y`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scenario_core::types::time::{Date, DateGrid};
    /// use scenario_core::types::DateIndex;
    ///
    /// let grid = DateGrid::parse("4,3M").unwrap();
    /// let t0 = Date::from_ymd(2025, 1, 31).unwrap();
    /// assert_eq!(grid.len(), 4);
    /// assert_eq!(grid.date(t0, DateIndex::new(0)).unwrap(), Some(t0));
    /// assert_eq!(grid.date(t0, DateIndex::new(1)).unwrap(), Some(Date::from_ymd(2025, 4, 30).unwrap()));
    /// assert_eq!(grid.date(t0, DateIndex::new(5)).unwrap(), None);
    /// ```
    pub fn parse(spec: &str) -> Result<Self, DateError> {
        let tokens: Vec<&str> = spec
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(DateError::InvalidGrid(spec.to_string()));
        }

        if tokens.len() == 2 {
            if let Ok(count) = tokens[0].parse::<u32>() {
                let step: Tenor = tokens[1].parse()?;
                return Ok(DateGrid::Regular { count, step });
            }
        }

        let tenors = tokens
            .iter()
            .map(|t| t.parse::<Tenor>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DateGrid::Tenors(tenors))
    }

    /// Number of simulation dates (t0 excluded).
    pub fn len(&self) -> usize {
        match self {
            DateGrid::Regular { count, .. } => *count as usize,
            DateGrid::Tenors(tenors) => tenors.len(),
        }
    }

    /// Returns true if the grid holds no simulation date.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calendar date of `index`, `Ok(None)` when the index is beyond the grid.
    pub fn date(&self, t0: Date, index: DateIndex) -> Result<Option<Date>, DateError> {
        let k = index.get();
        if k == 0 {
            return Ok(Some(t0));
        }
        if k as usize > self.len() {
            return Ok(None);
        }
        let offset = match self {
            DateGrid::Regular { step, .. } => step
                .times(k)
                .ok_or_else(|| DateError::OutOfRange(format!("{} x {}", step, k)))?,
            DateGrid::Tenors(tenors) => tenors[k as usize - 1],
        };
        t0.advance(offset).map(Some)
    }

    /// Every simulation date in grid order, t0 excluded.
    pub fn dates(&self, t0: Date) -> Result<Vec<Date>, DateError> {
        (1..=self.len() as u32)
            .filter_map(|k| self.date(t0, DateIndex::new(k)).transpose())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    #[test]
    fn test_time_uses_365_25_day_year() {
        let t = time_from_t0(d(2025, 1, 1), d(2026, 1, 1));
        assert_relative_eq!(t, 365.0 / 365.25, epsilon = 1e-12);
        assert!(t < 1.0);
        assert_relative_eq!(t, 0.9993, epsilon = 1e-4);
    }

    #[test]
    fn test_time_at_t0_is_zero() {
        assert_eq!(time_from_t0(d(2025, 3, 1), d(2025, 3, 1)), 0.0);
    }

    #[test]
    fn test_time_before_t0_is_negative() {
        assert!(time_from_t0(d(2025, 3, 1), d(2025, 2, 1)) < 0.0);
    }

    #[test]
    fn test_date_parse_formats() {
        assert_eq!(Date::parse("2016-02-05").unwrap(), d(2016, 2, 5));
        assert_eq!(Date::parse(" 20160205 ").unwrap(), d(2016, 2, 5));
        assert!(Date::parse("05/02/2016").is_err());
    }

    #[test]
    fn test_date_display_is_iso() {
        assert_eq!(d(2025, 1, 5).to_string(), "2025-01-05");
    }

    #[test]
    fn test_tenor_parse() {
        assert_eq!("3M".parse::<Tenor>().unwrap(), Tenor::new(3, TenorUnit::Months));
        assert_eq!(" 10y".parse::<Tenor>().unwrap(), Tenor::new(10, TenorUnit::Years));
        assert_eq!("2W".parse::<Tenor>().unwrap(), Tenor::new(2, TenorUnit::Weeks));
        assert!("M".parse::<Tenor>().is_err());
        assert!("3Q".parse::<Tenor>().is_err());
        assert!("".parse::<Tenor>().is_err());
    }

    #[test]
    fn test_advance_clamps_month_end() {
        let date = d(2025, 1, 31);
        assert_eq!(date.advance(Tenor::new(1, TenorUnit::Months)).unwrap(), d(2025, 2, 28));
        assert_eq!(date.advance(Tenor::new(1, TenorUnit::Years)).unwrap(), d(2026, 1, 31));
        assert_eq!(date.advance(Tenor::new(1, TenorUnit::Weeks)).unwrap(), d(2025, 2, 7));
    }

    #[test]
    fn test_regular_grid_is_measured_from_t0() {
        let grid = DateGrid::parse("3,1M").unwrap();
        let dates = grid.dates(d(2025, 1, 31)).unwrap();
        // t0 + 2M, not (t0 + 1M) + 1M
        assert_eq!(dates, vec![d(2025, 2, 28), d(2025, 3, 31), d(2025, 4, 30)]);
    }

    #[test]
    fn test_tenor_list_grid() {
        let grid = DateGrid::parse("6M, 1Y ,2Y").unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(
            grid.date(d(2025, 1, 1), DateIndex::new(3)).unwrap(),
            Some(d(2027, 1, 1))
        );
    }

    #[test]
    fn test_grid_rejects_garbage() {
        assert!(DateGrid::parse("").is_err());
        assert!(DateGrid::parse("abc").is_err());
        assert!(DateGrid::parse("10,XX").is_err());
    }
}

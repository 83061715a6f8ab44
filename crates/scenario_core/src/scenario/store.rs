//! Scenario dump decoding.
//!
//! A scenario dump holds one record per `(date, sample, factor)`:
//!
//! ```text
//! #Date,Sample,Key,Value
//! 1,1,DiscountCurve/EUR/0,0.9875
//! 1,1,FXSpot/USDEUR/0,0.91
//! ```
//!
//! The store is fully materialised and read-only after loading.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use super::reader::{Line, ScenarioReader};
use crate::types::{DateIndex, ParseError, SampleIndex};

/// Values of every factor for one `(sample, date)`, keyed by factor key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactorSeries {
    values: HashMap<String, f64>,
}

impl FactorSeries {
    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of factors.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no factor.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(key, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn insert(&mut self, key: String, value: f64) -> bool {
        match self.values.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

/// Read-only view of a scenario dump.
///
/// # Examples
///
/// ```
/// use scenario_core::scenario::ScenarioStore;
/// use scenario_core::types::{DateIndex, SampleIndex};
///
/// let dump = "\
/// #Date,Sample,Key,Value
/// 2,1,DiscountCurve/EUR/0,0.97
/// 1,1,DiscountCurve/EUR/0,0.98
/// ";
/// let store = ScenarioStore::from_reader("dump.csv", dump.as_bytes()).unwrap();
///
/// let dates: Vec<u32> = store.distinct_dates().map(|d| d.get()).collect();
/// assert_eq!(dates, vec![1, 2]);
/// assert_eq!(
///     store.value(SampleIndex::new(1), DateIndex::new(1), "DiscountCurve/EUR/0"),
///     Some(0.98)
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct ScenarioStore {
    source: String,
    series: BTreeMap<(SampleIndex, DateIndex), FactorSeries>,
    dates: BTreeSet<DateIndex>,
    samples: BTreeSet<SampleIndex>,
    records: usize,
}

impl ScenarioStore {
    /// Loads a dump from disk (plain or gzip).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let reader = ScenarioReader::open(path.as_ref())?;
        Self::load(reader)
    }

    /// Loads a dump from any reader (plain or gzip); `name` is used in errors.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, ParseError> {
        Self::load(ScenarioReader::new(name, reader)?)
    }

    fn load(mut reader: ScenarioReader<'_>) -> Result<Self, ParseError> {
        let mut store = ScenarioStore {
            source: reader.path().to_string(),
            ..Default::default()
        };

        while let Some(line) = reader.next_line()? {
            let (line, record) = match line {
                Line::Comment { .. } => continue,
                Line::Data { line, record } => (line, record),
            };
            reader.expect_columns(line, &record)?;

            let date: u32 = reader.field(line, &record, 0, "date")?;
            if date == 0 {
                return Err(reader.invalid(line, "date", "0"));
            }
            let sample: u32 = reader.field(line, &record, 1, "sample")?;
            if sample == 0 {
                return Err(reader.invalid(line, "sample", "0"));
            }
            let key = record.get(2).unwrap_or_default();
            if key.is_empty() {
                return Err(reader.invalid(line, "key", key));
            }
            let value: f64 = reader.field(line, &record, 3, "value")?;

            let date = DateIndex::new(date);
            let sample_index = SampleIndex::new(sample);
            let inserted = store
                .series
                .entry((sample_index, date))
                .or_default()
                .insert(key.to_string(), value);
            if !inserted {
                return Err(ParseError::Duplicate {
                    path: reader.path().to_string(),
                    line,
                    date,
                    sample,
                    key: key.to_string(),
                });
            }

            store.dates.insert(date);
            store.samples.insert(sample_index);
            store.records += 1;
        }

        tracing::debug!(
            path = %store.source,
            records = store.records,
            dates = store.dates.len(),
            samples = store.samples.len(),
            "Loaded scenario dump"
        );

        Ok(store)
    }

    /// Name of the file or stream the store was read from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Factor values for one `(sample, date)`.
    pub fn factor_series(&self, sample: SampleIndex, date: DateIndex) -> Option<&FactorSeries> {
        self.series.get(&(sample, date))
    }

    /// Like [`ScenarioStore::factor_series`], but an unknown pair yields an
    /// empty series.
    pub fn factor_series_or_empty(&self, sample: SampleIndex, date: DateIndex) -> FactorSeries {
        self.factor_series(sample, date).cloned().unwrap_or_default()
    }

    /// Single factor value.
    pub fn value(&self, sample: SampleIndex, date: DateIndex, key: &str) -> Option<f64> {
        self.factor_series(sample, date).and_then(|s| s.get(key))
    }

    /// Distinct date indices in ascending order.
    ///
    /// Each call starts a fresh iteration.
    pub fn distinct_dates(&self) -> impl Iterator<Item = DateIndex> + '_ {
        self.dates.iter().copied()
    }

    /// Distinct sample indices in ascending order.
    pub fn samples(&self) -> impl Iterator<Item = SampleIndex> + '_ {
        self.samples.iter().copied()
    }

    /// Number of records loaded.
    pub fn len(&self) -> usize {
        self.records
    }

    /// Whether the dump held no data row.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

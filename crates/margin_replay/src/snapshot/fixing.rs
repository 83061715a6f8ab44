//! Fixing snapshot and numeraire series for one sample.
//!
//! Reads the aggregation scenario data of the sample (row `sample - 1`, see
//! [`SampleIndex::aggregation_row`]) and splits it into index fixings and
//! the path numeraire.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use scenario_core::scenario::{AggregationData, NUMERAIRE};
use scenario_core::types::{Date, DateGrid, DateIndex, SampleIndex, SnapshotError};

use super::market::grid_date;

/// Names of at most this many characters are not index fixings (e.g.
/// currency codes).
const MAX_NON_FIXING_NAME_CHARS: usize = 3;

/// Date index 0 of the aggregation file is t0 itself.
fn aggregation_date(
    grid: &DateGrid,
    t0: Date,
    sample: SampleIndex,
    date: DateIndex,
) -> Result<Date, SnapshotError> {
    if date.is_t0() {
        Ok(t0)
    } else {
        grid_date(grid, t0, sample, date)
    }
}

/// One index fixing.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixing {
    /// Fixing date
    pub asof: Date,
    /// Index name
    pub name: String,
    /// Fixing value
    pub value: f64,
}

/// Fixings of one sample, ordered by date then declaration key.
#[derive(Debug, Clone, PartialEq)]
pub struct FixingSnapshot {
    /// 1-based sample
    pub sample: SampleIndex,
    /// Fixings
    pub fixings: Vec<Fixing>,
}

impl FixingSnapshot {
    /// Writes the `#Sample=<n>` marker then `<date> <name> <value>` lines.
    pub fn write_lines<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "#Sample={}", self.sample)?;
        for fixing in &self.fixings {
            writeln!(out, "{} {} {}", fixing.asof, fixing.name, fixing.value)?;
        }
        Ok(())
    }

    /// Replaces the content of `path` with this snapshot.
    pub fn write_file(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_lines(&mut out)?;
        out.flush()
    }
}

/// Numeraire per as-of date for one sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumeraireSeries {
    values: BTreeMap<Date, f64>,
}

impl NumeraireSeries {
    /// Numeraire at `asof`.
    pub fn get(&self, asof: Date) -> Option<f64> {
        self.values.get(&asof).copied()
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(asof, numeraire)` pairs, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (Date, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }
}

impl FromIterator<(Date, f64)> for NumeraireSeries {
    fn from_iter<I: IntoIterator<Item = (Date, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Builds fixing snapshots and numeraire series from aggregation data.
#[derive(Debug, Clone, Copy)]
pub struct FixingSnapshotBuilder<'a> {
    data: &'a AggregationData,
    grid: &'a DateGrid,
    t0: Date,
}

impl<'a> FixingSnapshotBuilder<'a> {
    /// Creates a builder resolving dates on `grid` relative to `t0`.
    pub fn new(data: &'a AggregationData, grid: &'a DateGrid, t0: Date) -> Self {
        Self { data, grid, t0 }
    }

    /// Decodes the fixings and numeraire of `sample`.
    ///
    /// # Errors
    ///
    /// `SnapshotError::NoAggregationRow` when the file has no row
    /// `sample - 1`; `SnapshotError::DuplicateNumeraire` when two numeraire
    /// values share a date.
    pub fn build(&self, sample: SampleIndex) -> Result<(FixingSnapshot, NumeraireSeries), SnapshotError> {
        let mut fixings: BTreeMap<(DateIndex, u32), Fixing> = BTreeMap::new();
        let mut numeraire = BTreeMap::new();

        for value in self.data.values_for(sample)? {
            let asof = aggregation_date(self.grid, self.t0, sample, value.date)?;
            if value.name == NUMERAIRE {
                if numeraire.insert(asof, value.value).is_some() {
                    return Err(SnapshotError::DuplicateNumeraire {
                        sample,
                        date: value.date,
                    });
                }
            } else if value.name.chars().count() > MAX_NON_FIXING_NAME_CHARS {
                fixings.insert(
                    (value.date, value.key),
                    Fixing {
                        asof,
                        name: value.name.to_string(),
                        value: value.value,
                    },
                );
            }
        }

        tracing::debug!(
            sample = %sample,
            fixings = fixings.len(),
            numeraire_dates = numeraire.len(),
            "Decoded aggregation scenario"
        );

        Ok((
            FixingSnapshot {
                sample,
                fixings: fixings.into_values().collect(),
            },
            NumeraireSeries { values: numeraire },
        ))
    }
}

/// Per-sample fixing file.
#[derive(Debug, Clone)]
pub struct FixingFile {
    path: PathBuf,
}

impl FixingFile {
    /// Binds to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file content with `snapshot`.
    pub fn write(&self, snapshot: &FixingSnapshot) -> io::Result<()> {
        snapshot.write_file(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "\
# Numeraire,
# IndexFixing,EUR-EURIBOR-6M
# FX,USD
# IndexFixing,USD-LIBOR-3M
#Date,Sample,Key,Value
2,0,1,0.021
1,0,3,0.044
1,0,1,0.020
1,0,0,1.01
2,0,0,1.02
1,0,2,1.1
1,1,0,0.98
";

    fn t0() -> Date {
        Date::from_ymd(2025, 1, 1).unwrap()
    }

    fn build(sample: u32) -> Result<(FixingSnapshot, NumeraireSeries), SnapshotError> {
        let data = AggregationData::from_reader("scenariodata.csv", DATA.as_bytes()).unwrap();
        let grid = DateGrid::parse("2,1Y").unwrap();
        FixingSnapshotBuilder::new(&data, &grid, t0()).build(SampleIndex::new(sample))
    }

    #[test]
    fn test_fixings_ordered_and_filtered() {
        let (snapshot, _) = build(1).unwrap();
        let names: Vec<(String, &str)> = snapshot
            .fixings
            .iter()
            .map(|f| (f.asof.to_string(), f.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("2026-01-01".to_string(), "EUR-EURIBOR-6M"),
                ("2026-01-01".to_string(), "USD-LIBOR-3M"),
                ("2027-01-01".to_string(), "EUR-EURIBOR-6M"),
            ]
        );
    }

    #[test]
    fn test_numeraire_series() {
        let (_, numeraire) = build(1).unwrap();
        assert_eq!(numeraire.len(), 2);
        assert_eq!(numeraire.get(Date::from_ymd(2027, 1, 1).unwrap()), Some(1.02));
    }

    #[test]
    fn test_sample_reads_shifted_row() {
        let (snapshot, numeraire) = build(2).unwrap();
        assert!(snapshot.fixings.is_empty());
        assert_eq!(numeraire.get(Date::from_ymd(2026, 1, 1).unwrap()), Some(0.98));
        assert!(matches!(build(0), Err(SnapshotError::NoAggregationRow { .. })));
    }

    #[test]
    fn test_file_format() {
        let (snapshot, _) = build(1).unwrap();
        let mut out = Vec::new();
        snapshot.write_lines(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#Sample=1"));
        assert_eq!(lines.next(), Some("2026-01-01 EUR-EURIBOR-6M 0.02"));
    }

    #[test]
    fn test_duplicate_numeraire() {
        let text = "# Numeraire,\n# 5,Numeraire,\n1,0,0,1.0\n1,0,5,1.0\n";
        let data = AggregationData::from_reader("scenariodata.csv", text.as_bytes()).unwrap();
        let grid = DateGrid::parse("1,1Y").unwrap();
        assert!(matches!(
            FixingSnapshotBuilder::new(&data, &grid, t0()).build(SampleIndex::new(1)),
            Err(SnapshotError::DuplicateNumeraire { .. })
        ));
    }

    #[test]
    fn test_short_names_counted_in_characters() {
        let text = "# Numeraire,\n# FX,€UR\n# IndexFixing,ÉUR6\n1,0,0,1.0\n1,0,1,1.1\n1,0,2,0.03\n";
        let data = AggregationData::from_reader("scenariodata.csv", text.as_bytes()).unwrap();
        let grid = DateGrid::parse("1,1Y").unwrap();
        let (snapshot, _) = FixingSnapshotBuilder::new(&data, &grid, t0())
            .build(SampleIndex::new(1))
            .unwrap();
        let names: Vec<&str> = snapshot.fixings.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ÉUR6"]);
    }
}

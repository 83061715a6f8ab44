//! Aggregation scenario data decoding.
//!
//! The aggregation file carries per-path auxiliary quantities (index
//! fixings, the numeraire) keyed by an integer declared in a dictionary of
//! comment lines:
//!
//! ```text
//! # Numeraire,
//! # IndexFixing,EUR-EURIBOR-6M
//! # 5,FxFixing,USDEUR
//! #Date,Sample,Key,Value
//! 1,0,0,1.0012
//! 1,0,1,0.0321
//! ```
//!
//! `# <type>,<name>` declares the next ordinal key (from 0);
//! `# <key>,<type>,<name>` declares an explicit key. Comments whose type
//! field contains whitespace are free text and declare nothing. A numeraire
//! declared without a name is called [`NUMERAIRE`]. Samples are numbered
//! from 0 here, see [`SampleIndex::aggregation_row`].

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use super::reader::{Line, ScenarioReader};
use crate::types::{DateIndex, OrderingError, ParseError, SampleIndex, SnapshotError};

/// Name given to the numeraire when its declaration leaves the name blank.
pub const NUMERAIRE: &str = "NUMERAIRE";

const NUMERAIRE_TYPE: &str = "Numeraire";

/// Failure while decoding an aggregation file.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// Malformed content
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Data row citing a key not yet declared
    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

/// One dictionary entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactorDeclaration {
    /// Integer key used by data rows
    pub key: u32,
    /// Declared type, e.g. `IndexFixing`
    pub kind: String,
    /// Declared name, e.g. `EUR-EURIBOR-6M`
    pub name: String,
}

impl FactorDeclaration {
    /// Whether this entry is the path numeraire.
    pub fn is_numeraire(&self) -> bool {
        self.name == NUMERAIRE
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Record {
    date: DateIndex,
    key: u32,
    value: f64,
}

/// A decoded data row with its resolved name.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregationValue<'a> {
    /// Date index (1-based)
    pub date: DateIndex,
    /// Dictionary key
    pub key: u32,
    /// Declared name
    pub name: &'a str,
    /// Value
    pub value: f64,
}

/// Read-only view of an aggregation scenario file.
#[derive(Clone, Debug, Default)]
pub struct AggregationData {
    source: String,
    declarations: BTreeMap<u32, FactorDeclaration>,
    rows: BTreeMap<u32, Vec<Record>>,
}

impl AggregationData {
    /// Loads an aggregation file from disk (plain or gzip).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AggregationError> {
        Self::load(ScenarioReader::open(path.as_ref())?)
    }

    /// Loads an aggregation file from any reader; `name` is used in errors.
    pub fn from_reader<R: Read>(
        name: impl Into<String>,
        reader: R,
    ) -> Result<Self, AggregationError> {
        Self::load(ScenarioReader::new(name, reader)?)
    }

    fn load(mut reader: ScenarioReader<'_>) -> Result<Self, AggregationError> {
        let mut data = AggregationData {
            source: reader.path().to_string(),
            ..Default::default()
        };
        let mut seen: HashMap<(u32, DateIndex, u32), u64> = HashMap::new();
        let mut next_ordinal = 0u32;
        let mut records = 0usize;

        while let Some(line) = reader.next_line()? {
            match line {
                Line::Comment { line, fields } => {
                    let Some(declaration) = parse_declaration(&fields, next_ordinal) else {
                        continue;
                    };
                    if data.declarations.contains_key(&declaration.key) {
                        return Err(reader
                            .invalid(line, "key", declaration.key.to_string())
                            .into());
                    }
                    next_ordinal += 1;
                    data.declarations.insert(declaration.key, declaration);
                }
                Line::Data { line, record } => {
                    reader.expect_columns(line, &record)?;
                    let date: u32 = reader.field(line, &record, 0, "date")?;
                    let row: u32 = reader.field(line, &record, 1, "sample")?;
                    let key: u32 = reader.field(line, &record, 2, "key")?;
                    let value: f64 = reader.field(line, &record, 3, "value")?;

                    let Some(declaration) = data.declarations.get(&key) else {
                        return Err(OrderingError {
                            path: reader.path().to_string(),
                            line,
                            key,
                        }
                        .into());
                    };

                    let date = DateIndex::new(date);
                    if seen.insert((row, date, key), line).is_some() {
                        return Err(ParseError::Duplicate {
                            path: reader.path().to_string(),
                            line,
                            date,
                            sample: row,
                            key: declaration.name.clone(),
                        }
                        .into());
                    }

                    data.rows
                        .entry(row)
                        .or_default()
                        .push(Record { date, key, value });
                    records += 1;
                }
            }
        }

        tracing::debug!(
            path = %data.source,
            declarations = data.declarations.len(),
            samples = data.rows.len(),
            records,
            "Loaded aggregation scenario data"
        );

        Ok(data)
    }

    /// Name of the file or stream the data was read from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Dictionary entries in key order.
    pub fn declarations(&self) -> impl Iterator<Item = &FactorDeclaration> + '_ {
        self.declarations.values()
    }

    /// Dictionary entry for `key`.
    pub fn declaration(&self, key: u32) -> Option<&FactorDeclaration> {
        self.declarations.get(&key)
    }

    /// Rows of `sample` (1-based), read from aggregation row `sample - 1`,
    /// in file order.
    ///
    /// # Errors
    ///
    /// `SnapshotError::NoAggregationRow` for sample 0 or when the file has
    /// no row for the sample.
    pub fn values_for(
        &self,
        sample: SampleIndex,
    ) -> Result<impl Iterator<Item = AggregationValue<'_>> + '_, SnapshotError> {
        let rows = sample
            .aggregation_row()
            .and_then(|row| self.rows.get(&row))
            .ok_or(SnapshotError::NoAggregationRow { sample })?;

        Ok(rows.iter().filter_map(move |record| {
            self.declarations
                .get(&record.key)
                .map(|declaration| AggregationValue {
                    date: record.date,
                    key: record.key,
                    name: &declaration.name,
                    value: record.value,
                })
        }))
    }

    /// 1-based samples present in the file, ascending.
    pub fn samples(&self) -> impl Iterator<Item = SampleIndex> + '_ {
        self.rows.keys().map(|row| SampleIndex::from_aggregation_row(*row))
    }
}

fn parse_declaration(fields: &[String], ordinal: u32) -> Option<FactorDeclaration> {
    let (key, kind, name) = match fields {
        [kind, name] => (ordinal, kind, name),
        [key, kind, name] => (key.parse().ok()?, kind, name),
        _ => return None,
    };
    // A type is a single token; anything else is free text.
    if kind.is_empty() || kind.chars().any(char::is_whitespace) {
        return None;
    }
    let name = if name.is_empty() && kind.eq_ignore_ascii_case(NUMERAIRE_TYPE) {
        NUMERAIRE.to_string()
    } else {
        name.clone()
    };
    Some(FactorDeclaration {
        key,
        kind: kind.clone(),
        name,
    })
}

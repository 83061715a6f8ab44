//! Line reader shared by both scenario file formats.
//!
//! Both files are comma-delimited, `'`-quoted, optionally gzip-compressed
//! text. Lines whose first field starts with `#` are surfaced as comments
//! instead of being dropped, because the aggregation file declares its
//! factor dictionary in them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::types::ParseError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Number of columns of a data row in both formats.
pub(crate) const DATA_COLUMNS: usize = 4;

/// One non-blank line.
#[derive(Debug)]
pub(crate) enum Line {
    /// Fields of a `#` line, with the marker stripped from the first field.
    Comment { line: u64, fields: Vec<String> },
    /// Fields of a data row.
    Data { line: u64, record: StringRecord },
}

pub(crate) struct ScenarioReader<'a> {
    path: String,
    inner: csv::Reader<Box<dyn Read + 'a>>,
    record: StringRecord,
}

/// Wraps `reader` in a gzip decoder when it starts with the gzip magic.
pub(crate) fn decompress<'a, R: Read + 'a>(reader: R) -> io::Result<Box<dyn Read + 'a>> {
    let mut buffered = BufReader::new(reader);
    let is_gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(buffered)))
    } else {
        Ok(Box::new(buffered))
    }
}

impl ScenarioReader<'static> {
    pub(crate) fn open(path: &Path) -> Result<Self, ParseError> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|source| ParseError::Io {
            path: name.clone(),
            source,
        })?;
        ScenarioReader::new(name, file)
    }
}

impl<'a> ScenarioReader<'a> {
    pub(crate) fn new<R: Read + 'a>(path: impl Into<String>, reader: R) -> Result<Self, ParseError> {
        let path = path.into();
        let decoded = decompress(reader).map_err(|source| ParseError::Io {
            path: path.clone(),
            source,
        })?;
        let inner = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(b',')
            .quote(b'\'')
            .trim(Trim::All)
            .from_reader(decoded);
        Ok(Self {
            path,
            inner,
            record: StringRecord::new(),
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Next non-blank line, or `None` at end of input.
    pub(crate) fn next_line(&mut self) -> Result<Option<Line>, ParseError> {
        loop {
            let more = self
                .inner
                .read_record(&mut self.record)
                .map_err(|e| csv_error(&self.path, &e))?;
            if !more {
                return Ok(None);
            }

            if self.record.iter().all(str::is_empty) {
                continue;
            }

            let line = self.record.position().map_or(0, |p| p.line());
            let first = self.record.get(0).unwrap_or_default();

            if let Some(rest) = first.strip_prefix('#') {
                let mut fields = Vec::with_capacity(self.record.len());
                fields.push(rest.trim().to_string());
                fields.extend(self.record.iter().skip(1).map(str::to_string));
                return Ok(Some(Line::Comment { line, fields }));
            }

            return Ok(Some(Line::Data {
                line,
                record: self.record.clone(),
            }));
        }
    }

    /// Checks the column count of a data row.
    pub(crate) fn expect_columns(&self, line: u64, record: &StringRecord) -> Result<(), ParseError> {
        if record.len() == DATA_COLUMNS {
            Ok(())
        } else {
            Err(ParseError::ColumnCount {
                path: self.path.clone(),
                line,
                expected: DATA_COLUMNS,
                found: record.len(),
            })
        }
    }

    /// Parses column `column` of a data row.
    pub(crate) fn field<T: std::str::FromStr>(
        &self,
        line: u64,
        record: &StringRecord,
        column: usize,
        field: &'static str,
    ) -> Result<T, ParseError> {
        let raw = record.get(column).unwrap_or_default();
        raw.parse().map_err(|_| ParseError::InvalidField {
            path: self.path.clone(),
            line,
            field,
            value: raw.to_string(),
        })
    }

    pub(crate) fn invalid(&self, line: u64, field: &'static str, value: impl Into<String>) -> ParseError {
        ParseError::InvalidField {
            path: self.path.clone(),
            line,
            field,
            value: value.into(),
        }
    }
}

fn csv_error(path: &str, error: &csv::Error) -> ParseError {
    ParseError::Csv {
        path: path.to_string(),
        line: error.position().map_or(0, |p| p.line()),
        message: error.to_string(),
    }
}

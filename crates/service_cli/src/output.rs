//! Row output in csv, json or table form.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use margin_replay::cube::analytics::ExpectedRow;
use margin_replay::cube::CubeRow;
use serde::Serialize;

use crate::{CliError, Result};

/// Output format of the read-side commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Comma-separated with header
    Csv,
    /// Pretty-printed JSON array
    Json,
    /// Boxed text table
    Table,
}

impl FromStr for Format {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "table" => Ok(Format::Table),
            other => Err(CliError::InvalidArgument(format!(
                "Unknown format: {}. Supported: csv, json, table",
                other
            ))),
        }
    }
}

/// A row that can be shown as a table line.
pub trait TableRow {
    /// Column titles.
    fn header() -> &'static [&'static str];
    /// Cell texts, one per column.
    fn cells(&self) -> Vec<String>;
}

impl TableRow for CubeRow {
    fn header() -> &'static [&'static str] {
        &["Sample", "AsOfDate", "Time", "InitialMargin", "Currency", "MarginType"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.sample.to_string(),
            self.asof.to_string(),
            format!("{:.4}", self.time),
            format!("{:.2}", self.margin),
            self.currency.clone(),
            self.margin_type.clone(),
        ]
    }
}

impl TableRow for ExpectedRow {
    fn header() -> &'static [&'static str] {
        &["Portfolio", "MarginType", "AsOfDate", "Time", "ExpectedMargin", "Currency", "Samples"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.margin_type.clone(),
            self.asof.to_string(),
            format!("{:.4}", self.time),
            format!("{:.2}", self.margin),
            self.currency.clone(),
            self.samples.to_string(),
        ]
    }
}

/// Writes `rows` to `output`, or stdout when `None`.
pub fn write_rows<T: Serialize + TableRow>(
    rows: &[T],
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    render(rows, format, out)
}

fn render<T: Serialize + TableRow, W: Write>(rows: &[T], format: Format, mut out: W) -> Result<()> {
    match format {
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            writeln!(out)?;
            out.flush()?;
        }
        Format::Table => {
            write_table(rows, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn write_table<T: TableRow, W: Write>(rows: &[T], out: &mut W) -> io::Result<()> {
    let header = T::header();
    let cells: Vec<Vec<String>> = rows.iter().map(TableRow::cells).collect();
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, title)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(title.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = |left: &str, mid: &str, right: &str| {
        let parts: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, parts.join(mid), right)
    };
    let line = |values: Vec<&str>| {
        let parts: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v, width = w))
            .collect();
        format!("│{}│", parts.join("│"))
    };

    writeln!(out, "{}", rule("┌", "┬", "┐"))?;
    writeln!(out, "{}", line(header.to_vec()))?;
    writeln!(out, "{}", rule("├", "┼", "┤"))?;
    if cells.is_empty() {
        writeln!(out, "{}", line(header.iter().map(|_| "").collect()))?;
    }
    for row in &cells {
        writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
    }
    writeln!(out, "{}", rule("└", "┴", "┘"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use margin_replay::cube::MarginDepth;
    use scenario_core::types::{Date, SampleIndex};

    fn row() -> CubeRow {
        CubeRow {
            portfolio: "CPTY_A".to_string(),
            sample: SampleIndex::new(1),
            asof: Date::from_ymd(2026, 1, 1).unwrap(),
            time: 365.0 / 365.25,
            margin: 1000.0,
            currency: "EUR".to_string(),
            side: "Call".to_string(),
            depth: MarginDepth::All,
            margin_type: "All".to_string(),
        }
    }

    fn rendered(format: Format) -> String {
        let mut out = Vec::new();
        render(&[row()], format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!(matches!("xml".parse::<Format>(), Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_csv_uses_cube_columns() {
        let text = rendered(Format::Csv);
        assert!(text.starts_with(
            "Portfolio,Sample,AsOfDate,Time,InitialMargin,Currency,SimmSide,Depth,MarginType\n"
        ));
    }

    #[test]
    fn test_json_array() {
        let value: serde_json::Value = serde_json::from_str(&rendered(Format::Json)).unwrap();
        assert_eq!(value[0]["InitialMargin"], 1000.0);
        assert_eq!(value[0]["AsOfDate"], "2026-01-01");
    }

    #[test]
    fn test_table_alignment() {
        let text = rendered(Format::Table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("InitialMargin"));
        assert!(lines[3].contains("1000.00"));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }
}

//! CSV persistence for labeled grids.
//!
//! Layout shared by inputs and outputs:
//! ```text
//! ,c0,c1,c2
//! r0,0,1.5,
//! r1,,2,3
//! ```
//! The header's first cell is blank and the rest are column labels. Every data
//! row starts with its row label, which is never a value column. Empty fields
//! are missing values.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use thiserror::Error;

use crate::grid::{GridError, GridTable};

/// Significant digits written for each value.
const PRECISION: usize = 6;

#[derive(Error, Debug)]
pub enum CsvGridError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed grid '{file}' at line {line}: {reason}")]
    Format {
        file: String,
        line: u64,
        reason: String,
    },

    #[error("output '{}' already exists and overwrite is off", .0.display())]
    OutputExists(PathBuf),

    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type Result<T> = std::result::Result<T, CsvGridError>;

fn format_error(file: &str, line: u64, reason: impl Into<String>) -> CsvGridError {
    CsvGridError::Format {
        file: file.to_owned(),
        line,
        reason: reason.into(),
    }
}

/// Parse one value field. Empty and NaN fields are missing.
fn parse_cell(field: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if field.is_empty() {
        return Ok(None);
    }
    let v: f64 = field.parse()?;
    Ok(if v.is_nan() { None } else { Some(v) })
}

/// Read a grid from any reader. `file` names the source in error messages.
pub fn read_grid<R: Read>(reader: R, file: &str) -> Result<GridTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let mut records = rdr.records();

    let header = match records.next() {
        Some(rec) => rec?,
        None => return Err(format_error(file, 1, "missing header row")),
    };
    let column_labels: Vec<String> = header.iter().skip(1).map(str::to_owned).collect();
    let cols = column_labels.len();

    let mut row_labels = Vec::new();
    let mut values = Vec::new();

    for rec in records {
        let rec = rec?;
        let line = rec.position().map_or(0, |p| p.line());
        if rec.len() == 1 && rec[0].is_empty() {
            continue;
        }
        if rec.len() != cols + 1 {
            let reason = if rec.len() == cols {
                format!(
                    "{} fields, but the header implies a row label plus {cols} values; \
                     the row label column may be missing",
                    rec.len()
                )
            } else {
                format!(
                    "expected {} fields (row label + {cols} values), found {}",
                    cols + 1,
                    rec.len()
                )
            };
            return Err(format_error(file, line, reason));
        }

        row_labels.push(rec[0].to_owned());
        for (j, field) in rec.iter().skip(1).enumerate() {
            let v = parse_cell(field).map_err(|e| {
                format_error(
                    file,
                    line,
                    format!("column '{}': cannot parse '{field}' as a number ({e})", column_labels[j]),
                )
            })?;
            values.push(v);
        }
    }

    Ok(GridTable::from_values(row_labels, column_labels, values)?)
}

/// Load a grid from a CSV file.
pub fn load_grid(path: &Path) -> Result<GridTable> {
    let file = File::open(path).map_err(|source| CsvGridError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_grid(file, &path.display().to_string())
}

/// `%g`-style compact formatting: six significant digits, trailing zeros
/// stripped, exponent form below 1e-4 or from 1e6 up.
pub fn format_general(v: f64) -> String {
    if v.is_nan() {
        return "nan".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    // Rounding to PRECISION digits first fixes the exponent, so 999999.7
    // becomes 1e+06 rather than 1000000.
    let sci = format!("{:.*e}", PRECISION - 1, v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{v:.decimals$}")).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Write a grid to any writer in the shared layout.
pub fn write_grid<W: Write>(writer: W, table: &GridTable) -> csv::Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let header = std::iter::once("").chain(table.column_labels().iter().map(String::as_str));
    wtr.write_record(header)?;

    for (r, label) in table.row_labels().iter().enumerate() {
        let fields = table
            .row(r)
            .iter()
            .map(|v| v.map(format_general).unwrap_or_default());
        wtr.write_record(std::iter::once(label.clone()).chain(fields))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `table` to `path`. An existing file is left alone unless `overwrite`
/// is set, in which case it is replaced.
pub fn save_grid(table: &GridTable, path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(CsvGridError::OutputExists(path.to_path_buf()));
    }
    let file = File::create(path).map_err(|source| CsvGridError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_grid(file, table)?;
    Ok(())
}

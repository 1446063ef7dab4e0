//! Typed reader: one CSV file into a [`Table`] with exactly the `ColumnSpec` columns.
//!
//! Only the fields mapped to spec columns are decoded. Cells that fail to coerce, short rows and
//! absent optional columns all take the column default; only I/O and structural CSV errors fail
//! the file.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::ReadError;
use crate::schema::{ColumnDef, ColumnSpec, ColumnType, Value};
use crate::table::{Column, Table};
use crate::utils::config::{DATE_FORMATS, DATETIME_FORMATS, DEFAULT_DELIMITER};

use super::precheck::normalize_header;

/// Read buffer for data files.
const READ_BUF_CAPACITY: usize = 256 * 1024;

/// Where a spec column comes from in this file.
struct ColumnPlan<'s> {
    def: &'s ColumnDef,
    /// Field index in the file, or None when the column is absent.
    source: Option<usize>,
}

/// Read `path` with the default delimiter.
pub fn read_typed(path: &Path, spec: &ColumnSpec) -> Result<Table, ReadError> {
    read_typed_with(path, spec, DEFAULT_DELIMITER)
}

/// Read `path` into a table laid out as `spec`.
pub fn read_typed_with(path: &Path, spec: &ColumnSpec, delimiter: u8) -> Result<Table, ReadError> {
    let csv_err = |source| ReadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(BufReader::with_capacity(READ_BUF_CAPACITY, file));

    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| normalize_header(&String::from_utf8_lossy(h)).to_string())
        .collect();

    let plans = plan_columns(path, spec, &headers)?;
    let mut columns: Vec<Column> = spec
        .columns()
        .iter()
        .map(|c| Column::with_capacity(c.ty, 0))
        .collect();

    let mut record = csv::ByteRecord::new();
    let mut rows = 0usize;
    while rdr.read_byte_record(&mut record).map_err(csv_err)? {
        for (plan, col) in plans.iter().zip(columns.iter_mut()) {
            if let Some(i) = plan.source {
                col.push(coerce_cell(plan.def, record.get(i)));
            }
        }
        rows += 1;
    }
    // Absent optional columns are filled once the row count is known.
    for (plan, col) in plans.iter().zip(columns.iter_mut()) {
        if plan.source.is_none() {
            *col = Column::filled(&plan.def.default, rows);
        }
    }
    log::trace!("{}: {} rows, {} columns", path.display(), rows, plans.len());

    Ok(Table::from_columns(spec, columns))
}

/// Map spec columns to header positions. The first occurrence wins on duplicate headers.
fn plan_columns<'s>(
    path: &Path,
    spec: &'s ColumnSpec,
    headers: &[String],
) -> Result<Vec<ColumnPlan<'s>>, ReadError> {
    spec.columns()
        .iter()
        .map(|def| {
            let source = headers.iter().position(|h| *h == def.name);
            if source.is_none() && def.required {
                return Err(ReadError::MissingColumn {
                    path: path.to_path_buf(),
                    column: def.name.clone(),
                });
            }
            Ok(ColumnPlan { def, source })
        })
        .collect()
}

/// Coerce one raw cell to the column's type; absent or unparsable cells take the default.
pub fn coerce_cell(def: &ColumnDef, cell: Option<&[u8]>) -> Value {
    let Some(raw) = cell else {
        return def.default.clone();
    };
    if def.ty == ColumnType::String {
        return Value::String(String::from_utf8_lossy(raw).into_owned());
    }
    let Ok(text) = std::str::from_utf8(raw) else {
        return def.default.clone();
    };
    let text = text.trim();
    if text.is_empty() {
        return def.default.clone();
    }
    let parsed = match def.ty {
        ColumnType::Integer => parse_integer(text).map(Value::Integer),
        ColumnType::Float => parse_float(text).map(Value::Float),
        ColumnType::Date => parse_date(text).map(Value::Date),
        ColumnType::String => unreachable!("handled above"),
    };
    parsed.unwrap_or_else(|| def.default.clone())
}

/// `i64`, or a float literal with no fractional part (`"3.0"`).
pub fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let f = text.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Finite `f64` only; NaN and infinities degrade to the default.
pub fn parse_float(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Date in one of [`DATE_FORMATS`], the date part of [`DATETIME_FORMATS`], or RFC 3339.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

//! Columnar in-memory table: one typed vector per declared column.
//!
//! Every table built for a [`ColumnSpec`] has the same column names, types and order, which is
//! what makes [`Table::concat`] valid across files.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::fs::create_dir_all;
use std::path::Path;

use crate::schema::{ColumnSpec, ColumnType, Value};

/// Typed storage for a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Date(Vec<NaiveDate>),
    String(Vec<String>),
}

impl Column {
    pub fn with_capacity(ty: ColumnType, cap: usize) -> Self {
        match ty {
            ColumnType::Integer => Column::Integer(Vec::with_capacity(cap)),
            ColumnType::Float => Column::Float(Vec::with_capacity(cap)),
            ColumnType::Date => Column::Date(Vec::with_capacity(cap)),
            ColumnType::String => Column::String(Vec::with_capacity(cap)),
        }
    }

    /// A column of `len` copies of `value`.
    pub fn filled(value: &Value, len: usize) -> Self {
        match value {
            Value::Integer(v) => Column::Integer(vec![*v; len]),
            Value::Float(v) => Column::Float(vec![*v; len]),
            Value::Date(v) => Column::Date(vec![*v; len]),
            Value::String(v) => Column::String(vec![v.clone(); len]),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Integer(_) => ColumnType::Integer,
            Column::Float(_) => ColumnType::Float,
            Column::Date(_) => ColumnType::Date,
            Column::String(_) => ColumnType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Date(v) => v.len(),
            Column::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Column::Integer(v) => v.get(row).map(|x| Value::Integer(*x)),
            Column::Float(v) => v.get(row).map(|x| Value::Float(*x)),
            Column::Date(v) => v.get(row).map(|x| Value::Date(*x)),
            Column::String(v) => v.get(row).map(|x| Value::String(x.clone())),
        }
    }

    /// Push a value. The caller guarantees the value's type matches the column.
    pub(crate) fn push(&mut self, value: Value) {
        match (self, value) {
            (Column::Integer(v), Value::Integer(x)) => v.push(x),
            (Column::Float(v), Value::Float(x)) => v.push(x),
            (Column::Date(v), Value::Date(x)) => v.push(x),
            (Column::String(v), Value::String(x)) => v.push(x),
            (col, value) => unreachable!(
                "{} value pushed into {} column",
                value.column_type(),
                col.column_type()
            ),
        }
    }

    /// Move all values of `other` into `self`. Returns false on a type mismatch.
    fn append(&mut self, other: &mut Column) -> bool {
        match (self, other) {
            (Column::Integer(a), Column::Integer(b)) => a.append(b),
            (Column::Float(a), Column::Float(b)) => a.append(b),
            (Column::Date(a), Column::Date(b)) => a.append(b),
            (Column::String(a), Column::String(b)) => a.append(b),
            _ => return false,
        }
        true
    }

    fn reserve(&mut self, additional: usize) {
        match self {
            Column::Integer(v) => v.reserve(additional),
            Column::Float(v) => v.reserve(additional),
            Column::Date(v) => v.reserve(additional),
            Column::String(v) => v.reserve(additional),
        }
    }
}

/// Tabular result: `names[i]` labels `columns[i]`; all columns have the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Zero-row table with `spec`'s columns.
    pub fn empty(spec: &ColumnSpec) -> Self {
        Self::with_capacity(spec, 0)
    }

    pub fn with_capacity(spec: &ColumnSpec, rows: usize) -> Self {
        Self {
            names: spec.names().map(str::to_string).collect(),
            columns: spec
                .columns()
                .iter()
                .map(|c| Column::with_capacity(c.ty, rows))
                .collect(),
        }
    }

    /// Assemble from already-built columns (same order as `spec`).
    pub(crate) fn from_columns(spec: &ColumnSpec, columns: Vec<Column>) -> Self {
        debug_assert_eq!(spec.len(), columns.len());
        Self {
            names: spec.names().map(str::to_string).collect(),
            columns,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Row `i` as values in column order.
    pub fn row(&self, i: usize) -> Option<Vec<Value>> {
        self.columns.iter().map(|c| c.get(i)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.num_rows()).filter_map(|i| self.row(i))
    }

    /// Move every row of `other` to the end of `self`.
    pub fn append(&mut self, mut other: Table) -> Result<()> {
        if self.names != other.names {
            bail!(
                "column layout mismatch: {:?} vs {:?}",
                self.names,
                other.names
            );
        }
        for (a, b) in self.columns.iter_mut().zip(other.columns.iter_mut()) {
            if !a.append(b) {
                bail!(
                    "column type mismatch: {} vs {}",
                    a.column_type(),
                    b.column_type()
                );
            }
        }
        Ok(())
    }

    /// Concatenate tables in the given order into a single table with `spec`'s layout.
    pub fn concat(spec: &ColumnSpec, tables: Vec<Table>) -> Result<Table> {
        let total: usize = tables.iter().map(Table::num_rows).sum();
        let mut out = Table::with_capacity(spec, 0);
        for c in out.columns.iter_mut() {
            c.reserve(total);
        }
        for t in tables {
            out.append(t)?;
        }
        Ok(out)
    }

    /// Write with a header row. Creates parent directories.
    pub fn write_csv(&self, path: &Path, delimiter: u8) -> Result<usize> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)
            .with_context(|| format!("create {}", path.display()))?;
        wtr.write_record(&self.names)
            .with_context(|| format!("write header to {}", path.display()))?;
        for (i, row) in self.rows().enumerate() {
            wtr.write_record(row.iter().map(|v| v.to_string()))
                .with_context(|| format!("write CSV row #{}", i + 1))?;
        }
        wtr.flush()?;
        Ok(self.num_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn spec() -> ColumnSpec {
        ColumnSpec::new(vec![
            ColumnDef::required("id", ColumnType::Integer),
            ColumnDef::optional("name", ColumnType::String),
        ])
        .unwrap()
    }

    fn table(ids: &[i64]) -> Table {
        let spec = spec();
        Table::from_columns(
            &spec,
            vec![
                Column::Integer(ids.to_vec()),
                Column::String(ids.iter().map(|i| format!("n{i}")).collect()),
            ],
        )
    }

    #[test]
    fn empty_table_keeps_declared_columns() {
        let t = Table::empty(&spec());
        assert_eq!(t.names(), &["id".to_string(), "name".to_string()]);
        assert_eq!(t.num_rows(), 0);
        assert!(t.is_empty());
    }

    #[test]
    fn concat_preserves_chunk_order() {
        let t = Table::concat(&spec(), vec![table(&[1, 2]), table(&[]), table(&[3])]).unwrap();
        assert_eq!(t.column("id"), Some(&Column::Integer(vec![1, 2, 3])));
        assert_eq!(
            t.row(2),
            Some(vec![Value::Integer(3), Value::String("n3".into())])
        );
    }

    #[test]
    fn append_rejects_other_layout() {
        let other_spec = ColumnSpec::new(vec![ColumnDef::required("x", ColumnType::Float)]).unwrap();
        let mut t = table(&[1]);
        assert!(t.append(Table::empty(&other_spec)).is_err());
    }

    #[test]
    fn write_csv_emits_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.csv");
        assert_eq!(table(&[7, 8]).write_csv(&out, b',').unwrap(), 2);
        let text = std::fs::read_to_string(out).unwrap();
        assert_eq!(text, "id,name\n7,n7\n8,n8\n");
    }
}

//! Column specification: ordered, typed columns with explicit defaults and required/optional policy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::utils::config::Sentinels;

/// Semantic type tag of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Date,
    String,
}

impl ColumnType {
    /// Sentinel substituted for absent or unparsable values.
    pub fn default_value(self) -> Value {
        match self {
            ColumnType::Integer => Value::Integer(Sentinels::INTEGER),
            ColumnType::Float => Value::Float(Sentinels::FLOAT),
            ColumnType::Date => Value::Date(Sentinels::date()),
            ColumnType::String => Value::String(String::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
            ColumnType::String => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ConfigError;

    /// Accepts the canonical names plus the usual aliases (`int`, `int64`, `float64`, `str`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "int32" | "int64" | "i64" => Ok(ColumnType::Integer),
            "float" | "float32" | "float64" | "double" | "f64" => Ok(ColumnType::Float),
            "date" | "date32" => Ok(ColumnType::Date),
            "string" | "str" | "text" | "utf8" => Ok(ColumnType::String),
            other => Err(ConfigError::UnknownColumnType(other.to_string())),
        }
    }
}

/// A single typed cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    String(String),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Date(_) => ColumnType::Date,
            Value::String(_) => ColumnType::String,
        }
    }

    /// Parse a textual default for `ty`. Used by config files and the `--column` flag.
    pub fn parse_as(ty: ColumnType, raw: &str) -> Result<Value, ConfigError> {
        let bad = || ConfigError::InvalidDefault {
            ty,
            value: raw.to_string(),
        };
        match ty {
            ColumnType::Integer => raw.trim().parse().map(Value::Integer).map_err(|_| bad()),
            ColumnType::Float => raw.trim().parse().map(Value::Float).map_err(|_| bad()),
            ColumnType::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| bad()),
            ColumnType::String => Ok(Value::String(raw.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::String(s) => f.write_str(s),
        }
    }
}

/// One declared column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    /// Required columns exclude files that lack them (precheck). Optional ones are default-filled.
    pub required: bool,
    pub default: Value,
}

impl ColumnDef {
    /// Required column with the type's sentinel default.
    pub fn required(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: ty.default_value(),
        }
    }

    /// Optional column: filled with the default when absent from a file.
    pub fn optional(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Override the default. Fails when the value's type does not match the column.
    pub fn with_default(mut self, default: Value) -> Result<Self, ConfigError> {
        if default.column_type() != self.ty {
            return Err(ConfigError::InvalidDefault {
                ty: self.ty,
                value: default.to_string(),
            });
        }
        self.default = default;
        Ok(self)
    }
}

impl FromStr for ColumnDef {
    type Err = ConfigError;

    /// `name:type[:required|:optional][=default]`. Columns are required unless marked optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (decl, default) = match s.split_once('=') {
            Some((d, v)) => (d, Some(v)),
            None => (s, None),
        };
        let mut parts = decl.split(':');
        let name = parts.next().unwrap_or_default().trim();
        let ty: ColumnType = parts
            .next()
            .ok_or_else(|| ConfigError::InvalidColumnDecl(s.to_string()))?
            .parse()?;
        let required = match parts.next().map(str::trim) {
            None | Some("required") | Some("req") => true,
            Some("optional") | Some("opt") => false,
            Some(_) => return Err(ConfigError::InvalidColumnDecl(s.to_string())),
        };
        if parts.next().is_some() {
            return Err(ConfigError::InvalidColumnDecl(s.to_string()));
        }
        let def = if required {
            ColumnDef::required(name, ty)
        } else {
            ColumnDef::optional(name, ty)
        };
        match default {
            Some(raw) => def.with_default(Value::parse_as(ty, raw)?),
            None => Ok(def),
        }
    }
}

/// Ordered set of columns. Order is output order; names are unique.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    columns: Vec<ColumnDef>,
}

impl ColumnSpec {
    /// Names are trimmed, as headers are, before the empty and duplicate checks.
    pub fn new(mut columns: Vec<ColumnDef>) -> Result<Self, ConfigError> {
        if columns.is_empty() {
            return Err(ConfigError::EmptySpec);
        }
        for c in &mut columns {
            let trimmed = c.name.trim();
            if trimmed.len() != c.name.len() {
                c.name = trimmed.to_string();
            }
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if c.name.is_empty() {
                return Err(ConfigError::EmptyColumnName);
            }
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateColumn(c.name.clone()));
            }
            if c.default.column_type() != c.ty {
                return Err(ConfigError::InvalidDefault {
                    ty: c.ty,
                    value: c.default.to_string(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Names the prechecker must find in a header.
    pub fn required_columns(&self) -> BTreeSet<String> {
        self.columns
            .iter()
            .filter(|c| c.required)
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_column_decl_variants() {
        let c: ColumnDef = "price:float64:optional=-1.5".parse().unwrap();
        assert_eq!(c.name, "price");
        assert_eq!(c.ty, ColumnType::Float);
        assert!(!c.required);
        assert_eq!(c.default, Value::Float(-1.5));

        let c: ColumnDef = "user_id:str".parse().unwrap();
        assert!(c.required);
        assert_eq!(c.default, Value::String(String::new()));

        assert!("x".parse::<ColumnDef>().is_err());
        assert!("x:blob".parse::<ColumnDef>().is_err());
        assert!("x:int:maybe".parse::<ColumnDef>().is_err());
        assert!("x:int=abc".parse::<ColumnDef>().is_err());
    }

    #[test]
    fn sentinel_defaults() {
        assert_eq!(ColumnType::Integer.default_value(), Value::Integer(-9999));
        assert_eq!(ColumnType::Float.default_value(), Value::Float(-9999.0));
        assert_eq!(
            ColumnType::Date.default_value(),
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        );
    }

    #[test]
    fn spec_rejects_duplicates_and_empty() {
        assert!(matches!(ColumnSpec::new(vec![]), Err(ConfigError::EmptySpec)));
        let dup = ColumnSpec::new(vec![
            ColumnDef::required("a", ColumnType::Integer),
            ColumnDef::optional("a", ColumnType::String),
        ]);
        assert!(matches!(dup, Err(ConfigError::DuplicateColumn(n)) if n == "a"));
    }

    #[test]
    fn spec_trims_column_names() {
        let spec = ColumnSpec::new(vec![
            ColumnDef::required(" id", ColumnType::Integer),
            ColumnDef::optional("price\t", ColumnType::Float),
        ])
        .unwrap();
        assert_eq!(spec.names().collect::<Vec<_>>(), vec!["id", "price"]);
        assert!(spec.required_columns().contains("id"));

        assert!(matches!(
            ColumnSpec::new(vec![
                ColumnDef::required("a", ColumnType::Integer),
                ColumnDef::optional(" a", ColumnType::String),
            ]),
            Err(ConfigError::DuplicateColumn(name)) if name == "a"
        ));
        assert!(matches!(
            ColumnSpec::new(vec![ColumnDef::required("  ", ColumnType::Integer)]),
            Err(ConfigError::EmptyColumnName)
        ));
    }

    #[test]
    fn required_columns_only_lists_required() {
        let spec = ColumnSpec::new(vec![
            ColumnDef::required("a", ColumnType::Integer),
            ColumnDef::optional("b", ColumnType::Float),
        ])
        .unwrap();
        assert_eq!(
            spec.required_columns().into_iter().collect::<Vec<_>>(),
            vec!["a".to_string()]
        );
    }
}

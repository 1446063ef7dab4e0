use chrono::NaiveDate;
use csvgather::engine::{glob_under, has_wildcard, is_safe_selector, is_under_root, parse_delimiter};
use csvgather::pipeline::reader::{parse_date, parse_float, parse_integer};
use csvgather::{ColumnDef, ColumnSpec, ColumnType, ConfigError, Value};
use std::path::PathBuf;

// --- is_safe_selector ---

#[test]
fn test_safe_selector_literals_and_wildcards() {
    for s in ["v1", "2023-10-01", "release_2.3", "*", "2023-10-*", "v*.final"] {
        assert!(is_safe_selector(s), "{s} should be accepted");
    }
}

#[test]
fn test_safe_selector_rejects_traversal() {
    for s in ["", ".", "..", "../etc", "a/../b", "v1..", "..v1"] {
        assert!(!is_safe_selector(s), "{s:?} should be rejected");
    }
}

#[test]
fn test_safe_selector_rejects_separators_and_absolute() {
    for s in ["/etc", "a/b", "a\\b", "C:", "~root", "v 1", "v1;rm", "v?"] {
        assert!(!is_safe_selector(s), "{s:?} should be rejected");
    }
}

#[test]
fn test_has_wildcard() {
    assert!(has_wildcard("2023-*"));
    assert!(!has_wildcard("2023-10-01"));
}

// --- is_under_root / glob_under ---

#[test]
fn test_is_under_root() {
    let root = PathBuf::from("/data/root");
    assert!(is_under_root(&PathBuf::from("/data/root/v1/a.csv"), &root));
    assert!(is_under_root(&root, &root));
    assert!(!is_under_root(&PathBuf::from("/data/rootless/a.csv"), &root));
    assert!(!is_under_root(&PathBuf::from("/etc/passwd"), &root));
}

#[test]
fn test_glob_under_keeps_tail_pattern() {
    let p = glob_under(&PathBuf::from("/data/v1"), "2023-*");
    assert!(p.ends_with("2023-*"));
    assert!(p.starts_with("/data/v1"));
}

// --- parse_delimiter ---

#[test]
fn test_parse_delimiter() {
    assert_eq!(parse_delimiter("|").unwrap(), b'|');
    assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
    assert!(matches!(
        parse_delimiter("ab"),
        Err(ConfigError::InvalidDelimiter(_))
    ));
}

// --- ColumnDef / ColumnSpec ---

#[test]
fn test_column_decl_defaults_to_required() {
    let def: ColumnDef = "id:int".parse().unwrap();
    assert_eq!(def.name, "id");
    assert_eq!(def.ty, ColumnType::Integer);
    assert!(def.required);
    assert_eq!(def.default, Value::Integer(-9999));
}

#[test]
fn test_column_decl_optional_with_default() {
    let def: ColumnDef = "day:date:optional=2020-01-31".parse().unwrap();
    assert!(!def.required);
    assert_eq!(
        def.default,
        Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap())
    );
}

#[test]
fn test_column_decl_errors() {
    assert!(matches!(
        "id".parse::<ColumnDef>(),
        Err(ConfigError::InvalidColumnDecl(_))
    ));
    assert!(matches!(
        "id:bignum".parse::<ColumnDef>(),
        Err(ConfigError::UnknownColumnType(_))
    ));
    assert!(matches!(
        "id:integer:sometimes".parse::<ColumnDef>(),
        Err(ConfigError::InvalidColumnDecl(_))
    ));
    assert!("id:integer=abc".parse::<ColumnDef>().is_err());
}

#[test]
fn test_spec_keeps_declared_order() {
    let spec = ColumnSpec::new(vec![
        ColumnDef::optional("z", ColumnType::String),
        ColumnDef::required("a", ColumnType::Float),
    ])
    .unwrap();
    assert_eq!(spec.names().collect::<Vec<_>>(), vec!["z", "a"]);
    assert_eq!(spec.required_columns().into_iter().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn test_spec_rejects_invalid() {
    assert!(matches!(ColumnSpec::new(vec![]), Err(ConfigError::EmptySpec)));
    assert!(matches!(
        ColumnSpec::new(vec![
            ColumnDef::required("a", ColumnType::Float),
            ColumnDef::optional("a", ColumnType::String),
        ]),
        Err(ConfigError::DuplicateColumn(_))
    ));
}

#[test]
fn test_default_must_match_type() {
    let err = ColumnDef::required("id", ColumnType::Integer)
        .with_default(Value::String("x".into()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDefault { .. }));
}

// --- cell parsing ---

#[test]
fn test_parse_integer() {
    assert_eq!(parse_integer("42"), Some(42));
    assert_eq!(parse_integer("-7"), Some(-7));
    assert_eq!(parse_integer("4.0"), Some(4));
    assert_eq!(parse_integer("4.5"), None);
    assert_eq!(parse_integer("abc"), None);
}

#[test]
fn test_parse_float() {
    assert_eq!(parse_float("2.5"), Some(2.5));
    assert_eq!(parse_float("1e3"), Some(1000.0));
    assert_eq!(parse_float("NaN"), None);
    assert_eq!(parse_float("inf"), None);
}

#[test]
fn test_parse_date() {
    let d = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
    assert_eq!(parse_date("2023-10-01"), Some(d));
    assert_eq!(parse_date("2023/10/01"), Some(d));
    assert_eq!(parse_date("20231001"), Some(d));
    assert_eq!(parse_date("2023-10-01 12:30:00"), Some(d));
    assert_eq!(parse_date("2023-10-01T12:30:00+02:00"), Some(d));
    assert_eq!(parse_date("10/01/2023"), None);
}

//! Load `.csvgather.toml` (CLI only). The library never reads it; callers build `Opts` and
//! `GatherRequest` themselves.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::cli::RunConfig;
use crate::engine::tools::parse_delimiter;
use crate::error::ConfigError;
use crate::schema::{ColumnDef, ColumnType, Value};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GatherToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    versions: Option<Vec<String>>,
    dates: Option<Vec<String>>,
    subfolder: Option<String>,
    threads: Option<usize>,
    batch_size: Option<usize>,
    timeout: Option<f64>,
    delimiter: Option<String>,
    output: Option<String>,
    json: Option<bool>,
    verbose: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    name: String,
    #[serde(rename = "type")]
    ty: ColumnType,
    #[serde(default = "required_by_default")]
    required: bool,
    default: Option<toml::Value>,
}

fn required_by_default() -> bool {
    true
}

impl ColumnEntry {
    fn to_def(&self, path: &Path) -> Result<ColumnDef, ConfigError> {
        let def = if self.required {
            ColumnDef::required(self.name.as_str(), self.ty)
        } else {
            ColumnDef::optional(self.name.as_str(), self.ty)
        };
        let Some(raw) = &self.default else {
            return Ok(def);
        };
        let raw = match raw {
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Datetime(d) => d.to_string(),
            other => {
                return Err(ConfigError::InvalidConfigFile {
                    path: path.to_path_buf(),
                    message: format!("column {:?}: unsupported default {}", self.name, other),
                });
            }
        };
        def.with_default(Value::parse_as(self.ty, &raw)?)
    }
}

/// Load a config file. Missing file is `Ok(None)`; unreadable or malformed is an error.
pub(crate) fn load_gather_toml(path: &Path) -> Result<Option<GatherToml>, ConfigError> {
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::InvalidConfigFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };
    toml::from_str(&s)
        .map(Some)
        .map_err(|e| ConfigError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $cfg:expr, $sec_field:ident => $($cfg_field:ident).+) => {
        if let Some(ref v) = $sec.$sec_field {
            $cfg.$($cfg_field).+ = v.clone();
        }
    };
}

/// Apply file config (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_config(
    file: &GatherToml,
    path: &Path,
    cfg: &mut RunConfig,
) -> Result<(), ConfigError> {
    let sec = &file.settings;
    apply_file_opt!(sec, cfg, versions => versions);
    apply_file_opt!(sec, cfg, dates => dates);
    apply_file_opt!(sec, cfg, subfolder => subfolder);
    apply_file_opt!(sec, cfg, batch_size => opts.batch_size);
    apply_file_opt!(sec, cfg, json => json);
    apply_file_opt!(sec, cfg, verbose => verbose);
    if let Some(n) = sec.threads {
        cfg.opts.num_threads = Some(n);
    }
    if let Some(secs) = sec.timeout {
        cfg.opts.read_timeout = Some(timeout_from_secs(secs)?);
    }
    if let Some(ref d) = sec.delimiter {
        cfg.opts.delimiter = parse_delimiter(d)?;
    }
    if let Some(ref o) = sec.output {
        cfg.output = Some(PathBuf::from(o));
    }
    if !file.columns.is_empty() {
        cfg.columns = file
            .columns
            .iter()
            .map(|c| c.to_def(path))
            .collect::<Result<_, _>>()?;
    }
    Ok(())
}

/// Seconds from config or flags. Must be positive and finite.
pub(crate) fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or(ConfigError::InvalidTimeout(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[settings]
versions = ["v1", "v*"]
dates = ["2023-10-*"]
subfolder = "zone"
batch_size = 10
timeout = 1.5
delimiter = ";"

[[columns]]
name = "id"
type = "integer"

[[columns]]
name = "price"
type = "float"
required = false
default = 0.5
"#;

    #[test]
    fn file_values_apply() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".csvgather.toml");
        fs::write(&path, SAMPLE).unwrap();

        let file = load_gather_toml(&path).unwrap().unwrap();
        let mut cfg = RunConfig::default();
        apply_file_to_config(&file, &path, &mut cfg).unwrap();

        assert_eq!(cfg.versions, vec!["v1", "v*"]);
        assert_eq!(cfg.subfolder, "zone");
        assert_eq!(cfg.opts.batch_size, 10);
        assert_eq!(cfg.opts.delimiter, b';');
        assert_eq!(cfg.opts.read_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.columns.len(), 2);
        assert!(cfg.columns[0].required);
        assert!(!cfg.columns[1].required);
        assert_eq!(cfg.columns[1].default, Value::Float(0.5));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(
            load_gather_toml(&dir.path().join("nope.toml"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[[columns]]\nname = \"id\"\ntype = \"decimal\"\n").unwrap();
        assert!(matches!(
            load_gather_toml(&path),
            Err(ConfigError::InvalidConfigFile { .. })
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(timeout_from_secs(0.0).is_err());
        assert!(timeout_from_secs(-1.0).is_err());
        assert!(timeout_from_secs(f64::NAN).is_err());
    }
}

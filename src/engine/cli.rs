//! CLI handler: layer defaults, config file and flags, run the pipeline, write the merged table.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::tools::parse_delimiter;
use crate::error::ConfigError;
use crate::schema::{ColumnDef, ColumnSpec};
use crate::utils::config::{DEFAULT_SUBFOLDER, PackagePaths};
use crate::utils::gather_toml::{apply_file_to_config, load_gather_toml, timeout_from_secs};
use crate::utils::setup_logging;
use crate::{GatherRequest, Opts, RunSummary, gather};

/// Effective settings for one CLI run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub versions: Vec<String>,
    pub dates: Vec<String>,
    pub subfolder: String,
    pub columns: Vec<ColumnDef>,
    pub opts: Opts,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
            dates: Vec::new(),
            subfolder: DEFAULT_SUBFOLDER.to_string(),
            columns: Vec::new(),
            opts: Opts::default(),
            output: None,
            json: false,
            verbose: false,
        }
    }
}

/// Flags override whatever the file set.
fn apply_cli_to_config(cli: &Cli, cfg: &mut RunConfig) -> Result<(), ConfigError> {
    if !cli.versions.is_empty() {
        cfg.versions = cli.versions.clone();
    }
    if !cli.dates.is_empty() {
        cfg.dates = cli.dates.clone();
    }
    if let Some(ref s) = cli.subfolder {
        cfg.subfolder = s.clone();
    }
    if !cli.columns.is_empty() {
        cfg.columns = cli.columns.clone();
    }
    if let Some(n) = cli.threads {
        cfg.opts.num_threads = Some(n);
    }
    if let Some(b) = cli.batch_size {
        cfg.opts.batch_size = b;
    }
    if let Some(secs) = cli.timeout {
        cfg.opts.read_timeout = Some(timeout_from_secs(secs)?);
    }
    if let Some(ref d) = cli.delimiter {
        cfg.opts.delimiter = parse_delimiter(d)?;
    }
    if let Some(ref o) = cli.output {
        cfg.output = Some(o.clone());
    }
    if let Some(j) = cli.json {
        cfg.json = j;
    }
    if let Some(v) = cli.verbose {
        cfg.verbose = v;
    }
    Ok(())
}

/// Defaults, then the config file (`--config`, or `.csvgather.toml` in ROOT when present), then flags.
pub fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut cfg = RunConfig::default();
    let (path, explicit) = match cli.config {
        Some(ref p) => (p.clone(), true),
        None => (cli.root.join(PackagePaths::get().config_filename()), false),
    };
    match load_gather_toml(&path)? {
        Some(file) => apply_file_to_config(&file, &path, &mut cfg)?,
        None if explicit => {
            return Err(ConfigError::InvalidConfigFile {
                path,
                message: "file not found".to_string(),
            }
            .into());
        }
        None => {}
    }
    apply_cli_to_config(cli, &mut cfg)?;
    cfg.opts.progress = cfg.verbose;
    Ok(cfg)
}

/// Ctrl+C sets the returned flag; the pipeline stops waiting and abandons in-flight reads.
fn install_cancel_handler() -> Result<Arc<AtomicBool>> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel_requested)
}

fn report_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    info!(
        "Files: {} found, {} validated, {} read, {} failed ({} timed out)",
        summary.files_found,
        summary.files_validated,
        summary.files_read,
        summary.files_failed,
        summary.files_timed_out
    );
    debug!(
        "Workers: {} | chunks compacted: {}",
        summary.workers, summary.chunks_compacted
    );
    Ok(())
}

/// Gather ROOT per the layered config, write `--output` if given, report the summary.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let mut cfg = resolve_config(cli)?;
    setup_logging(cfg.verbose);
    cfg.opts.cancel = Some(install_cancel_handler()?);

    let spec = ColumnSpec::new(cfg.columns.clone())?;
    let request = GatherRequest::new(
        cli.root.clone(),
        cfg.versions.clone(),
        cfg.dates.clone(),
        spec,
    )
    .with_subfolder(cfg.subfolder.clone());
    debug!("Gathering from {}", cli.root.display());

    let gathered = gather(&request, &cfg.opts)?;
    match cfg.output {
        Some(ref out) => {
            let written = gathered
                .table
                .write_csv(out, cfg.opts.delimiter)
                .with_context(|| format!("write {}", out.display()))?;
            info!("Wrote {} rows to {}", written, out.display());
        }
        None if gathered.table.num_rows() > 0 => {
            warn!("No --output given; merged table was not written.");
        }
        None => {}
    }
    report_summary(&gathered.summary, cfg.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn flags_override_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".csvgather.toml"),
            "[settings]\nversions = [\"v1\"]\nbatch_size = 5\ntimeout = 3.0\n\n[[columns]]\nname = \"id\"\ntype = \"integer\"\n",
        )
        .unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["csvgather", root.as_str(), "-V", "v2", "-b", "7"]).unwrap();

        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cfg.versions, vec!["v2"]);
        assert_eq!(cfg.opts.batch_size, 7);
        assert_eq!(cfg.opts.read_timeout, Some(Duration::from_secs(3)));
        assert_eq!(cfg.columns.len(), 1);
        assert_eq!(cfg.subfolder, DEFAULT_SUBFOLDER);
    }

    #[test]
    fn explicit_missing_config_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml").to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["csvgather", "--config", missing.as_str()]).unwrap();
        let err = resolve_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidConfigFile { .. })
        ));
    }
}

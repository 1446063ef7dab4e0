//! csvgather: parallel, schema-validated CSV ingestion over `root/<version>/<date>/<subfolder>/` trees

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{ConfigError, GatherError, PrecheckError, ReadError};
pub use pipeline::{LogObserver, Pipeline, PipelineObserver};
pub use schema::{ColumnDef, ColumnSpec, ColumnType, Value};
pub use table::{Column, Table};

use log::debug;

/// Result alias used by public csvgather API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: resolve, validate, read and merge every CSV `request` selects.
///
/// Per-file problems (missing required columns, unreadable files, timeouts) are logged and
/// counted in [`RunSummary`]; they never fail the run. Errors are limited to configuration
/// problems ([`ConfigError`], downcastable from the returned error) and cancellation
/// ([`GatherError::Cancelled`]).
///
/// ```ignore
/// let spec = ColumnSpec::new(vec![
///     ColumnDef::required("id", ColumnType::Integer),
///     ColumnDef::optional("price", ColumnType::Float),
/// ])?;
/// let request = GatherRequest::new("/data", vec!["v1".into()], vec!["2023-10-*".into()], spec);
/// let gathered = csvgather::gather(&request, &Opts::default())?;
/// println!("{} rows", gathered.table.num_rows());
/// ```
pub fn gather(request: &GatherRequest, opts: &Opts) -> Result<Gathered> {
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);

    Pipeline::new(opts.clone()).run(request)
}

/// Like [`gather`], reporting per-file events to `observer` instead of the log.
pub fn gather_with_observer(
    request: &GatherRequest,
    opts: &Opts,
    observer: std::sync::Arc<dyn PipelineObserver>,
) -> Result<Gathered> {
    Pipeline::new(opts.clone())
        .with_observer(observer)
        .run(request)
}

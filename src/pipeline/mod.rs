//! Pipeline components: resolve, precheck, typed read, bounded merge, orchestration.

pub mod context;
pub mod error_handler;
pub mod merge;
pub mod observer;
pub mod orchestrator;
pub mod precheck;
pub mod reader;
pub mod resolve;
pub mod workers;

pub use context::{MergeSettings, ReadTask, WorkerEvent};
pub use error_handler::report_failures;
pub use merge::{BatchBuffer, MergeOutcome, MergeStats, merge_all, precheck_all};
pub use observer::{LogObserver, PipelineObserver};
pub use orchestrator::Pipeline;
pub use precheck::{HeaderCheck, has_required_columns, inspect_header};
pub use reader::{read_typed, read_typed_with};
pub use resolve::{PathResolver, SelectorLevel, resolve};
pub use workers::ReaderPool;

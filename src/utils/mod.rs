pub mod config;
pub mod fd_limit;
pub(crate) mod gather_toml;
pub mod logger;
pub mod memory;

pub use config::*;
pub use fd_limit::{FDS_PER_READER, cap_by_fd_limit, max_open_fds, max_readers_by_fd_limit};
pub use logger::setup_logging;
pub use memory::{current_rss_bytes, format_delta};

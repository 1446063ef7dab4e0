//! Header-only schema check. Reads the first record and nothing else.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::PrecheckError;
use crate::utils::config::DEFAULT_DELIMITER;

/// Small buffer: only the header line is needed.
const HEADER_BUF_CAPACITY: usize = 8 * 1024;

/// Outcome of inspecting one header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderCheck {
    /// Every required column is present.
    Qualified,
    /// File is empty or its header has no fields.
    Empty,
    /// Header lacks these required columns (sorted).
    Missing(Vec<String>),
}

impl HeaderCheck {
    pub fn is_qualified(&self) -> bool {
        matches!(self, HeaderCheck::Qualified)
    }
}

/// Normalize a header field: trim whitespace and a leading UTF-8 BOM.
pub fn normalize_header(name: &str) -> &str {
    name.trim_start_matches('\u{feff}').trim()
}

/// Read the header of `path` and compare it with `required`.
/// Anything but a regular file is refused before opening: a FIFO would block the open.
pub fn inspect_header(
    path: &Path,
    required: &BTreeSet<String>,
    delimiter: u8,
) -> Result<HeaderCheck, PrecheckError> {
    let meta = std::fs::metadata(path).map_err(|source| PrecheckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.is_file() {
        return Err(PrecheckError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| PrecheckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(BufReader::with_capacity(HEADER_BUF_CAPACITY, file));
    let headers = rdr.byte_headers().map_err(|source| PrecheckError::Header {
        path: path.to_path_buf(),
        source,
    })?;
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Ok(HeaderCheck::Empty);
    }
    let present: BTreeSet<String> = headers
        .iter()
        .map(|h| normalize_header(&String::from_utf8_lossy(h)).to_string())
        .collect();
    let missing: Vec<String> = required.difference(&present).cloned().collect();
    if missing.is_empty() {
        Ok(HeaderCheck::Qualified)
    } else {
        Ok(HeaderCheck::Missing(missing))
    }
}

/// True when the header of `path` names every column in `required`.
/// Empty, unreadable or malformed files are `false`, never an error.
pub fn has_required_columns(path: &Path, required: &BTreeSet<String>) -> bool {
    inspect_header(path, required, DEFAULT_DELIMITER).is_ok_and(|c| c.is_qualified())
}

/// Failure-isolated precheck result for one candidate.
#[derive(Debug)]
pub enum PrecheckOutcome {
    Qualified(PathBuf),
    Rejected(PathBuf, HeaderCheck),
    Failed(PrecheckError),
}

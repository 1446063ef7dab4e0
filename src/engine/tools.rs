//! Path and selector utilities

use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Wildcard marker accepted in selectors.
pub const WILDCARD: char = '*';

/// True if `c` may appear in a selector: `[A-Za-z0-9_.-*]`.
fn is_selector_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | WILDCARD)
}

/// Safety check applied to every selector before any filesystem call uses it.
/// Rejects empty, absolute, multi-component and parent-directory selectors and any character
/// outside `[A-Za-z0-9_.-*]`.
pub fn is_safe_selector(selector: &str) -> bool {
    if selector.is_empty() || selector == "." || selector.contains("..") {
        return false;
    }
    if !selector.chars().all(is_selector_char) {
        return false;
    }
    let mut comps = Path::new(selector).components();
    matches!(
        (comps.next(), comps.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn has_wildcard(selector: &str) -> bool {
    selector.contains(WILDCARD)
}

/// True if `path` is `root` or lies beneath it. Both must already be canonical.
pub fn is_under_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Canonicalize the root; it must exist and be a directory.
pub fn check_root_and_canonicalize(root: &Path) -> Result<PathBuf, ConfigError> {
    let canonical = root
        .canonicalize()
        .map_err(|source| ConfigError::UnreadableRoot {
            path: root.to_path_buf(),
            source,
        })?;
    if !canonical.is_dir() {
        return Err(ConfigError::RootNotDirectory(canonical));
    }
    std::fs::read_dir(&canonical).map_err(|source| ConfigError::UnreadableRoot {
        path: canonical.clone(),
        source,
    })?;
    Ok(canonical)
}

/// Glob pattern for `dir/<tail>` with `dir` escaped, so only `tail` can contain metacharacters.
pub fn glob_under(dir: &Path, tail: &str) -> String {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let sep = std::path::MAIN_SEPARATOR;
    if escaped.ends_with(sep) {
        format!("{escaped}{tail}")
    } else {
        format!("{escaped}{sep}{tail}")
    }
}

/// Field delimiter from a flag or config value: one ASCII character, or `tab` / `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    if matches!(raw, "tab" | "\\t" | "\t") {
        return Ok(b'\t');
    }
    let mut bytes = raw.bytes();
    match (bytes.next(), bytes.next()) {
        (Some(b), None) if b.is_ascii() && b != b'\n' && b != b'"' => Ok(b),
        _ => Err(ConfigError::InvalidDelimiter(raw.to_string())),
    }
}

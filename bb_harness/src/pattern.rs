//! File selection for analyze-only mode.
//!
//! A pattern is a directory followed by a file-name pattern, e.g.
//! `output/*p3*`. Only the file-name part may contain wildcards: `*` matches
//! any run of characters and `?` exactly one. As with shell globs, a leading
//! `.` must be matched explicitly.

use crate::error::{HarnessError, HarnessResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Whether `name` matches the wildcard `pattern`.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    if name.starts_with('.') && !pattern.starts_with('.') {
        return false;
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Position of the last `*` and the name index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p).copied() {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some('?') => {
                p += 1;
                n += 1;
            }
            Some(c) if c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    n = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Files matching `pattern`, sorted by path.
///
/// A missing directory yields no files.
pub fn expand(pattern: &str) -> HarnessResult<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(file_pattern) = path.file_name().and_then(|f| f.to_str()) else {
        return Ok(Vec::new());
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| HarnessError::io(dir, e))? {
        let entry = entry.map_err(|e| HarnessError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if entry.path().is_file() && wildcard_match(file_pattern, name) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

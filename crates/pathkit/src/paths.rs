// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Path normalization, splitting and existence-checked resolution.
//!
//! Every function here accepts the stream sentinels [`STDOUT`] and
//! [`STDERR`] in place of a real path and passes them through without
//! touching the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./paths_test.rs"]
mod paths_test;

/// Placeholder for standard output (or standard input, depending on access).
pub const STDOUT: &str = "-";

/// Placeholder for standard input.
pub const STDIN: &str = STDOUT;

/// Placeholder for standard error.
pub const STDERR: &str = "_";

/// Separator between a file name and its extensions.
pub const EXTENSION_SEPARATOR: char = '.';

/// Check whether `path` is one of the stream sentinels.
pub fn is_stream_sentinel<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path == Path::new(STDOUT) || path == Path::new(STDERR)
}

/// Return the fully resolved form of `path`.
///
/// A leading `~` is expanded to the current user's home directory and
/// `~name` to the home directory of user `name`; an unknown user leaves the
/// path as it is. Relative paths are joined to the current directory and
/// `.`/`..` segments are folded away. Symlinks are not followed.
pub fn abspath<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if is_stream_sentinel(path) {
        return Ok(path.to_path_buf());
    }

    let expanded = expand_home(path)?;
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };
    Ok(normalize_lexically(&absolute))
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    let Some(Component::Normal(first)) = components.next() else {
        return Ok(path.to_path_buf());
    };
    let Some(user) = first.to_str().and_then(|s| s.strip_prefix('~')) else {
        return Ok(path.to_path_buf());
    };

    let home = if user.is_empty() {
        dirs::home_dir().ok_or(Error::NoHomeDir)?
    } else {
        match nix::unistd::User::from_name(user) {
            Ok(Some(entry)) => entry.dir,
            Ok(None) => return Ok(path.to_path_buf()),
            Err(errno) => {
                tracing::trace!(user, %errno, "user lookup failed");
                return Ok(path.to_path_buf());
            }
        }
    };
    Ok(home.join(components.as_path()))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// A path broken into its parent directory, base name and extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPath {
    pub parent: PathBuf,
    pub name: String,
    pub extensions: Vec<String>,
}

impl SplitPath {
    /// Number of parts, counting parent and name. Always at least 2.
    pub fn part_count(&self) -> usize {
        2 + self.extensions.len()
    }

    /// True when the name carries at least one extension.
    pub fn has_extensions(&self) -> bool {
        !self.extensions.is_empty()
    }
}

/// Split `path` into parent directory, name and extensions.
///
/// The base name is split on [`EXTENSION_SEPARATOR`]; the first piece is the
/// name and the rest are extensions. With `keep_seps` each extension keeps
/// its leading separator (`".gz"` rather than `"gz"`). With `resolve` the
/// path is first passed through [`abspath`].
pub fn split_path<P: AsRef<Path>>(path: P, keep_seps: bool, resolve: bool) -> Result<SplitPath> {
    let path = if resolve {
        abspath(path)?
    } else {
        path.as_ref().to_path_buf()
    };

    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts = base.split(EXTENSION_SEPARATOR);
    let name = parts.next().unwrap_or_default().to_string();
    let extensions = parts
        .map(|ext| {
            if keep_seps {
                format!("{EXTENSION_SEPARATOR}{ext}")
            } else {
                ext.to_string()
            }
        })
        .collect();

    Ok(SplitPath {
        parent,
        name,
        extensions,
    })
}

/// Return just the name part of `path`, without directory or extensions.
pub fn filename<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(split_path(path, true, true)?.name)
}

/// Resolve `path` and make sure it exists.
///
/// A relative `path` is joined to `parent` when one is given.
pub fn resolve_path<P: AsRef<Path>>(path: P, parent: Option<&Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if is_stream_sentinel(path) {
        return Ok(path.to_path_buf());
    }

    let resolved = match parent {
        Some(parent) => abspath(abspath(parent)?.join(path))?,
        None => abspath(path)?,
    };

    if !resolved.exists() {
        return Err(Error::NotFound(resolved));
    }
    Ok(resolved)
}

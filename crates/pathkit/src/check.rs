// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Checks that a path exists, has the right type and allows some access.
//!
//! Each check has a `safe_` twin that reports a missing, mistyped or
//! inaccessible path as `Ok(None)` instead of an error. Errors caused by
//! the caller, such as an invalid mode, are still returned.

use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use crate::access::{Access, check_access};
use crate::paths::{abspath, is_stream_sentinel, resolve_path};
use crate::{Error, NodeType, Result};

#[cfg(test)]
#[path = "./check_test.rs"]
mod check_test;

/// Resolve `path` and check its type and access.
///
/// A stream sentinel counts as a file.
pub fn check_path<P: AsRef<Path>>(
    path: P,
    kind: Option<NodeType>,
    access: Option<Access>,
) -> Result<PathBuf> {
    let path = resolve_path(path, None)?;
    if let Some(kind) = kind {
        if !is_kind(&path, kind) {
            return Err(Error::WrongType {
                path,
                expected: kind,
            });
        }
    }
    if let Some(access) = access {
        check_access(&path, access)?;
    }
    Ok(path)
}

fn is_kind(path: &Path, kind: NodeType) -> bool {
    match kind {
        NodeType::File => is_stream_sentinel(path) || path.is_file(),
        NodeType::Dir => path.is_dir(),
        NodeType::Fifo => std::fs::metadata(path).is_ok_and(|m| m.file_type().is_fifo()),
    }
}

/// Check that `path` is an existing, readable file.
pub fn check_readable_file<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    check_path(path, Some(NodeType::File), Some(Access::Read))
}

/// Check that `path` can be written.
///
/// An existing path must be a writable file. Otherwise its directory must
/// be writable; a missing directory is created when `mkdirs` is set.
pub fn check_writable_file<P: AsRef<Path>>(path: P, mkdirs: bool) -> Result<PathBuf> {
    let path = path.as_ref();
    if is_stream_sentinel(path) {
        check_access(path, Access::Write)?;
        return Ok(path.to_path_buf());
    }
    if path.exists() {
        return check_path(path, Some(NodeType::File), Some(Access::Write));
    }

    let path = abspath(path)?;
    let Some(dir) = path.parent() else {
        return Err(Error::NotFound(path.clone()));
    };
    if dir.exists() {
        check_path(dir, Some(NodeType::Dir), Some(Access::Write))?;
    } else if mkdirs {
        tracing::debug!(?dir, "creating missing directories");
        std::fs::create_dir_all(dir).map_err(|e| match e.kind() {
            // some component of `dir` is a regular file
            std::io::ErrorKind::NotADirectory | std::io::ErrorKind::AlreadyExists => {
                Error::WrongType {
                    path: dir.to_path_buf(),
                    expected: NodeType::Dir,
                }
            }
            _ => Error::from_io(dir, e),
        })?;
    } else {
        return Err(Error::NotFound(dir.to_path_buf()));
    }
    Ok(path)
}

fn safe<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_environmental() => {
            tracing::trace!(%err, "check failed");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Like [`check_path`], but a failed check gives `Ok(None)`.
pub fn safe_check_path<P: AsRef<Path>>(
    path: P,
    kind: Option<NodeType>,
    access: Option<Access>,
) -> Result<Option<PathBuf>> {
    safe(check_path(path, kind, access))
}

/// Like [`check_readable_file`], but a failed check gives `Ok(None)`.
pub fn safe_check_readable_file<P: AsRef<Path>>(path: P) -> Result<Option<PathBuf>> {
    safe(check_readable_file(path))
}

/// Like [`check_writable_file`], but a failed check gives `Ok(None)`.
pub fn safe_check_writable_file<P: AsRef<Path>>(path: P, mkdirs: bool) -> Result<Option<PathBuf>> {
    safe(check_writable_file(path, mkdirs))
}

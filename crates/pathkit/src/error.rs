// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for pathkit operations.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::NodeType;

#[cfg(test)]
#[path = "./error_test.rs"]
mod error_test;

/// Convenience Result type with pathkit Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during pathkit operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Path does not exist on disk
    #[error("{0:?} does not exist")]
    #[diagnostic(code(pathkit::not_found))]
    NotFound(PathBuf),

    /// Path exists but is the wrong kind of node
    #[error("{path:?} is not a {expected}")]
    #[diagnostic(code(pathkit::wrong_type))]
    WrongType { path: PathBuf, expected: NodeType },

    /// OS denied access, or a stream sentinel was used with a disallowed mode
    #[error("{path:?} is not accessible: {reason}")]
    #[diagnostic(code(pathkit::permission_denied))]
    PermissionDenied { path: PathBuf, reason: String },

    /// Mode string without any recognized access character
    #[error("{0:?} does not contain a valid access mode")]
    #[diagnostic(
        code(pathkit::invalid_mode),
        help("Use one or more of 'r', 'w', 'a' or 'x'")
    )]
    InvalidMode(String),

    /// Unrecognized character in a permission mode string
    #[error("Invalid mode character {0:?}")]
    #[diagnostic(
        code(pathkit::invalid_mode_char),
        help("Permission modes may only contain 'r', 'w', 'a' and 'x'")
    )]
    InvalidModeChar(char),

    /// Unknown node type string
    #[error("Invalid node type {0:?}")]
    #[diagnostic(
        code(pathkit::invalid_node_type),
        help("Use one of 'f', 'file', 'd', 'dir' or 'fifo'")
    )]
    InvalidNodeType(String),

    /// Contents were given for a directory or named pipe
    #[error("'contents' only valid for files, not a {0}")]
    #[diagnostic(code(pathkit::contents_for_non_file))]
    ContentsForNonFile(NodeType),

    /// Name pattern could not be compiled
    #[error("Invalid name pattern")]
    #[diagnostic(code(pathkit::invalid_pattern))]
    InvalidPattern(#[from] regex::Error),

    /// API misuse, such as querying a descriptor before it was attached
    #[error("{0}")]
    #[diagnostic(code(pathkit::usage))]
    Usage(String),

    /// `~` was used but no home directory is known
    #[error("Cannot resolve ~ without HOME")]
    #[diagnostic(code(pathkit::no_home_dir))]
    NoHomeDir,

    /// Node name, prefix or suffix that would leave its parent directory
    #[error("Invalid node name {0:?}")]
    #[diagnostic(
        code(pathkit::invalid_name),
        help("Names must be a single path component, and affixes may not contain '/'")
    )]
    InvalidName(String),

    /// Failed to create a node
    #[error("Failed to create {path:?}")]
    #[diagnostic(code(pathkit::create_failed))]
    CreateFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to remove a temporary root
    #[error("Failed to remove {path:?}")]
    #[diagnostic(code(pathkit::remove_failed))]
    RemoveFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Invalid YAML in a layout file
    #[error("Invalid layout file: {error}")]
    #[diagnostic(
        code(pathkit::invalid_yaml),
        help("Check YAML syntax and ensure 'api: pathkit/v0' is present")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(pathkit::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(pathkit::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for conditions of the filesystem rather than of the caller.
    ///
    /// These are the errors that the `safe_*` checks turn into `None`.
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::WrongType { .. } | Error::PermissionDenied { .. }
        )
    }

    /// Classify an io error raised while creating or modifying `path`.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                path: path.to_path_buf(),
                reason: error.to_string(),
            },
            _ => Error::CreateFailed {
                path: path.to_path_buf(),
                error,
            },
        }
    }
}

// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Search a directory for entries whose names match a pattern.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use walkdir::WalkDir;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./find_test.rs"]
mod find_test;

/// Which kinds of entries [`find`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FindTypes {
    #[default]
    Files,
    Dirs,
    Both,
}

impl FindTypes {
    fn wants_dirs(self) -> bool {
        self != FindTypes::Files
    }

    fn wants_files(self) -> bool {
        self != FindTypes::Dirs
    }
}

impl FromStr for FindTypes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f" => Ok(FindTypes::Files),
            "d" => Ok(FindTypes::Dirs),
            "fd" | "df" => Ok(FindTypes::Both),
            other => Err(Error::InvalidNodeType(other.to_string())),
        }
    }
}

/// Find entries under `root` whose names match `pattern`.
///
/// The pattern must match at the start of the name. Anything that is not
/// a directory counts as a file. Entries that cannot be read are skipped.
pub fn find<P: AsRef<Path>>(
    root: P,
    pattern: &str,
    types: FindTypes,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let pattern = Regex::new(&format!("^(?:{pattern})"))?;
    Ok(find_matching(root, &pattern, types, recursive))
}

/// Same as [`find`] with an already compiled pattern.
pub fn find_matching<P: AsRef<Path>>(
    root: P,
    pattern: &Regex,
    types: FindTypes,
    recursive: bool,
) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root.as_ref())
        .min_depth(1)
        .sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::trace!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| {
            if entry.file_type().is_dir() {
                types.wants_dirs()
            } else {
                types.wants_files()
            }
        })
        .filter(|entry| {
            pattern
                .find(&entry.file_name().to_string_lossy())
                .is_some_and(|m| m.start() == 0)
        })
        .map(|entry| entry.into_path())
        .collect()
}

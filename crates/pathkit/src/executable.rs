// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::access::Access;
use crate::check::safe_check_path;
use crate::{NodeType, Result};

#[cfg(test)]
#[path = "./executable_test.rs"]
mod executable_test;

/// Looks up executables on a search path and remembers the answers.
///
/// Results are keyed by the base name of the requested executable, and
/// misses are remembered as well as hits. Call [`ExecutableCache::clear`]
/// after the search path contents change.
#[derive(Debug, Default)]
pub struct ExecutableCache {
    paths: HashMap<String, Option<PathBuf>>,
    search_path: Option<Vec<PathBuf>>,
}

impl ExecutableCache {
    /// A cache that searches the directories in `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that searches only the given directories.
    pub fn with_search_path<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: HashMap::new(),
            search_path: Some(dirs.into_iter().map(Into::into).collect()),
        }
    }

    /// Find the full path of `executable`.
    ///
    /// If `executable` is itself an executable file it is returned as an
    /// absolute path. Otherwise each search directory is tried in order.
    pub fn get_executable_path<P: AsRef<Path>>(&mut self, executable: P) -> Result<Option<PathBuf>> {
        let executable = executable.as_ref();
        let key = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| executable.to_string_lossy().into_owned());
        if let Some(found) = self.paths.get(&key) {
            return Ok(found.clone());
        }

        let mut found = check_executable(executable)?;
        if found.is_none() {
            for dir in self.search_dirs() {
                found = check_executable(&dir.join(executable))?;
                if found.is_some() {
                    break;
                }
            }
        }
        tracing::trace!(executable = %key, ?found, "executable lookup");
        self.paths.insert(key, found.clone());
        Ok(found)
    }

    /// Forget all cached lookups.
    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if let Some(dirs) = &self.search_path {
            return dirs.clone();
        }
        let Some(path) = std::env::var_os("PATH") else {
            return Vec::new();
        };
        std::env::split_paths(&path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| {
                let dir = dir.to_string_lossy();
                PathBuf::from(dir.trim_matches('"'))
            })
            .collect()
    }
}

fn check_executable(path: &Path) -> Result<Option<PathBuf>> {
    safe_check_path(path, Some(NodeType::File), Some(Access::Execute))
}

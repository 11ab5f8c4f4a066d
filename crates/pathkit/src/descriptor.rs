// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Declarations of files, directories and named pipes to be created
//! inside a [`TempTree`](crate::TempTree).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nix::sys::stat::Mode;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./descriptor_test.rs"]
mod descriptor_test;

/// Random characters in a generated node name.
const NAME_RANDOM_LEN: usize = 8;

/// The kind of filesystem node a descriptor creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NodeType {
    #[default]
    #[serde(rename = "file", alias = "f")]
    File,
    #[serde(rename = "dir", alias = "d")]
    Dir,
    #[serde(rename = "fifo")]
    Fifo,
}

impl FromStr for NodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f" | "file" => Ok(NodeType::File),
            "d" | "dir" => Ok(NodeType::Dir),
            "fifo" => Ok(NodeType::Fifo),
            other => Err(Error::InvalidNodeType(other.to_string())),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeType::File => "file",
            NodeType::Dir => "directory",
            NodeType::Fifo => "named pipe",
        };
        f.write_str(name)
    }
}

/// Index of a descriptor within the tree that declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub(crate) usize);

impl DescriptorId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a descriptor lives once it belongs to a tree.
#[derive(Debug, Clone)]
struct Attachment {
    root: PathBuf,
    /// Relative path of the enclosing directory, `None` at the root.
    base: Option<PathBuf>,
}

/// Describes one node of a temporary tree before it exists on disk.
///
/// Descriptors are plain declarations until a tree attaches and
/// materializes them; their paths are only known after attachment.
#[derive(Debug, Clone)]
pub struct PathDescriptor {
    name: Option<String>,
    parent: Option<DescriptorId>,
    mode: Option<String>,
    prefix: String,
    suffix: String,
    contents: Option<Vec<u8>>,
    node_type: NodeType,
    attachment: Option<Attachment>,
    relative_path: OnceCell<PathBuf>,
    absolute_path: OnceCell<PathBuf>,
    materialized: bool,
}

impl PathDescriptor {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            name: None,
            parent: None,
            mode: None,
            prefix: String::new(),
            suffix: String::new(),
            contents: None,
            node_type,
            attachment: None,
            relative_path: OnceCell::new(),
            absolute_path: OnceCell::new(),
            materialized: false,
        }
    }

    pub fn file() -> Self {
        Self::new(NodeType::File)
    }

    pub fn dir() -> Self {
        Self::new(NodeType::Dir)
    }

    pub fn fifo() -> Self {
        Self::new(NodeType::Fifo)
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Place this node inside the directory declared as `parent`.
    pub fn parent(mut self, parent: DescriptorId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Initial contents. Only files may have contents.
    pub fn contents<C: Into<Vec<u8>>>(mut self, contents: C) -> Result<Self> {
        if self.node_type != NodeType::File {
            return Err(Error::ContentsForNonFile(self.node_type));
        }
        self.contents = Some(contents.into());
        Ok(self)
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_parent(&self) -> Option<DescriptorId> {
        self.parent
    }

    pub fn get_mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    pub fn get_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get_suffix(&self) -> &str {
        &self.suffix
    }

    pub fn get_contents(&self) -> Option<&[u8]> {
        self.contents.as_deref()
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    pub(crate) fn inherit_mode(&mut self, mode: &str) {
        if self.mode.is_none() {
            self.mode = Some(mode.to_string());
        }
    }

    /// Bind this descriptor to the tree rooted at `root`.
    ///
    /// `base` is the relative path of the enclosing directory, if any.
    /// An unset mode becomes `default_mode`.
    pub(crate) fn attach(
        &mut self,
        root: &Path,
        default_mode: &str,
        base: Option<&Path>,
    ) -> Result<()> {
        if let Some(existing) = &self.attachment {
            if existing.root != root {
                return Err(Error::Usage(format!(
                    "descriptor is already attached to {:?}",
                    existing.root
                )));
            }
        }
        self.attachment = Some(Attachment {
            root: root.to_path_buf(),
            base: base.map(Path::to_path_buf),
        });
        self.inherit_mode(default_mode);
        Ok(())
    }

    /// Path of this node relative to the tree root.
    pub fn relative_path(&self) -> Result<&Path> {
        self.relative_path
            .get_or_try_init(|| {
                let attachment = self.attachment()?;
                let name = self.name.as_deref().ok_or_else(|| {
                    Error::Usage("Cannot determine path of a descriptor without a name".into())
                })?;
                Ok(match &attachment.base {
                    Some(base) => base.join(name),
                    None => PathBuf::from(name),
                })
            })
            .map(PathBuf::as_path)
    }

    /// Absolute path of this node.
    pub fn absolute_path(&self) -> Result<&Path> {
        self.absolute_path
            .get_or_try_init(|| {
                let root = &self.attachment()?.root;
                Ok(root.join(self.relative_path()?))
            })
            .map(PathBuf::as_path)
    }

    fn attachment(&self) -> Result<&Attachment> {
        self.attachment.as_ref().ok_or_else(|| {
            Error::Usage("Cannot determine absolute path without a root".to_string())
        })
    }

    /// True once the node has a known path that exists on disk.
    pub fn exists(&self) -> bool {
        self.absolute_path
            .get()
            .is_some_and(|p| p.symlink_metadata().is_ok())
    }

    /// Check the parts of this declaration that can be checked before any
    /// I/O: the name and affixes must stay inside the parent directory, and
    /// the mode must parse.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.is_empty() || name == "." || name == ".." || has_separator(name) {
                return Err(Error::InvalidName(name.clone()));
            }
        }
        for affix in [&self.prefix, &self.suffix] {
            if has_separator(affix) {
                return Err(Error::InvalidName(affix.clone()));
            }
        }
        if let Some(mode) = &self.mode {
            crate::access::permission_bits(mode)?;
        }
        Ok(())
    }

    /// Create the node on disk. Permissions are not applied here.
    ///
    /// A node without a name is created under a fresh
    /// `prefix + random + suffix` name, which is then recorded.
    pub(crate) fn materialize(&mut self) -> Result<()> {
        if self.materialized {
            return Err(Error::Usage(format!(
                "{:?} has already been created",
                self.absolute_path()?
            )));
        }
        let path = if self.name.is_some() {
            let path = self.absolute_path()?.to_path_buf();
            let parent = path.parent().unwrap_or(&path);
            self.create_at(&path)
                .map_err(|e| creation_error(&path, parent, e))?;
            path
        } else {
            self.create_unique()?
        };
        self.materialized = true;
        tracing::debug!(?path, node_type = %self.node_type, "created");
        Ok(())
    }

    fn create_unique(&mut self) -> Result<PathBuf> {
        let attachment = self.attachment()?;
        let dir = match &attachment.base {
            Some(base) => attachment.root.join(base),
            None => attachment.root.clone(),
        };
        let (_, path) = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(&self.suffix)
            .rand_bytes(NAME_RANDOM_LEN)
            .make_in(&dir, |candidate| self.create_at(candidate))
            .and_then(|node| node.keep().map_err(|e| e.error))
            .map_err(|e| creation_error(&dir, &dir, e))?;

        let Some(name) = path.file_name() else {
            return Err(Error::Usage(format!("{path:?} has no file name")));
        };
        tracing::trace!(?path, "generated unique name");
        self.name = Some(name.to_string_lossy().into_owned());
        Ok(path)
    }

    /// Create the node at `path`, failing if anything already exists there.
    fn create_at(&self, path: &Path) -> std::io::Result<()> {
        match self.node_type {
            NodeType::Dir => std::fs::create_dir(path),
            NodeType::Fifo => {
                nix::unistd::mkfifo(path, Mode::S_IRWXU).map_err(std::io::Error::from)
            }
            NodeType::File => {
                let mut file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)?;
                file.write_all(self.contents.as_deref().unwrap_or_default())
            }
        }
    }

    /// Apply this descriptor's mode, replacing it with `mode` when given.
    ///
    /// The stored mode only changes once the new one has been applied.
    pub fn set_access(&mut self, mode: Option<&str>) -> Result<()> {
        let path = self.absolute_path()?.to_path_buf();
        let mode = mode
            .or(self.mode.as_deref())
            .ok_or_else(|| {
                Error::Usage("Both 'path' and 'mode' must be set before setting access".to_string())
            })?
            .to_string();
        crate::access::set_access(&path, &mode)?;
        self.mode = Some(mode);
        Ok(())
    }
}

fn has_separator(value: &str) -> bool {
    value.chars().any(std::path::is_separator)
}

/// Map a creation failure; a missing `parent` means the enclosing directory
/// was never created.
fn creation_error(path: &Path, parent: &Path, error: std::io::Error) -> Error {
    match error.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(parent.to_path_buf()),
        _ => Error::from_io(path, error),
    }
}

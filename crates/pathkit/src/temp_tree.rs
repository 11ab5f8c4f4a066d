// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Disposable directory trees built from [`PathDescriptor`]s.
//!
//! A [`TempTree`] owns a freshly created, uniquely named root directory.
//! Nodes are declared into the tree, then materialized. Batches created with
//! [`TempTree::add_nodes`] are written completely before any permissions are
//! applied, so a tree can be populated and then locked down to read-only.
//!
//! The root and everything below it is removed when the tree is closed or
//! dropped:
//!
//! ```no_run
//! use pathkit::{PathDescriptor, TempTree, TempTreeOptions};
//!
//! # fn main() -> pathkit::Result<()> {
//! TempTree::scoped(&TempTreeOptions::default(), |tree| {
//!     let sub = tree.declare(PathDescriptor::dir().name("sub").mode("rx"))?;
//!     let file = tree.declare(
//!         PathDescriptor::file()
//!             .name("a.txt")
//!             .parent(sub)
//!             .contents("hello")?,
//!     )?;
//!     tree.add_nodes(&[sub, file])?;
//!     assert!(tree.contains("sub/a.txt"));
//!     Ok(())
//! })
//! # }
//! ```

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::descriptor::{DescriptorId, NodeType, PathDescriptor};
use crate::{Error, Result, access, paths};

#[cfg(test)]
#[path = "./temp_tree_test.rs"]
mod temp_tree_test;

/// Mode given to a tree root when none is configured.
pub const DEFAULT_MODE: &str = "rwx";

/// Options for creating a [`TempTree`] root.
#[derive(Debug, Clone)]
pub struct TempTreeOptions {
    /// Mode applied to the root and inherited by nodes without their own.
    pub mode: String,
    /// Prefix of the generated root name.
    pub prefix: String,
    /// Suffix of the generated root name.
    pub suffix: String,
    /// Directory to create the root in, the system temp dir by default.
    pub base_dir: Option<PathBuf>,
}

impl Default for TempTreeOptions {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE.to_string(),
            prefix: String::new(),
            suffix: String::new(),
            base_dir: None,
        }
    }
}

/// A temporary directory tree that removes itself when closed or dropped.
#[derive(Debug)]
pub struct TempTree {
    root: PathBuf,
    dir: Option<tempfile::TempDir>,
    mode: String,
    descriptors: Vec<PathDescriptor>,
    registry: HashMap<PathBuf, DescriptorId>,
}

impl TempTree {
    /// Create a new root and apply the configured mode to it.
    pub fn create(options: &TempTreeOptions) -> Result<Self> {
        let tree = Self::create_unlocked(options)?;
        tree.lock_root()?;
        Ok(tree)
    }

    /// Create a new root, leaving its permissions for [`Self::lock_root`].
    pub(crate) fn create_unlocked(options: &TempTreeOptions) -> Result<Self> {
        // validate before anything touches the disk
        access::permission_bits(&options.mode)?;

        let base = options
            .base_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let dir = tempfile::Builder::new()
            .prefix(&options.prefix)
            .suffix(&options.suffix)
            .tempdir_in(&base)
            .map_err(|e| Error::from_io(&base, e))?;
        let root = paths::abspath(dir.path())?;
        tracing::debug!(?root, mode = %options.mode, "created temporary tree");

        Ok(Self {
            root,
            dir: Some(dir),
            mode: options.mode.clone(),
            descriptors: Vec::new(),
            registry: HashMap::new(),
        })
    }

    pub(crate) fn lock_root(&self) -> Result<()> {
        access::set_access(&self.root, &self.mode)?;
        Ok(())
    }

    /// Run `f` against a new tree and remove the tree afterwards.
    ///
    /// The tree is closed whether `f` succeeds or not. An error from `f` is
    /// returned in preference to an error from closing.
    pub fn scoped<T, E, F>(options: &TempTreeOptions, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut TempTree) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut tree = Self::create(options)?;
        let outcome = f(&mut tree);
        let closed = tree.close();
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!(%close_err, "failed to remove temporary tree after error");
                Err(err)
            }
        }
    }

    /// Absolute path of the root directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Default mode of this tree.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Number of declared descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Register a descriptor with this tree without creating anything.
    ///
    /// The name, affixes and mode are checked here, before anything is
    /// written.
    pub fn declare(&mut self, descriptor: PathDescriptor) -> Result<DescriptorId> {
        if descriptor.is_attached() {
            return Err(Error::Usage(
                "descriptor already belongs to a tree".to_string(),
            ));
        }
        descriptor.validate()?;
        if let Some(parent) = descriptor.get_parent() {
            let parent = self.get_descriptor(parent)?;
            if parent.node_type() != NodeType::Dir {
                return Err(Error::WrongType {
                    path: self.display_path(parent),
                    expected: NodeType::Dir,
                });
            }
        }
        let id = DescriptorId(self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(id)
    }

    /// Declare and create a single node, applying its permissions at once.
    pub fn add(&mut self, descriptor: PathDescriptor) -> Result<PathBuf> {
        let id = self.declare(descriptor)?;
        self.add_node(id, true)
    }

    /// Create the node declared as `id`.
    ///
    /// The parent directory must already exist in this tree. A missing name
    /// is generated from the descriptor's prefix and suffix. Returns the
    /// absolute path of the new node.
    pub fn add_node(&mut self, id: DescriptorId, apply_permissions: bool) -> Result<PathBuf> {
        let node = self.get_descriptor(id)?;
        if node.is_materialized() {
            return Err(Error::Usage(format!(
                "{:?} has already been created",
                self.display_path(node)
            )));
        }

        let (base, parent_mode) = match node.get_parent() {
            None => (None, None),
            Some(parent_id) => {
                let parent = self.get_descriptor(parent_id)?;
                if !parent.is_materialized() {
                    return Err(Error::NotFound(self.display_path(parent)));
                }
                (
                    Some(parent.relative_path()?.to_path_buf()),
                    parent.get_mode().map(str::to_string),
                )
            }
        };

        let desc = &mut self.descriptors[id.0];
        if let Some(mode) = parent_mode {
            desc.inherit_mode(&mode);
        }
        desc.attach(&self.root, &self.mode, base.as_deref())?;
        desc.materialize()?;

        let absolute = desc.absolute_path()?.to_path_buf();
        let relative = desc.relative_path()?.to_path_buf();
        debug_assert!(absolute.starts_with(&self.root));
        self.registry.insert(absolute.clone(), id);
        self.registry.insert(relative, id);

        if apply_permissions {
            self.descriptors[id.0].set_access(None)?;
        }
        Ok(absolute)
    }

    /// Create a batch of nodes, then apply their permissions.
    ///
    /// Every node is created, in the given order, before any permission is
    /// set. Permissions are then applied in reverse order so that a
    /// directory is locked only after the nodes inside it. Directories must
    /// come before the nodes they contain.
    pub fn add_nodes(&mut self, ids: &[DescriptorId]) -> Result<Vec<PathBuf>> {
        let created = ids
            .iter()
            .map(|id| self.add_node(*id, false))
            .collect::<Result<Vec<_>>>()?;
        for id in ids.iter().rev() {
            self.descriptors[id.0].set_access(None)?;
        }
        Ok(created)
    }

    /// Create `count` empty files shaped like `template`.
    ///
    /// The template must be an unnamed file; each copy gets a unique name.
    pub fn make_empty_files(
        &mut self,
        count: usize,
        template: &PathDescriptor,
    ) -> Result<Vec<PathBuf>> {
        if template.node_type() != NodeType::File {
            return Err(Error::WrongType {
                path: PathBuf::from(template.get_name().unwrap_or_default()),
                expected: NodeType::File,
            });
        }
        if template.get_name().is_some() {
            return Err(Error::Usage(
                "template for empty files must not have a name".to_string(),
            ));
        }
        let ids = (0..count)
            .map(|_| self.declare(template.clone()))
            .collect::<Result<Vec<_>>>()?;
        self.add_nodes(&ids)
    }

    /// Change the permissions of a created node.
    pub fn set_access(&mut self, id: DescriptorId, mode: Option<&str>) -> Result<()> {
        self.get_descriptor(id)?;
        self.descriptors[id.0].set_access(mode)
    }

    /// Look up a descriptor by its absolute or root-relative path.
    pub fn get<P: AsRef<Path>>(&self, key: P) -> Option<&PathDescriptor> {
        self.id_of(key).map(|id| &self.descriptors[id.0])
    }

    /// Id of the node registered under an absolute or root-relative path.
    pub fn id_of<P: AsRef<Path>>(&self, key: P) -> Option<DescriptorId> {
        self.registry.get(key.as_ref()).copied()
    }

    pub fn contains<P: AsRef<Path>>(&self, key: P) -> bool {
        self.registry.contains_key(key.as_ref())
    }

    pub fn descriptor(&self, id: DescriptorId) -> Option<&PathDescriptor> {
        self.descriptors.get(id.0)
    }

    fn get_descriptor(&self, id: DescriptorId) -> Result<&PathDescriptor> {
        self.descriptor(id).ok_or_else(|| {
            Error::Usage(format!("descriptor {} is not part of this tree", id.index()))
        })
    }

    fn display_path(&self, desc: &PathDescriptor) -> PathBuf {
        match desc.absolute_path() {
            Ok(path) => path.to_path_buf(),
            Err(_) => self.root.join(desc.get_name().unwrap_or_default()),
        }
    }

    /// Remove the root and everything below it.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        tracing::debug!(root = ?self.root, "removing temporary tree");
        let removal = unlock_tree(dir.path()).and_then(|_| dir.close());
        removal.map_err(|error| Error::RemoveFailed {
            path: self.root.clone(),
            error,
        })
    }
}

impl Drop for TempTree {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            tracing::warn!(root = ?self.root, %err, "failed to remove temporary tree");
        }
    }
}

/// Give the owner full access to every directory under `dir` so the
/// tree can be deleted even after it was locked down.
fn unlock_tree(dir: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            unlock_tree(&entry.path())?;
        }
    }
    Ok(())
}

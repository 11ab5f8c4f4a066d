// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Layout file parsing, and building trees from layouts.
//!
//! A layout describes a whole temporary tree in YAML:
//!
//! ```yaml
//! api: pathkit/v0
//! mode: rx
//! prefix: fixture-
//! nodes:
//!   - name: config
//!     type: dir
//!     children:
//!       - name: settings.yaml
//!         contents: "debug: true"
//!   - prefix: scratch-
//!     type: fifo
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::temp_tree::{DEFAULT_MODE, TempTree, TempTreeOptions};
use crate::{DescriptorId, NodeType, PathDescriptor};

#[cfg(test)]
#[path = "./layout_test.rs"]
mod layout_test;

/// API version for layout files.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum LayoutApiVersion {
    #[default]
    #[serde(rename = "pathkit/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: LayoutApiVersion,
}

fn default_mode() -> String {
    DEFAULT_MODE.to_string()
}

/// A temporary tree described by a layout file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Layout {
    /// API version identifier.
    pub api: LayoutApiVersion,

    /// Permission mode of the root directory, applied after all nodes exist.
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,

    /// Directory to create the root in.
    /// Relative paths are resolved relative to this file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// Top level nodes, created in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<LayoutNode>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// One node of a [`Layout`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayoutNode {
    /// Fixed name; a unique name is generated when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default)]
    pub node_type: NodeType,

    /// Permission mode; inherited from the parent when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,

    /// Initial file contents. Only valid for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,

    /// Nodes inside this one. Only valid for directories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    fn to_descriptor(&self, parent: Option<DescriptorId>) -> crate::Result<PathDescriptor> {
        let mut desc = PathDescriptor::new(self.node_type)
            .prefix(self.prefix.as_str())
            .suffix(self.suffix.as_str());
        if let Some(name) = &self.name {
            desc = desc.name(name.as_str());
        }
        if let Some(mode) = &self.mode {
            desc = desc.mode(mode.as_str());
        }
        if let Some(parent) = parent {
            desc = desc.parent(parent);
        }
        if let Some(contents) = &self.contents {
            desc = desc.contents(contents.as_str())?;
        }
        Ok(desc)
    }
}

impl Layout {
    /// Parse a layout from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            LayoutApiVersion::V0 => {
                serde_yaml::from_value(value).map_err(|e| crate::Error::InvalidYaml {
                    error: e,
                    yaml_content: yaml,
                })
            }
        }
    }

    /// Load a layout from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut layout = Self::from_yaml(yaml)?;
        if let Some(base_dir) = layout.base_dir.take() {
            layout.base_dir = Some(resolve_base_dir(path, base_dir)?);
        }
        layout.source_path = Some(path.to_path_buf());
        Ok(layout)
    }

    /// Options for creating the root of this layout.
    pub fn options(&self) -> TempTreeOptions {
        TempTreeOptions {
            mode: self.mode.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            base_dir: self.base_dir.clone(),
        }
    }
}

fn resolve_base_dir(source: &Path, base_dir: PathBuf) -> crate::Result<PathBuf> {
    if base_dir.is_absolute() || base_dir.starts_with("~") {
        return Ok(base_dir);
    }
    let Some(parent) = source.parent() else {
        return Ok(base_dir);
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let joined = parent.join(&base_dir);
    dunce::canonicalize(&joined).map_err(|e| crate::Error::from_io(&joined, e))
}

impl TempTree {
    /// Create a tree and every node of `layout`.
    ///
    /// The root stays writable until all nodes exist and their permissions
    /// are set; the layout's root mode is applied last.
    pub fn from_layout(layout: &Layout) -> crate::Result<Self> {
        let mut options = layout.options();
        if let Some(base_dir) = options.base_dir.take() {
            options.base_dir = Some(crate::paths::abspath(base_dir)?);
        }
        let mut tree = Self::create_unlocked(&options)?;

        // declare in pre-order so parents always precede their children
        let mut ids = Vec::new();
        let mut pending: Vec<(&LayoutNode, Option<DescriptorId>)> =
            layout.nodes.iter().rev().map(|node| (node, None)).collect();
        while let Some((node, parent)) = pending.pop() {
            let id = tree.declare(node.to_descriptor(parent)?)?;
            ids.push(id);
            pending.extend(node.children.iter().rev().map(|child| (child, Some(id))));
        }

        tracing::debug!(nodes = ids.len(), "building layout");
        tree.add_nodes(&ids)?;
        tree.lock_root()?;
        Ok(tree)
    }
}

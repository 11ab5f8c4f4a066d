// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! pathkit - Path Checks and Disposable Filesystem Trees
//!
//! This crate resolves and validates paths, maps `r`/`w`/`a`/`x` mode
//! strings onto access checks and permission bits, and builds temporary
//! directory trees for tests.
//!
//! # Overview
//!
//! A [`TempTree`] owns a uniquely named root directory. Files, directories
//! and named pipes are described with [`PathDescriptor`]s, created in
//! batches, and only then given their permissions, so that a read-only
//! fixture can still be filled with content. The whole tree is removed when
//! it is closed or dropped.
//!
//! Trees can also be described declaratively in a layout file:
//!
//! # Example
//!
//! ```yaml
//! # fixture.yaml
//! api: pathkit/v0
//!
//! # Root is locked down once every node exists
//! mode: rx
//! prefix: fixture-
//!
//! nodes:
//!   - name: input
//!     type: dir
//!     children:
//!       - name: reads.fastq
//!         contents: "@r1\nACGT\n+\n!!!!\n"
//!   - prefix: empty-
//!     suffix: .txt
//! ```

pub mod access;
pub mod check;
pub mod descriptor;
pub mod error;
pub mod executable;
pub mod find;
pub mod layout;
pub mod paths;
pub mod temp_tree;

pub use access::{Access, check_access, mode_to_access, permission_bits, set_access};
pub use check::{
    check_path,
    check_readable_file,
    check_writable_file,
    safe_check_path,
    safe_check_readable_file,
    safe_check_writable_file,
};
pub use descriptor::{DescriptorId, NodeType, PathDescriptor};
pub use error::{Error, Result};
pub use executable::ExecutableCache;
pub use find::{FindTypes, find, find_matching};
pub use layout::{Layout, LayoutApiVersion, LayoutNode};
pub use paths::{
    STDERR,
    STDIN,
    STDOUT,
    SplitPath,
    abspath,
    filename,
    is_stream_sentinel,
    resolve_path,
    split_path,
};
pub use temp_tree::{DEFAULT_MODE, TempTree, TempTreeOptions};

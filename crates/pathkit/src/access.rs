// Copyright (c) Contributors to the pathkit project.
// SPDX-License-Identifier: Apache-2.0

//! Mode strings, permission bits and access checks.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::sys::stat::Mode;
use nix::unistd::AccessFlags;

use crate::paths::{STDERR, STDOUT};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./access_test.rs"]
mod access_test;

/// Mode characters with the access they test and the bit they grant.
///
/// Lookup order matters for [`Access::from_mode`]: the first entry present in
/// a mode string decides its access.
const MODE_TABLE: [(char, Access, Mode); 4] = [
    ('r', Access::Read, Mode::S_IRUSR),
    ('w', Access::Write, Mode::S_IWUSR),
    ('a', Access::Write, Mode::S_IWUSR),
    ('x', Access::Execute, Mode::S_IXUSR),
];

/// The kind of access to test a path for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl Access {
    /// Access implied by a mode string such as `"rb"` or `"wt"`.
    pub fn from_mode(mode: &str) -> Result<Self> {
        MODE_TABLE
            .iter()
            .find(|(c, _, _)| mode.contains(*c))
            .map(|(_, access, _)| *access)
            .ok_or_else(|| Error::InvalidMode(mode.to_string()))
    }

    /// The matching `access(2)` flag.
    pub fn flags(self) -> AccessFlags {
        match self {
            Access::Read => AccessFlags::R_OK,
            Access::Write => AccessFlags::W_OK,
            Access::Execute => AccessFlags::X_OK,
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Same as [`Access::from_mode`].
pub fn mode_to_access(mode: &str) -> Result<Access> {
    Access::from_mode(mode)
}

/// Combined owner permission bits for a mode string like `"rwx"`.
pub fn permission_bits(mode: &str) -> Result<Mode> {
    mode.chars().try_fold(Mode::empty(), |bits, c| {
        MODE_TABLE
            .iter()
            .find(|(m, _, _)| *m == c)
            .map(|(_, _, bit)| bits | *bit)
            .ok_or(Error::InvalidModeChar(c))
    })
}

/// Set the permissions of `path` from a mode string.
///
/// Returns the bits that were applied.
pub fn set_access<P: AsRef<Path>>(path: P, mode: &str) -> Result<Mode> {
    let path = path.as_ref();
    let bits = permission_bits(mode)?;
    let permissions = std::fs::Permissions::from_mode(u32::from(bits.bits()));
    std::fs::set_permissions(path, permissions).map_err(|e| Error::from_io(path, e))?;
    tracing::debug!(?path, mode, "set access");
    Ok(bits)
}

/// Check that `path` allows `access`.
///
/// The stream sentinels are never looked up on disk: [`STDOUT`] may only be
/// read or written and [`STDERR`] may only be written.
pub fn check_access<P: AsRef<Path>>(path: P, access: Access) -> Result<()> {
    let path = path.as_ref();
    if path == Path::new(STDOUT) {
        if !matches!(access, Access::Read | Access::Write) {
            return Err(Error::PermissionDenied {
                path: path.to_path_buf(),
                reason: "STDOUT access must be r or w".to_string(),
            });
        }
        return Ok(());
    }
    if path == Path::new(STDERR) {
        if access != Access::Write {
            return Err(Error::PermissionDenied {
                path: path.to_path_buf(),
                reason: "STDERR access must be w".to_string(),
            });
        }
        return Ok(());
    }

    nix::unistd::access(path, access.flags()).map_err(|errno| Error::PermissionDenied {
        path: path.to_path_buf(),
        reason: format!("{access} access denied ({errno})"),
    })
}

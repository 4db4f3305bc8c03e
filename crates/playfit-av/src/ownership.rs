//! File ownership assignment by user and group name.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Named owner applied to committed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user: String,
    pub group: String,
}

/// Change the owner of `path`. Callers treat failure as non-fatal.
#[cfg(unix)]
pub fn apply(path: &Path, owner: &Owner) -> Result<()> {
    use nix::unistd::{chown, Group, User};

    let user = User::from_name(&owner.user)
        .map_err(|e| Error::Filesystem(format!("user lookup {}: {}", owner.user, e)))?
        .ok_or_else(|| Error::Filesystem(format!("unknown user: {}", owner.user)))?;
    let group = Group::from_name(&owner.group)
        .map_err(|e| Error::Filesystem(format!("group lookup {}: {}", owner.group, e)))?
        .ok_or_else(|| Error::Filesystem(format!("unknown group: {}", owner.group)))?;

    chown(path, Some(user.uid), Some(group.gid))
        .map_err(|e| Error::Filesystem(format!("chown {:?}: {}", path, e)))
}

#[cfg(not(unix))]
pub fn apply(path: &Path, _owner: &Owner) -> Result<()> {
    Err(Error::Filesystem(format!(
        "ownership is not supported on this platform: {:?}",
        path
    )))
}

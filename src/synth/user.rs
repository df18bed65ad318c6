use std::path::{Component, Path};

use super::add_member;
use crate::alloc::allocate_uid;
use crate::config::IdRanges;
use crate::credential::PasswordHasher;
use crate::db::{Passwd, RecordStore, Shadow};
use crate::home::OwnershipDirective;
use crate::table::{IdRequest, UserSpec, NO_HOME, NO_SHELL};
use crate::validate::validate_account;
use crate::{Error, Result};

/// Login shell of accounts created with the `-` shell.
pub const DISABLED_SHELL: &str = "/bin/false";

fn resolve_home(username: &str, home: &str) -> Result<String> {
    if home == NO_HOME {
        return Ok("/".to_string());
    }

    let path = Path::new(home);
    if !path.is_absolute() {
        return Err(Error::MalformedField(format!(
            "home '{home}' of user '{username}' is not an absolute path"
        )));
    }
    if path == Path::new("/") {
        return Err(Error::MalformedField(format!(
            "home of user '{username}' can not explicitly be '/'; use '-' for no home"
        )));
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(Error::MalformedField(format!(
            "home '{home}' of user '{username}' contains '..'"
        )));
    }
    Ok(home.to_string())
}

/// Write the passwd and shadow lines for `spec` and merge it into its
/// secondary groups. Returns the home directory to create, if any.
pub(crate) fn apply_user(
    store: &mut RecordStore,
    spec: &UserSpec,
    uids: &IdRanges,
    hasher: &dyn PasswordHasher,
) -> Result<Option<OwnershipDirective>> {
    let username = spec.username.as_str();
    validate_account(store, username, spec.uid, &spec.group, spec.gid)?;

    let uid = match spec.uid {
        IdRequest::Fixed(uid) => uid,
        IdRequest::Auto(class) => allocate_uid(store, username, uids.get(class))?,
    };

    let gid = store
        .group_by_name(&spec.group)
        .map(|group| group.gid)
        .ok_or_else(|| {
            Error::Conflict(format!(
                "primary group '{}' of user '{}' does not exist",
                spec.group, username
            ))
        })?;

    let shell = if spec.shell == NO_SHELL {
        DISABLED_SHELL
    } else {
        spec.shell.as_str()
    };
    let home = resolve_home(username, &spec.home)?;
    let credential = spec.credential.encode(username, hasher)?;

    log::info!("Add user {} (uid {}, gid {})", username, uid, gid);
    log::debug!("\tName: {}", spec.comment);
    log::debug!("\tHome: {}", home);
    log::debug!("\tShell: {}", shell);

    store.upsert_account(
        Passwd::new(username, uid, gid, &spec.comment, &home, shell),
        Shadow::new(username, &credential),
    );

    for group in &spec.groups {
        add_member(store, group, username)?;
    }

    Ok((spec.home != NO_HOME).then(|| OwnershipDirective {
        path: home,
        uid,
        gid,
    }))
}

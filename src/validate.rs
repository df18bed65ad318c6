//! Consistency checks run against the live store, so a row conflicting with
//! one applied earlier in the same run is caught just like a row conflicting
//! with the pre-existing database.

use crate::db::RecordStore;
use crate::table::IdRequest;
use crate::{Error, Result};

/// Checks that only involve the group side of a row.
pub(crate) fn validate_group(store: &RecordStore, group: &str, gid: IdRequest) -> Result<()> {
    let IdRequest::Fixed(gid) = gid else {
        return Ok(());
    };

    if gid == 0 {
        return Err(Error::MalformedField(format!(
            "invalid gid 0 for group '{group}'"
        )));
    }
    if let Some(existing) = store.group_by_gid(gid) {
        if existing.name != group {
            return Err(Error::Conflict(format!(
                "gid {gid} for group '{group}' is already used by group '{}'",
                existing.name
            )));
        }
    }
    if let Some(existing) = store.group_by_name(group) {
        if existing.gid != gid {
            return Err(Error::Conflict(format!(
                "group '{group}' already exists with gid {} (wants {gid})",
                existing.gid
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_account(
    store: &RecordStore,
    username: &str,
    uid: IdRequest,
    group: &str,
    gid: IdRequest,
) -> Result<()> {
    if username == "root" {
        return Err(Error::MalformedField(format!(
            "invalid username '{username}'"
        )));
    }

    let account = store.account_by_name(username);

    validate_group(store, group, gid)?;
    if let (IdRequest::Fixed(gid), Some(account)) = (gid, account) {
        if account.gid != gid {
            return Err(Error::Conflict(format!(
                "user '{username}' already exists with gid {} (wants {gid})",
                account.gid
            )));
        }
    }

    if let IdRequest::Fixed(uid) = uid {
        if uid == 0 {
            return Err(Error::MalformedField(format!(
                "invalid uid 0 for user '{username}'"
            )));
        }
        if let Some(existing) = store.account_by_uid(uid) {
            if existing.name != username {
                return Err(Error::Conflict(format!(
                    "uid {uid} for user '{username}' is already used by user '{}'",
                    existing.name
                )));
            }
        }
        if let Some(account) = account {
            if account.uid != uid {
                return Err(Error::Conflict(format!(
                    "user '{username}' already exists with uid {} (wants {uid})",
                    account.uid
                )));
            }
        }
    }

    // The stored gid is the binding; the group name is looked up from it.
    // A gid with no group record binds no name, so the row rebinds it.
    if let Some(bound) = account.and_then(|account| store.group_by_gid(account.gid)) {
        if bound.name != group {
            return Err(Error::Conflict(format!(
                "user '{username}' already exists with group '{}' (wants '{group}')",
                bound.name
            )));
        }
    }

    Ok(())
}

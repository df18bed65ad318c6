use crate::alloc::allocate_gid;
use crate::config::IdRanges;
use crate::db::{Group, RecordStore};
use crate::table::IdRequest;
use crate::validate::validate_group;
use crate::Result;

/// (Re)write `name` with an empty member list; members are re-added by the
/// user passes.
pub(crate) fn apply_group(
    store: &mut RecordStore,
    name: &str,
    gid: IdRequest,
    ranges: &IdRanges,
) -> Result<u32> {
    validate_group(store, name, gid)?;

    let gid = match gid {
        IdRequest::Fixed(gid) => gid,
        IdRequest::Auto(class) => allocate_gid(store, name, ranges.get(class))?,
    };

    log::info!("Add group {} (gid {})", name, gid);
    store.upsert_group(Group::new(name, gid));
    Ok(gid)
}

pub(crate) fn add_member(store: &mut RecordStore, group: &str, user: &str) -> Result<()> {
    if store.add_member(group, user)? {
        log::debug!("Add {} to group {}", user, group);
    }
    Ok(())
}

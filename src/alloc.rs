use crate::config::IdRange;
use crate::db::RecordStore;
use crate::{Error, Result};

fn first_free<F: Fn(u32) -> bool>(range: IdRange, used: F) -> Option<u32> {
    (range.min.max(1)..=range.max).find(|&id| !used(id))
}

/// The uid already bound to `username`, or the lowest unused one in `range`.
pub(crate) fn allocate_uid(store: &RecordStore, username: &str, range: IdRange) -> Result<u32> {
    if let Some(account) = store.account_by_name(username) {
        return Ok(account.uid);
    }
    first_free(range, |uid| store.account_by_uid(uid).is_some()).ok_or_else(|| {
        Error::AllocationExhausted {
            kind: "uid",
            name: username.to_string(),
            min: range.min,
            max: range.max,
            line: None,
        }
    })
}

/// The gid already bound to `group`, or the lowest unused one in `range`.
pub(crate) fn allocate_gid(store: &RecordStore, group: &str, range: IdRange) -> Result<u32> {
    if let Some(existing) = store.group_by_name(group) {
        return Ok(existing.gid);
    }
    first_free(range, |gid| store.group_by_gid(gid).is_some()).ok_or_else(|| {
        Error::AllocationExhausted {
            kind: "gid",
            name: group.to_string(),
            min: range.min,
            max: range.max,
            line: None,
        }
    })
}

#[cfg(test)]
mod test {
    use super::{allocate_gid, allocate_uid};
    use crate::config::IdRange;
    use crate::db::RecordStore;
    use crate::Error;

    fn store() -> RecordStore {
        RecordStore::from_contents(
            "a:x:1000:1000::/:/bin/false\nb:x:1002:1000::/:/bin/false\n",
            "",
            "a:x:1000:\nsys:x:101:\n",
            None,
        )
    }

    #[test]
    fn lowest_free_id_wins() {
        let store = store();
        let range = IdRange { min: 1000, max: 1999 };
        assert_eq!(allocate_uid(&store, "c", range).unwrap(), 1001);
        assert_eq!(allocate_gid(&store, "c", range).unwrap(), 1001);
        assert_eq!(
            allocate_gid(&store, "d", IdRange { min: 100, max: 999 }).unwrap(),
            100
        );
    }

    #[test]
    fn existing_binding_is_reused_even_outside_range() {
        let store = store();
        let range = IdRange { min: 5000, max: 5999 };
        assert_eq!(allocate_uid(&store, "b", range).unwrap(), 1002);
        assert_eq!(allocate_gid(&store, "sys", range).unwrap(), 101);
    }

    #[test]
    fn zero_is_never_handed_out() {
        let store = RecordStore::default();
        assert_eq!(
            allocate_uid(&store, "x", IdRange { min: 0, max: 3 }).unwrap(),
            1
        );
    }

    #[test]
    fn exhausted_range_names_entity() {
        let store = store();
        let err = allocate_uid(&store, "c", IdRange { min: 1000, max: 1000 }).unwrap_err();
        assert!(matches!(err, Error::AllocationExhausted { .. }));
        assert_eq!(err.to_string(), "no free uid left in 1000..=1000 for 'c'");
    }
}

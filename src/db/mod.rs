//! In-memory view of the account database of a target tree.
//!
//! Each file is kept as an ordered list of lines. Untouched lines are written
//! back exactly as read; a rewrite deletes the old line and appends the new
//! one at the end, the way `sed -i /^name:/d && echo >>` would.

use std::fs;
use std::io;
use std::path::Path;

use crate::{Error, Result};

pub use self::account::{Passwd, Shadow};
pub use self::group::{Group, Gshadow};

pub mod account;
pub mod group;

/// One line type of a colon-separated database file.
pub trait Record: Sized {
    /// Location relative to the target root.
    const FILE: &'static str;

    fn parse(line: &str) -> Option<Self>;
    fn name(&self) -> &str;
    fn render(&self) -> String;
}

#[derive(Clone, Debug)]
enum Line<R> {
    Parsed { record: R, original: Option<String> },
    Opaque(String),
}

#[derive(Clone, Debug)]
pub struct DbFile<R> {
    lines: Vec<Line<R>>,
    existed: bool,
    dirty: bool,
}

impl<R: Record> DbFile<R> {
    fn empty() -> Self {
        DbFile {
            lines: Vec::new(),
            existed: false,
            dirty: false,
        }
    }

    fn parse(data: &str) -> Self {
        let lines = data
            .lines()
            .map(|line| match R::parse(line) {
                Some(record) => Line::Parsed {
                    record,
                    original: Some(line.to_string()),
                },
                None => Line::Opaque(line.to_string()),
            })
            .collect();
        DbFile {
            lines,
            existed: true,
            dirty: false,
        }
    }

    fn read(root: &Path) -> Result<Option<Self>> {
        let path = root.join(R::FILE);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(Self::parse(&data))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(path, err)),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.lines.iter().filter_map(|line| match line {
            Line::Parsed { record, .. } => Some(record),
            Line::Opaque(_) => None,
        })
    }

    pub fn find<F: Fn(&R) -> bool>(&self, predicate: F) -> Option<&R> {
        self.records().find(|record| predicate(record))
    }

    fn find_by_name_mut(&mut self, name: &str) -> Option<&mut R> {
        self.lines.iter_mut().find_map(|line| match line {
            Line::Parsed { record, original } if record.name() == name => {
                *original = None;
                Some(record)
            }
            _ => None,
        })
    }

    fn upsert(&mut self, record: R) {
        self.lines.retain(|line| match line {
            Line::Parsed { record: existing, .. } => existing.name() != record.name(),
            Line::Opaque(_) => true,
        });
        self.lines.push(Line::Parsed {
            record,
            original: None,
        });
        self.dirty = true;
    }

    pub fn render(&self) -> String {
        let mut data = String::new();
        for line in &self.lines {
            match line {
                Line::Parsed {
                    original: Some(text),
                    ..
                }
                | Line::Opaque(text) => data.push_str(text),
                Line::Parsed { record, .. } => data.push_str(&record.render()),
            }
            data.push('\n');
        }
        data
    }

    fn flush(&self, root: &Path, mode: u32) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let path = root.join(R::FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        fs::write(&path, self.render()).map_err(|err| Error::io(&path, err))?;

        // Existing files keep their mode
        if !self.existed {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(mode))
                .map_err(|err| Error::io(&path, err))?;
        }

        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// passwd, shadow, group and (when the target has one) gshadow.
#[derive(Clone, Debug)]
pub struct RecordStore {
    passwd: DbFile<Passwd>,
    shadow: DbFile<Shadow>,
    group: DbFile<Group>,
    gshadow: Option<DbFile<Gshadow>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        RecordStore::new(false)
    }
}

impl RecordStore {
    /// An empty database, optionally mirroring groups into gshadow.
    pub fn new(gshadow: bool) -> Self {
        RecordStore {
            passwd: DbFile::empty(),
            shadow: DbFile::empty(),
            group: DbFile::empty(),
            gshadow: gshadow.then(DbFile::empty),
        }
    }

    /// Build a store from file contents, mostly for tests and dry runs.
    pub fn from_contents(passwd: &str, shadow: &str, group: &str, gshadow: Option<&str>) -> Self {
        RecordStore {
            passwd: DbFile::parse(passwd),
            shadow: DbFile::parse(shadow),
            group: DbFile::parse(group),
            gshadow: gshadow.map(DbFile::parse),
        }
    }

    /// Read the database of the tree rooted at `root`. Missing files are
    /// treated as empty; a missing gshadow disables the mirror entirely.
    pub fn load(root: &Path) -> Result<Self> {
        let store = RecordStore {
            passwd: DbFile::read(root)?.unwrap_or_else(DbFile::empty),
            shadow: DbFile::read(root)?.unwrap_or_else(DbFile::empty),
            group: DbFile::read(root)?.unwrap_or_else(DbFile::empty),
            gshadow: DbFile::read(root)?,
        };
        log::debug!(
            "loaded {} accounts and {} groups from {}",
            store.passwd.records().count(),
            store.group.records().count(),
            root.display()
        );
        Ok(store)
    }

    /// Write every file changed since loading.
    pub fn flush(&self, root: &Path) -> Result<()> {
        self.passwd.flush(root, 0o644)?;
        self.shadow.flush(root, 0o600)?;
        self.group.flush(root, 0o644)?;
        if let Some(gshadow) = &self.gshadow {
            gshadow.flush(root, 0o600)?;
        }
        Ok(())
    }

    pub fn has_gshadow(&self) -> bool {
        self.gshadow.is_some()
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Passwd> {
        self.passwd.find(|account| account.name == name)
    }

    pub fn account_by_uid(&self, uid: u32) -> Option<&Passwd> {
        self.passwd.find(|account| account.uid == uid)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.group.find(|group| group.name == name)
    }

    pub fn group_by_gid(&self, gid: u32) -> Option<&Group> {
        self.group.find(|group| group.gid == gid)
    }

    pub fn shadow_by_name(&self, name: &str) -> Option<&Shadow> {
        self.shadow.find(|shadow| shadow.name == name)
    }

    pub fn gshadow_by_name(&self, name: &str) -> Option<&Gshadow> {
        self.gshadow
            .as_ref()
            .and_then(|gshadow| gshadow.find(|entry| entry.name == name))
    }

    /// Replace the passwd and shadow lines of `passwd.name`.
    pub fn upsert_account(&mut self, passwd: Passwd, shadow: Shadow) {
        debug_assert_eq!(passwd.name, shadow.name);
        self.passwd.upsert(passwd);
        self.shadow.upsert(shadow);
    }

    /// Replace the group line, and its locked gshadow mirror, of `group.name`.
    pub fn upsert_group(&mut self, group: Group) {
        if let Some(gshadow) = &mut self.gshadow {
            gshadow.upsert(Gshadow::locked(&group.name));
        }
        self.group.upsert(group);
    }

    /// Add `user` to the members of `group`. Returns whether it was added.
    pub fn add_member(&mut self, group: &str, user: &str) -> Result<bool> {
        let entry = self.group.find_by_name_mut(group).ok_or_else(|| {
            Error::Conflict(format!(
                "can not add '{user}' to group '{group}': group does not exist"
            ))
        })?;
        let added = entry.add_member(user);

        let mirrored = match &mut self.gshadow {
            Some(gshadow) => {
                if gshadow.find(|entry| entry.name == group).is_none() {
                    gshadow.upsert(Gshadow::locked(group));
                }
                gshadow
                    .find_by_name_mut(group)
                    .is_some_and(|entry| entry.add_member(user))
            }
            None => false,
        };

        if added {
            self.group.dirty = true;
        }
        if mirrored {
            if let Some(gshadow) = &mut self.gshadow {
                gshadow.dirty = true;
            }
        }
        Ok(added)
    }

    pub fn render_passwd(&self) -> String {
        self.passwd.render()
    }

    pub fn render_shadow(&self) -> String {
        self.shadow.render()
    }

    pub fn render_group(&self) -> String {
        self.group.render()
    }

    pub fn render_gshadow(&self) -> Option<String> {
        self.gshadow.as_ref().map(DbFile::render)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::{Group, Passwd, RecordStore, Shadow};

    const PASSWD: &str = "root:x:0:0:root:/root:/bin/sh\n# managed by hand\nbin:x:1:1:bin:/bin:/bin/false\n";
    const GROUP: &str = "root:x:0:\nwheel:x:10:root\n";

    fn store() -> RecordStore {
        RecordStore::from_contents(PASSWD, "root::19000:0:99999:7:::\n", GROUP, None)
    }

    #[test]
    fn lookups_by_name_and_id() {
        let store = store();
        assert_eq!(store.account_by_name("bin").map(|a| a.uid), Some(1));
        assert_eq!(store.account_by_uid(0).map(|a| a.name.as_str()), Some("root"));
        assert_eq!(store.group_by_gid(10).map(|g| g.name.as_str()), Some("wheel"));
        assert!(store.group_by_name("audio").is_none());
    }

    #[test]
    fn untouched_files_render_verbatim() {
        let store = store();
        assert_eq!(store.render_passwd(), PASSWD);
        assert_eq!(store.render_group(), GROUP);
    }

    #[test]
    fn upsert_moves_record_to_end() {
        let mut store = store();
        store.upsert_account(
            Passwd::new("root", 0, 0, "admin", "/root", "/bin/bash"),
            Shadow::new("root", "!"),
        );
        assert_eq!(
            store.render_passwd(),
            "# managed by hand\nbin:x:1:1:bin:/bin:/bin/false\nroot:x:0:0:admin:/root:/bin/bash\n"
        );
        assert_eq!(store.render_shadow(), "root:!:::::::\n");
    }

    #[test]
    fn add_member_is_idempotent_and_mirrored() {
        let mut store = RecordStore::new(true);
        store.upsert_group(Group::new("audio", 29));
        assert!(store.add_member("audio", "alice").unwrap());
        assert!(!store.add_member("audio", "alice").unwrap());
        assert!(store.add_member("audio", "bob").unwrap());
        assert_eq!(store.render_group(), "audio:x:29:alice,bob\n");
        assert_eq!(store.render_gshadow().unwrap(), "audio:*::alice,bob\n");
    }

    #[test]
    fn add_member_to_missing_group_fails() {
        let mut store = store();
        assert!(store.add_member("audio", "alice").is_err());
    }

    #[test]
    fn load_and_flush_only_touch_dirty_files() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("etc")).unwrap();
        fs::write(root.path().join("etc/passwd"), PASSWD).unwrap();
        fs::write(root.path().join("etc/group"), GROUP).unwrap();

        let mut store = RecordStore::load(root.path()).unwrap();
        assert!(!store.has_gshadow());
        store.upsert_group(Group::new("audio", 29));
        store.flush(root.path()).unwrap();

        assert_eq!(
            fs::read_to_string(root.path().join("etc/group")).unwrap(),
            "root:x:0:\nwheel:x:10:root\naudio:x:29:\n"
        );
        assert!(!root.path().join("etc/shadow").exists());
        assert!(!root.path().join("etc/gshadow").exists());
    }
}

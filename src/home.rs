//! Home directories requested by synthesized accounts.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use libc::{gid_t, uid_t};

use crate::{Error, Result};

/// A directory inside the image that must exist and belong to `uid:gid`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipDirective {
    /// Absolute path as seen from inside the image.
    pub path: String,
    pub uid: u32,
    pub gid: u32,
}

impl OwnershipDirective {
    /// Where the directory lives under the target root.
    pub fn target_path(&self, root: &Path) -> PathBuf {
        root.join(self.path.trim_start_matches('/'))
    }
}

fn chown(path: &Path, uid: uid_t, gid: gid_t, recursive: bool) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    // lchown so symlinks in skeleton files are not followed out of the image
    if unsafe { libc::lchown(c_path.as_ptr(), uid, gid) } != 0 {
        return Err(io::Error::last_os_error());
    }

    if recursive && path.is_dir() && !path.is_symlink() {
        for entry_res in fs::read_dir(path)? {
            let entry = entry_res?;
            chown(&entry.path(), uid, gid, recursive)?;
        }
    }

    Ok(())
}

/// Create each home directory under `root` and hand it, recursively, to its owner.
pub fn materialize(root: &Path, directives: &[OwnershipDirective]) -> Result<()> {
    for directive in directives {
        let path = directive.target_path(root);
        log::info!(
            "Create home {} ({}:{})",
            path.display(),
            directive.uid,
            directive.gid
        );
        fs::create_dir_all(&path).map_err(|err| Error::io(&path, err))?;
        chown(&path, directive.uid, directive.gid, true).map_err(|err| Error::io(&path, err))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::os::unix::fs::MetadataExt;
    use std::path::Path;

    use super::{materialize, OwnershipDirective};

    #[test]
    fn target_path_stays_under_root() {
        let directive = OwnershipDirective {
            path: "/home/alice".to_string(),
            uid: 1000,
            gid: 1000,
        };
        assert_eq!(
            directive.target_path(Path::new("/tmp/rootfs")),
            Path::new("/tmp/rootfs/home/alice")
        );
    }

    #[test]
    fn materialize_to_current_owner() {
        let root = tempfile::tempdir().unwrap();
        let meta = fs::metadata(root.path()).unwrap();
        let directive = OwnershipDirective {
            path: "/home/alice".to_string(),
            uid: meta.uid(),
            gid: meta.gid(),
        };
        let home = directive.target_path(root.path());
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".profile"), "").unwrap();

        materialize(root.path(), &[directive]).unwrap();

        let profile = fs::metadata(home.join(".profile")).unwrap();
        assert_eq!((profile.uid(), profile.gid()), (meta.uid(), meta.gid()));
    }
}

//! The users table: one account per line, nine whitespace-separated columns.
//!
//! ```text
//! username uid group gid password home shell groups comment
//! ```
//!
//! `-` stands for "nothing" in the username, home, shell and groups columns,
//! and the comment runs to the end of the line.

use crate::credential::Credential;
use crate::{Error, Result};

/// Username column value for rows that only declare a group.
pub const NO_ACCOUNT: &str = "-";
/// Home column value for accounts without a home directory.
pub const NO_HOME: &str = "-";
/// Shell column value for accounts that can not log in.
pub const NO_SHELL: &str = "-";
/// Groups column value for accounts without secondary groups.
pub const NO_GROUPS: &str = "-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdClass {
    User,
    System,
}

/// A uid or gid column: a concrete id, or a request to allocate one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdRequest {
    Fixed(u32),
    Auto(IdClass),
}

impl IdRequest {
    pub fn parse(field: &str, column: &str) -> Result<Self> {
        match field.parse::<i64>() {
            Ok(-1) => Ok(IdRequest::Auto(IdClass::User)),
            Ok(-2) => Ok(IdRequest::Auto(IdClass::System)),
            // u32::MAX is (uid_t)-1, which chown reads as "leave unchanged"
            Ok(id) => u32::try_from(id)
                .ok()
                .filter(|&id| id != u32::MAX)
                .map(IdRequest::Fixed)
                .ok_or_else(|| Error::MalformedField(format!("invalid {column} '{field}'"))),
            Err(_) => Err(Error::MalformedField(format!(
                "invalid {column} '{field}'"
            ))),
        }
    }

    pub fn is_fixed(self) -> bool {
        matches!(self, IdRequest::Fixed(_))
    }
}

/// One parsed row of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSpec {
    pub line: usize,
    pub username: String,
    pub uid: IdRequest,
    pub group: String,
    pub gid: IdRequest,
    pub credential: Credential,
    pub home: String,
    pub shell: String,
    pub groups: Vec<String>,
    pub comment: String,
}

impl UserSpec {
    pub fn has_account(&self) -> bool {
        self.username != NO_ACCOUNT
    }

    pub fn parse(line: usize, text: &str) -> Result<Self> {
        let mut rest = text.trim();
        let mut fields = Vec::with_capacity(8);
        while fields.len() < 8 {
            let rest_trimmed = rest.trim_start();
            if rest_trimmed.is_empty() {
                break;
            }
            let end = rest_trimmed
                .find(char::is_whitespace)
                .unwrap_or(rest_trimmed.len());
            fields.push(&rest_trimmed[..end]);
            rest = &rest_trimmed[end..];
        }

        let [username, uid, group, gid, password, home, shell, groups] = fields[..] else {
            return Err(Error::MalformedField(format!(
                "line {line}: expected at least 8 fields, found {}",
                fields.len()
            )));
        };

        let comment = rest.trim();
        let comment = comment
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(comment);

        for (column, value) in [
            ("username", username),
            ("group", group),
            ("home", home),
            ("shell", shell),
            ("groups", groups),
            ("comment", comment),
        ] {
            if value.contains(':') {
                return Err(Error::MalformedField(format!(
                    "line {line}: {column} '{value}' contains ':'"
                )));
            }
        }

        let in_line = |err: Error| match err {
            Error::MalformedField(message) => {
                Error::MalformedField(format!("line {line}: {message}"))
            }
            other => other,
        };

        Ok(UserSpec {
            line,
            username: username.to_string(),
            uid: IdRequest::parse(uid, "uid").map_err(in_line)?,
            group: group.to_string(),
            gid: IdRequest::parse(gid, "gid").map_err(in_line)?,
            credential: Credential::parse(password).map_err(in_line)?,
            home: home.to_string(),
            shell: shell.to_string(),
            groups: if groups == NO_GROUPS {
                Vec::new()
            } else {
                groups
                    .split(',')
                    .filter(|group| !group.is_empty())
                    .map(str::to_string)
                    .collect()
            },
            comment: comment.to_string(),
        })
    }
}

/// Parse a whole table, skipping blank lines and `#` comments.
pub fn parse_table(text: &str) -> Result<Vec<UserSpec>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| UserSpec::parse(index + 1, line))
        .collect()
}

#[cfg(test)]
mod test {
    use super::{parse_table, IdClass, IdRequest, UserSpec};
    use crate::credential::Credential;
    use crate::Error;

    #[test]
    fn full_row() {
        let spec = UserSpec::parse(
            3,
            "alice -1 users -1 =secret - /bin/sh admins,wheel \"Alice Liddell\"",
        )
        .unwrap();
        assert_eq!(spec.line, 3);
        assert_eq!(spec.username, "alice");
        assert_eq!(spec.uid, IdRequest::Auto(IdClass::User));
        assert_eq!(spec.gid, IdRequest::Auto(IdClass::User));
        assert_eq!(spec.credential, Credential::HashAndEnable("secret".to_string()));
        assert_eq!(spec.home, "-");
        assert_eq!(spec.groups, vec!["admins", "wheel"]);
        assert_eq!(spec.comment, "Alice Liddell");
    }

    #[test]
    fn comment_may_be_missing_or_unquoted() {
        let spec = UserSpec::parse(1, "daemon 2 daemon 2 * - - -").unwrap();
        assert_eq!(spec.comment, "");
        assert!(spec.groups.is_empty());

        let spec = UserSpec::parse(1, "ftp -2 ftp -2 * /srv/ftp - - FTP  daemon user").unwrap();
        assert_eq!(spec.uid, IdRequest::Auto(IdClass::System));
        assert_eq!(spec.comment, "FTP  daemon user");
    }

    #[test]
    fn separators_are_normalized() {
        let spec = UserSpec::parse(1, "bob -1 bob -1 ! - - ,audio,,video, Bob").unwrap();
        assert_eq!(spec.groups, vec!["audio", "video"]);
    }

    #[test]
    fn bad_ids_are_malformed() {
        for row in [
            "bob -3 bob -1 ! - - - x",
            "bob 1x bob -1 ! - - - x",
            "bob 1 bob 4294967296 ! - - - x",
            "bob 1 bob 4294967295 ! - - - x",
            "bob 4294967295 bob 1 ! - - - x",
        ] {
            let err = UserSpec::parse(7, row).unwrap_err();
            assert!(matches!(err, Error::MalformedField(_)), "{row}: {err}");
            assert!(err.to_string().starts_with("line 7:"), "{err}");
        }
    }

    #[test]
    fn short_row_is_malformed() {
        let err = UserSpec::parse(2, "bob -1 bob -1").unwrap_err();
        assert!(err.to_string().contains("found 4"), "{err}");
    }

    #[test]
    fn table_skips_comments_and_blank_lines() {
        let specs = parse_table(
            "# packages\n\n- -1 kvm -2 - - - - -\n  \nbob 1001 bob 1001 ! /home/bob /bin/sh - Bob\n",
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert!(!specs[0].has_account());
        assert_eq!(specs[1].line, 5);
    }
}

use super::Record;

/// Credential marker for groups nobody can `newgrp` into with a password.
pub const LOCKED_GROUP: &str = "*";

fn parse_members(field: &str) -> Vec<String> {
    let mut members: Vec<String> = Vec::new();
    for member in field.split(',').filter(|member| !member.is_empty()) {
        if !members.iter().any(|existing| existing == member) {
            members.push(member.to_string());
        }
    }
    members
}

/// Append `user` unless already listed. Returns whether the list changed.
fn push_member(members: &mut Vec<String>, user: &str) -> bool {
    if members.iter().any(|member| member == user) {
        false
    } else {
        members.push(user.to_string());
        true
    }
}

/// A line of `/etc/group`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub password: String,
    pub gid: u32,
    pub members: Vec<String>,
}

impl Group {
    pub fn new(name: &str, gid: u32) -> Self {
        Group {
            name: name.to_string(),
            password: "x".to_string(),
            gid,
            members: Vec::new(),
        }
    }

    pub fn add_member(&mut self, user: &str) -> bool {
        push_member(&mut self.members, user)
    }
}

impl Record for Group {
    const FILE: &'static str = "etc/group";

    fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        let [name, password, gid, members] = fields[..] else {
            return None;
        };
        Some(Group {
            name: name.to_string(),
            password: password.to_string(),
            gid: gid.parse().ok()?,
            members: parse_members(members),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name,
            self.password,
            self.gid,
            self.members.join(",")
        )
    }
}

/// A line of `/etc/gshadow`, mirroring a [`Group`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gshadow {
    pub name: String,
    pub password: String,
    pub admins: String,
    pub members: Vec<String>,
}

impl Gshadow {
    pub fn locked(name: &str) -> Self {
        Gshadow {
            name: name.to_string(),
            password: LOCKED_GROUP.to_string(),
            admins: String::new(),
            members: Vec::new(),
        }
    }

    pub fn add_member(&mut self, user: &str) -> bool {
        push_member(&mut self.members, user)
    }
}

impl Record for Gshadow {
    const FILE: &'static str = "etc/gshadow";

    fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        let [name, password, admins, members] = fields[..] else {
            return None;
        };
        Some(Gshadow {
            name: name.to_string(),
            password: password.to_string(),
            admins: admins.to_string(),
            members: parse_members(members),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name,
            self.password,
            self.admins,
            self.members.join(",")
        )
    }
}

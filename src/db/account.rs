use super::Record;

/// A line of `/etc/passwd`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Passwd {
    pub name: String,
    pub password: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub home: String,
    pub shell: String,
}

impl Passwd {
    pub fn new(name: &str, uid: u32, gid: u32, gecos: &str, home: &str, shell: &str) -> Self {
        Passwd {
            name: name.to_string(),
            password: "x".to_string(),
            uid,
            gid,
            gecos: gecos.to_string(),
            home: home.to_string(),
            shell: shell.to_string(),
        }
    }
}

impl Record for Passwd {
    const FILE: &'static str = "etc/passwd";

    fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        let [name, password, uid, gid, gecos, home, shell] = fields[..] else {
            return None;
        };
        Some(Passwd {
            name: name.to_string(),
            password: password.to_string(),
            uid: uid.parse().ok()?,
            gid: gid.parse().ok()?,
            gecos: gecos.to_string(),
            home: home.to_string(),
            shell: shell.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.name, self.password, self.uid, self.gid, self.gecos, self.home, self.shell
        )
    }
}

/// A line of `/etc/shadow`. Only the credential is modeled; the aging fields
/// of existing lines are carried through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shadow {
    pub name: String,
    pub credential: String,
    aging: String,
}

impl Shadow {
    pub fn new(name: &str, credential: &str) -> Self {
        Shadow {
            name: name.to_string(),
            credential: credential.to_string(),
            aging: ":::::::".to_string(),
        }
    }
}

impl Record for Shadow {
    const FILE: &'static str = "etc/shadow";

    fn parse(line: &str) -> Option<Self> {
        let (name, rest) = line.split_once(':')?;
        let (credential, aging) = match rest.find(':') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        Some(Shadow {
            name: name.to_string(),
            credential: credential.to_string(),
            aging: aging.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> String {
        format!("{}:{}{}", self.name, self.credential, self.aging)
    }
}

//! Credential field handling for shadow records.
//!
//! The table carries one of three things in its password column: a plaintext
//! secret to hash (`=secret`), a plaintext secret to hash and then lock
//! (`!=secret`), or a value stored as-is (pre-hashed values, `!`, `*`, ...).
//! Hashing itself is delegated to a [`PasswordHasher`].

use std::process::Command;

use crate::config::general::GeneralConfig;
use crate::{Error, Result};

/// Prefix placed in front of a hash to refuse password logins.
pub const LOCK_MARKER: &str = "!";

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HashMethod {
    #[default]
    Argon2,
    Md5,
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-512")]
    Sha512,
}

impl HashMethod {
    /// Name understood by `mkpasswd -m`.
    pub fn mkpasswd_name(self) -> &'static str {
        match self {
            HashMethod::Argon2 => "argon2",
            HashMethod::Md5 => "md5",
            HashMethod::Sha256 => "sha-256",
            HashMethod::Sha512 => "sha-512",
        }
    }
}

pub trait PasswordHasher {
    fn hash(&self, secret: &str) -> std::result::Result<String, String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    HashAndEnable(String),
    HashAndLock(String),
    Verbatim(String),
}

impl Credential {
    pub fn parse(field: &str) -> Result<Self> {
        let credential = if let Some(secret) = field.strip_prefix("!=") {
            Credential::HashAndLock(secret.to_string())
        } else if let Some(secret) = field.strip_prefix('=') {
            Credential::HashAndEnable(secret.to_string())
        } else {
            Credential::Verbatim(field.to_string())
        };

        match &credential {
            Credential::HashAndEnable(secret) | Credential::HashAndLock(secret)
                if secret.is_empty() =>
            {
                Err(Error::MalformedField(format!(
                    "password field '{field}' has no secret to hash"
                )))
            }
            Credential::Verbatim(value) if value.contains(':') || value.is_empty() => Err(
                Error::MalformedField(format!("invalid password field '{field}'")),
            ),
            _ => Ok(credential),
        }
    }

    /// Produce the value stored in the shadow record for `user`.
    pub fn encode(&self, user: &str, hasher: &dyn PasswordHasher) -> Result<String> {
        let hash = |secret: &str| {
            hasher.hash(secret).map_err(|reason| Error::Delegation {
                user: user.to_string(),
                reason,
                line: None,
            })
        };

        match self {
            Credential::HashAndEnable(secret) => hash(secret),
            Credential::HashAndLock(secret) => Ok(format!("{LOCK_MARKER}{}", hash(secret)?)),
            Credential::Verbatim(value) => Ok(value.clone()),
        }
    }
}

/// In-process argon2 with a random salt.
#[cfg(feature = "argon2")]
pub struct Argon2Hasher;

#[cfg(feature = "argon2")]
impl PasswordHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> std::result::Result<String, String> {
        let salt = format!("{:016X}", rand::random::<u64>());
        let config = argon2::Config::default();
        argon2::hash_encoded(secret.as_bytes(), salt.as_bytes(), &config)
            .map_err(|err| err.to_string())
    }
}

/// crypt(3) hashes produced by running `mkpasswd -m <method> <secret>`.
pub struct MkpasswdHasher {
    program: String,
    method: HashMethod,
}

impl MkpasswdHasher {
    pub fn new(program: impl Into<String>, method: HashMethod) -> Self {
        MkpasswdHasher {
            program: program.into(),
            method,
        }
    }
}

impl PasswordHasher for MkpasswdHasher {
    fn hash(&self, secret: &str) -> std::result::Result<String, String> {
        let output = Command::new(&self.program)
            .args(["-m", self.method.mkpasswd_name(), secret])
            .output()
            .map_err(|err| format!("failed to run {}: {}", self.program, err))?;

        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if hash.is_empty() || hash.contains(':') {
            return Err(format!("{} produced an unusable hash", self.program));
        }
        Ok(hash)
    }
}

/// Pick the hasher configured in `[general]`.
pub fn hasher_for(general: &GeneralConfig) -> Result<Box<dyn PasswordHasher>> {
    match general.hash_method() {
        #[cfg(feature = "argon2")]
        HashMethod::Argon2 => Ok(Box::new(Argon2Hasher)),
        #[cfg(not(feature = "argon2"))]
        HashMethod::Argon2 => Err(Error::Usage(
            "hash method 'argon2' requires the argon2 feature".to_string(),
        )),
        method => Ok(Box::new(MkpasswdHasher::new(general.mkpasswd(), method))),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::{Credential, PasswordHasher};

    /// Deterministic stand-in so tests can compare whole files.
    pub struct FakeHasher;

    impl PasswordHasher for FakeHasher {
        fn hash(&self, secret: &str) -> Result<String, String> {
            Ok(format!("$fake${}", secret.chars().rev().collect::<String>()))
        }
    }

    struct BrokenHasher;

    impl PasswordHasher for BrokenHasher {
        fn hash(&self, _secret: &str) -> Result<String, String> {
            Err("no entropy".to_string())
        }
    }

    #[test]
    fn prefixes_select_hash_mode() {
        assert_eq!(
            Credential::parse("=abc").unwrap(),
            Credential::HashAndEnable("abc".to_string())
        );
        assert_eq!(
            Credential::parse("!=abc").unwrap(),
            Credential::HashAndLock("abc".to_string())
        );
        assert_eq!(
            Credential::parse("$6$salt$hash").unwrap(),
            Credential::Verbatim("$6$salt$hash".to_string())
        );
        assert_eq!(
            Credential::parse("!").unwrap(),
            Credential::Verbatim("!".to_string())
        );
    }

    #[test]
    fn lock_prefixes_hash() {
        let encoded = Credential::parse("!=abc")
            .unwrap()
            .encode("alice", &FakeHasher)
            .unwrap();
        assert_eq!(encoded, "!$fake$cba");
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(Credential::parse("=").is_err());
        assert!(Credential::parse("!=").is_err());
    }

    #[test]
    fn hasher_failure_names_user() {
        let err = Credential::parse("=abc")
            .unwrap()
            .encode("bob", &BrokenHasher)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bob") && message.contains("no entropy"), "{message}");
    }

    #[cfg(feature = "argon2")]
    #[test]
    fn argon2_hashes_are_salted() {
        let hasher = super::Argon2Hasher;
        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();
        assert!(first.starts_with("$argon2"));
        assert_ne!(first, second);
    }
}

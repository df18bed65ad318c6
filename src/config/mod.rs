use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use anyhow::bail;
use anyhow::Result;

pub use self::range::{IdRange, IdRanges};

pub mod general;
pub mod range;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub include: Vec<PathBuf>,
    #[serde(default)]
    pub general: general::GeneralConfig,
    #[serde(default)]
    pub uid: IdRanges,
    #[serde(default)]
    pub gid: IdRanges,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut config: Config = match fs::read_to_string(path) {
            Ok(config_data) => match toml::from_str(&config_data) {
                Ok(config) => config,
                Err(err) => {
                    bail!("{}: failed to decode: {}", path.display(), err);
                }
            },
            Err(err) => {
                bail!("{}: failed to read: {}", path.display(), err);
            }
        };

        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut configs = mem::take(&mut config.include)
            .into_iter()
            .map(|path| Config::from_file(&config_dir.join(path)))
            .collect::<Result<Vec<Config>>>()?;
        configs.push(config); // Put ourself last to ensure that it overwrites anything else.

        config = configs.remove(0);

        for other_config in configs {
            config.merge(other_config);
        }

        Ok(config)
    }

    pub fn merge(&mut self, other: Config) {
        let Config {
            include: _,
            general: other_general,
            uid: other_uid,
            gid: other_gid,
        } = other;

        self.general.merge(other_general);
        self.uid.merge(other_uid);
        self.gid.merge(other_gid);
    }

    /// Reject ranges that could hand out id 0 or that are empty.
    pub fn validate(&self) -> crate::Result<()> {
        self.uid.validate("uid")?;
        self.gid.validate("gid")
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::Config;
    use crate::credential::HashMethod;
    use crate::IdRange;

    #[test]
    fn defaults_match_usual_ranges() {
        let config = Config::default();
        assert_eq!(config.uid.user(), IdRange { min: 1000, max: 1999 });
        assert_eq!(config.gid.system(), IdRange { min: 100, max: 999 });
        assert_eq!(config.general.hash_method(), HashMethod::Argon2);
        config.validate().unwrap();
    }

    #[test]
    fn included_file_is_overridden_by_includer() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            "[general]\nhash_method = \"md5\"\n\n[uid.user]\nmin = 2000\nmax = 2999\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("image.toml"),
            "include = [\"base.toml\"]\n\n[general]\nhash_method = \"sha-512\"\n",
        )
        .unwrap();

        let config = Config::from_file(&dir.path().join("image.toml")).unwrap();
        assert_eq!(config.general.hash_method(), HashMethod::Sha512);
        assert_eq!(config.uid.user(), IdRange { min: 2000, max: 2999 });
        assert!(config.include.is_empty());
    }

    #[test]
    fn zero_floor_is_a_usage_error() {
        let config: Config = toml::from_str("[gid.user]\nmin = 0\nmax = 10\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, crate::Error::Usage(_)), "{err}");
    }

    #[test]
    fn missing_file_names_path() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/mkusers.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mkusers.toml"));
    }
}

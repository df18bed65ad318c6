use crate::credential::HashMethod;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub hash_method: Option<HashMethod>,
    // Only consulted for the crypt(3) methods
    pub mkpasswd: Option<String>,
}

impl GeneralConfig {
    pub fn merge(&mut self, other: GeneralConfig) {
        self.hash_method = other.hash_method.or(self.hash_method);
        self.mkpasswd = other.mkpasswd.or(self.mkpasswd.take());
    }

    pub fn hash_method(&self) -> HashMethod {
        self.hash_method.unwrap_or_default()
    }

    pub fn mkpasswd(&self) -> &str {
        self.mkpasswd.as_deref().unwrap_or("mkpasswd")
    }
}

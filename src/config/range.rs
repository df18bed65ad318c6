use crate::table::IdClass;
use crate::{Error, Result};

/// Inclusive bounds for automatic id allocation.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IdRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IdRanges {
    pub user: Option<IdRange>,
    pub system: Option<IdRange>,
}

impl IdRanges {
    pub const DEFAULT_USER: IdRange = IdRange { min: 1000, max: 1999 };
    pub const DEFAULT_SYSTEM: IdRange = IdRange { min: 100, max: 999 };

    pub fn user(&self) -> IdRange {
        self.user.unwrap_or(Self::DEFAULT_USER)
    }

    pub fn system(&self) -> IdRange {
        self.system.unwrap_or(Self::DEFAULT_SYSTEM)
    }

    pub fn get(&self, class: IdClass) -> IdRange {
        match class {
            IdClass::User => self.user(),
            IdClass::System => self.system(),
        }
    }

    pub fn merge(&mut self, other: IdRanges) {
        self.user = other.user.or(self.user);
        self.system = other.system.or(self.system);
    }

    pub(crate) fn validate(&self, kind: &str) -> Result<()> {
        for (class, range) in [("user", self.user()), ("system", self.system())] {
            if range.min == 0 {
                return Err(Error::Usage(format!(
                    "{kind}.{class}: allocation range must start above 0"
                )));
            }
            if range.min > range.max {
                return Err(Error::Usage(format!(
                    "{kind}.{class}: min {} is greater than max {}",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

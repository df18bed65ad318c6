use std::path::Path;

use crate::config::{Config, IdRanges};
use crate::credential::PasswordHasher;
use crate::db::RecordStore;
use crate::home::OwnershipDirective;
use crate::synth::{apply_group, apply_user};
use crate::table::{IdClass, IdRequest, UserSpec};
use crate::Result;

/// Result of a successful run: the updated database and the home
/// directories still to be created.
#[derive(Debug)]
pub struct Outcome {
    pub store: RecordStore,
    pub directives: Vec<OwnershipDirective>,
}

/// One synthesis over a table. Consumed by [`Run::apply`], so a failed run
/// leaves nothing behind to flush by mistake.
pub struct Run {
    store: RecordStore,
    uid: IdRanges,
    gid: IdRanges,
    hasher: Box<dyn PasswordHasher>,
}

impl Run {
    pub fn new(config: &Config, store: RecordStore, hasher: Box<dyn PasswordHasher>) -> Result<Self> {
        config.validate()?;
        Ok(Run {
            store,
            uid: config.uid.clone(),
            gid: config.gid.clone(),
            hasher,
        })
    }

    /// Apply every row in five passes, so explicit ids are claimed before
    /// anything is allocated automatically and groups exist before users.
    /// Errors carry the table line of the row that failed.
    pub fn apply(mut self, specs: &[UserSpec]) -> Result<Outcome> {
        log::debug!("groups with a fixed gid");
        for spec in specs.iter().filter(|spec| spec.gid.is_fixed()) {
            apply_group(&mut self.store, &spec.group, spec.gid, &self.gid)
                .map_err(|err| err.at_line(spec.line))?;
        }

        log::debug!("groups with an automatic gid");
        for spec in specs.iter().filter(|spec| !spec.gid.is_fixed()) {
            apply_group(&mut self.store, &spec.group, spec.gid, &self.gid)
                .map_err(|err| err.at_line(spec.line))?;
        }

        log::debug!("secondary groups");
        for spec in specs.iter().filter(|spec| spec.has_account()) {
            for group in &spec.groups {
                apply_group(
                    &mut self.store,
                    group,
                    IdRequest::Auto(IdClass::User),
                    &self.gid,
                )
                .map_err(|err| err.at_line(spec.line))?;
            }
        }

        let mut directives = Vec::new();

        log::debug!("users with a fixed uid");
        for spec in specs
            .iter()
            .filter(|spec| spec.has_account() && spec.uid.is_fixed())
        {
            let directive = apply_user(&mut self.store, spec, &self.uid, &*self.hasher)
                .map_err(|err| err.at_line(spec.line))?;
            directives.extend(directive);
        }

        log::debug!("users with an automatic uid");
        for spec in specs
            .iter()
            .filter(|spec| spec.has_account() && !spec.uid.is_fixed())
        {
            let directive = apply_user(&mut self.store, spec, &self.uid, &*self.hasher)
                .map_err(|err| err.at_line(spec.line))?;
            directives.extend(directive);
        }

        Ok(Outcome {
            store: self.store,
            directives,
        })
    }

    /// Load the database under `root`, apply `specs` and write the result back.
    /// Nothing is written unless every row applied cleanly.
    pub fn execute(
        root: &Path,
        config: &Config,
        specs: &[UserSpec],
        hasher: Box<dyn PasswordHasher>,
    ) -> Result<Vec<OwnershipDirective>> {
        let store = RecordStore::load(root)?;
        let outcome = Run::new(config, store, hasher)?.apply(specs)?;
        outcome.store.flush(root)?;
        Ok(outcome.directives)
    }
}

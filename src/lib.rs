#![deny(warnings)]

#[macro_use]
extern crate serde_derive;

pub use config::{Config, IdRange, IdRanges};
pub use credential::{Credential, HashMethod, PasswordHasher};
pub use db::RecordStore;
pub use error::{Error, Result};
pub use home::OwnershipDirective;
pub use run::{Outcome, Run};
pub use table::{parse_table, IdRequest, UserSpec};

mod alloc;
pub mod config;
pub mod credential;
pub mod db;
mod error;
pub mod home;
mod run;
mod synth;
pub mod table;
mod validate;

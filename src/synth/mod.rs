pub(crate) use self::group::{add_member, apply_group};
pub(crate) use self::user::apply_user;

mod group;
mod user;

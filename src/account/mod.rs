/// Account roles and storage
///
/// Accounts are registered elsewhere; this module reads them and applies the
/// role changes decided by moderation.

mod role;
mod store;

pub use crate::db::account::{Account, NewAccount};
pub use role::{Role, UnknownRole};
pub use store::{AccountField, AccountFilter, AccountStore};

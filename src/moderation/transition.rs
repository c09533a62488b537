/// Role state machine
///
/// Only `member` accounts can be moderated, and only into `restricted` or
/// `banned`. Both are terminal here; nothing in this subsystem moves an
/// account out of them.
use crate::account::Role;
use crate::error::{ModError, ModResult};

/// Check a moderation transition and return the role to store
pub fn attempt_transition(current: Role, target: Role) -> ModResult<Role> {
    match (current, target) {
        (Role::Member, Role::Restricted) | (Role::Member, Role::Banned) => Ok(target),
        (Role::Member, _) => Err(ModError::IneligibleTarget(format!(
            "{} is not a moderation outcome",
            target
        ))),
        _ => Err(ModError::IneligibleTarget(format!(
            "Cannot moderate an account with role {}",
            current
        ))),
    }
}

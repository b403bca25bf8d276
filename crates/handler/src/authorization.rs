use rolegate_schema::{ExecutionContext, FieldError, FieldResult, TraversalNode};

use crate::{GatewayError, PathTracker};

/// Whether any role grants `full_path`.
///
/// A role matches when it is a case-insensitive substring of the path, or the
/// path is a case-insensitive substring of the role. Coarse roles such as
/// `mutation.user` therefore cover everything below them, and narrow roles
/// pass the coarse checkpoints on the way down.
pub fn is_allowed<S: AsRef<str>>(roles: &[S], full_path: &str) -> bool {
    let full_path = full_path.to_lowercase();
    roles.iter().any(|role| {
        let role = role.as_ref().to_lowercase();
        full_path.contains(&role) || role.contains(&full_path)
    })
}

/// Per-request authorization state.
#[derive(Debug, Clone)]
pub enum Authorization {
    /// Every field is authorized and no path is tracked.
    Disabled,
    Enforced { roles: Vec<String>, tracker: PathTracker },
}

impl Authorization {
    /// Reads the caller's roles once. Asking for enforcement with a context
    /// that cannot report roles is a configuration fault.
    pub fn for_context(enabled: bool, ctx: &dyn ExecutionContext) -> Result<Self, GatewayError> {
        if !enabled {
            return Ok(Authorization::Disabled);
        }
        let roles = ctx.user_roles().ok_or(GatewayError::RolesUnavailable)?;
        Ok(Authorization::Enforced {
            roles: roles.to_vec(),
            tracker: PathTracker::new(),
        })
    }

    pub fn authorize(&mut self, node: &TraversalNode<'_>) -> FieldResult<()> {
        let Authorization::Enforced { roles, tracker } = self else {
            return Ok(());
        };

        tracker.update(node);
        let full_path = tracker.full_path(node.operation_keyword());
        if is_allowed(roles, &full_path) {
            Ok(())
        } else {
            tracing::debug!(path = %full_path, field = %node.dotted_path(), "Permission denied.");
            Err(FieldError::permission_denied())
        }
    }
}

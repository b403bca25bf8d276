use rolegate_schema::ExecutionContext;

/// Caller identity as established by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    user: Option<String>,
    roles: Option<Vec<String>>,
}

impl UserContext {
    pub fn new(user: Option<String>, roles: Vec<String>) -> Self {
        Self {
            user,
            roles: Some(roles),
        }
    }

    /// A context that can name the caller but knows nothing about roles.
    pub fn without_roles(user: Option<String>) -> Self {
        Self { user, roles: None }
    }
}

impl ExecutionContext for UserContext {
    fn user_roles(&self) -> Option<&[String]> {
        self.roles.as_deref()
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

//! Requester identity and permission checks

use serde::{Deserialize, Serialize};

/// Permission that grants everything
pub const ADMIN: &str = "admin";

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }
}

/// Per-request state handed to every route and hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user: Option<User>,
}

impl RequestContext {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    #[must_use]
    pub const fn for_user(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// A local administrator, used by the command line
    #[must_use]
    pub fn local_admin() -> Self {
        Self::for_user(User::new("local", "Local administrator").with_permission(ADMIN))
    }
}

/// Permission evaluation collaborator
pub trait Permissions: Send + Sync {
    fn can(&self, ctx: &RequestContext, permission: &str) -> bool;
}

/// Grants a permission when the user holds it or holds [`ADMIN`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPermissions;

impl Permissions for UserPermissions {
    fn can(&self, ctx: &RequestContext, permission: &str) -> bool {
        ctx.user.as_ref().is_some_and(|user| {
            user.permissions
                .iter()
                .any(|held| held == ADMIN || held == permission)
        })
    }
}

/// The permission needed to edit pieces of `type_name`
#[must_use]
pub fn edit_permission(type_name: &str) -> String {
    format!("edit-{type_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_permissions() {
        let editor = RequestContext::for_user(User::new("u1", "Ed").with_permission("edit-article"));
        assert!(UserPermissions.can(&editor, &edit_permission("article")));
        assert!(!UserPermissions.can(&editor, &edit_permission("event")));

        assert!(UserPermissions.can(&RequestContext::local_admin(), "edit-event"));
        assert!(!UserPermissions.can(&RequestContext::anonymous(), "edit-article"));
    }
}

//! Authentication errors.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// No credentials were presented.
    #[error("authentication required")]
    MissingCredentials,

    /// User not found.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// User already exists.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Token invalid, of the wrong kind, or signed with another key.
    #[error("token invalid")]
    InvalidToken,

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// Token issued before the user's last logout.
    #[error("token revoked")]
    TokenRevoked,

    /// Password too weak.
    #[error("password too weak: {0}")]
    WeakPassword(String),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Insufficient permissions.
    #[error("missing permission: {0}")]
    InsufficientPermissions(String),

    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("role already exists: {0}")]
    RoleAlreadyExists(String),

    /// Built-in roles cannot be edited or deleted.
    #[error("role {0} is built in")]
    BuiltInRole(String),

    #[error("role {0} is assigned to users")]
    RoleInUse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid role name: {0}")]
    InvalidRoleName(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] shopline_db::DbError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::MissingCredentials
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::TokenRevoked
        )
    }

    /// Check if this is a permission error.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, AuthError::InsufficientPermissions(_))
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AuthError::UserNotFound(_) | AuthError::RoleNotFound(_) => true,
            AuthError::Database(e) => e.is_not_found(),
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AuthError::UserAlreadyExists(_)
                | AuthError::RoleAlreadyExists(_)
                | AuthError::BuiltInRole(_)
                | AuthError::RoleInUse(_)
                | AuthError::Database(shopline_db::DbError::Duplicate { .. })
        )
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::Validation(_)
                | AuthError::InvalidRoleName(_)
        )
    }
}

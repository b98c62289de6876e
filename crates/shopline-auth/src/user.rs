//! User types.

use crate::permission::{Permission, CUSTOMER_ROLE};
use crate::AuthError;
use serde::{Deserialize, Serialize};
use shopline_commerce::ids::UserId;
use shopline_db::Document;

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    /// User ID.
    pub id: UserId,
    /// Email address, lowercased and unique.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Role name.
    pub role: String,
    /// Bumped on logout; tokens carrying an older version are rejected.
    pub token_version: i64,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Document for UserAccount {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl UserAccount {
    /// Create a new account.
    pub fn new(
        email: &str,
        name: &str,
        phone: Option<String>,
        password_hash: String,
        role: &str,
    ) -> Self {
        let now = current_timestamp();
        Self {
            id: UserId::generate(),
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            phone,
            password_hash,
            role: role.to_string(),
            token_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Revoke every outstanding token.
    pub fn bump_token_version(&mut self) {
        self.token_version += 1;
        self.updated_at = current_timestamp();
    }

    pub fn set_role(&mut self, role: &str) {
        self.role = role.to_string();
        self.updated_at = current_timestamp();
    }

    pub fn set_password_hash(&mut self, hash: impl Into<String>) {
        self.password_hash = hash.into();
        self.updated_at = current_timestamp();
    }

    /// Public view without the password hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }
}

/// User profile data (public-facing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: i64,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Check the email shape and name. Password strength is checked by the hasher.
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_email(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }
        Ok(())
    }

    pub fn role(&self) -> &'static str {
        CUSTOMER_ROLE
    }
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The authenticated principal of a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: String,
    pub permissions: Vec<Permission>,
}

impl AuthUser {
    pub fn new(account: &UserAccount, permissions: Vec<Permission>) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            role: account.role.clone(),
            permissions,
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Fail unless the principal holds `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions(permission.to_string()))
        }
    }
}

/// Lowercase an email and check its basic shape.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    validate_email(&email)?;
    Ok(email)
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_lowercases_email() {
        let user = UserAccount::new(" Buyer@Example.COM ", " Rahim ", None, "h".into(), "customer");
        assert_eq!(user.email, "buyer@example.com");
        assert_eq!(user.name, "Rahim");
        assert_eq!(user.token_version, 0);
    }

    #[test]
    fn test_bump_token_version() {
        let mut user = UserAccount::new("a@b.co", "A", None, "h".into(), "customer");
        user.bump_token_version();
        user.bump_token_version();
        assert_eq!(user.token_version, 2);
    }

    #[test]
    fn test_profile_hides_hash() {
        let user = UserAccount::new("a@b.co", "A", None, "secret-hash".into(), "staff");
        let json = serde_json::to_string(&user.profile()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("staff"));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(normalize_email("A@B.co").unwrap(), "a@b.co");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@localhost").is_err());
        assert!(normalize_email("a b@c.com").is_err());
    }

    #[test]
    fn test_auth_user_require() {
        let account = UserAccount::new("s@shop.com", "S", None, "h".into(), "staff");
        let principal = AuthUser::new(&account, vec![Permission::CatalogWrite]);
        assert!(principal.require(Permission::CatalogWrite).is_ok());
        assert!(matches!(
            principal.require(Permission::UserManage),
            Err(AuthError::InsufficientPermissions(p)) if p == "user:manage"
        ));
    }
}

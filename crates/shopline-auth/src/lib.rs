//! Authentication for Shopline.
//!
//! Provides user accounts, password hashing, JWT access/refresh tokens,
//! and role-based permissions.

mod error;
mod password;
mod permission;
mod token;
mod user;

pub use error::AuthError;
pub use password::{PasswordHasher, MIN_PASSWORD_LEN};
pub use permission::{Permission, RoleDoc, ADMIN_ROLE, CUSTOMER_ROLE, STAFF_ROLE};
pub use token::{
    Claims, TokenIssuer, TokenKind, TokenPair, DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS,
};
pub use user::{normalize_email, AuthUser, LoginRequest, RegisterRequest, UserAccount, UserProfile};

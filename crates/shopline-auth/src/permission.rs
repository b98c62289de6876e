//! Permissions and roles.
//!
//! A role is a named set of permissions. Users carry exactly one role name;
//! admin endpoints check a single permission of that role.

use crate::AuthError;
use serde::{Deserialize, Serialize};
use shopline_db::Document;
use std::fmt;
use std::str::FromStr;

/// A capability checked by admin endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "catalog:write")]
    CatalogWrite,
    #[serde(rename = "inventory:read")]
    InventoryRead,
    #[serde(rename = "inventory:write")]
    InventoryWrite,
    #[serde(rename = "purchase:write")]
    PurchaseWrite,
    #[serde(rename = "transfer:write")]
    TransferWrite,
    #[serde(rename = "order:manage")]
    OrderManage,
    #[serde(rename = "banner:write")]
    BannerWrite,
    #[serde(rename = "user:manage")]
    UserManage,
}

impl Permission {
    /// Every permission.
    pub const ALL: [Permission; 8] = [
        Permission::CatalogWrite,
        Permission::InventoryRead,
        Permission::InventoryWrite,
        Permission::PurchaseWrite,
        Permission::TransferWrite,
        Permission::OrderManage,
        Permission::BannerWrite,
        Permission::UserManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CatalogWrite => "catalog:write",
            Permission::InventoryRead => "inventory:read",
            Permission::InventoryWrite => "inventory:write",
            Permission::PurchaseWrite => "purchase:write",
            Permission::TransferWrite => "transfer:write",
            Permission::OrderManage => "order:manage",
            Permission::BannerWrite => "banner:write",
            Permission::UserManage => "user:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

/// Role every new account gets.
pub const CUSTOMER_ROLE: &str = "customer";
pub const STAFF_ROLE: &str = "staff";
pub const ADMIN_ROLE: &str = "admin";

/// A named set of permissions, stored with its name as id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleDoc {
    pub name: String,
    pub permissions: Vec<Permission>,
    /// Seeded at startup and immutable.
    pub built_in: bool,
}

impl Document for RoleDoc {
    const COLLECTION: &'static str = "roles";

    fn id(&self) -> &str {
        &self.name
    }
}

impl RoleDoc {
    /// Create a custom role.
    pub fn custom(name: &str, permissions: Vec<Permission>) -> Result<Self, AuthError> {
        let name = validate_role_name(name)?;
        Ok(Self {
            name,
            permissions: normalize(permissions),
            built_in: false,
        })
    }

    /// The roles seeded on every start.
    pub fn built_ins() -> Vec<RoleDoc> {
        vec![
            RoleDoc {
                name: CUSTOMER_ROLE.to_string(),
                permissions: Vec::new(),
                built_in: true,
            },
            RoleDoc {
                name: STAFF_ROLE.to_string(),
                permissions: vec![
                    Permission::CatalogWrite,
                    Permission::InventoryRead,
                    Permission::OrderManage,
                ],
                built_in: true,
            },
            RoleDoc {
                name: ADMIN_ROLE.to_string(),
                permissions: Permission::ALL.to_vec(),
                built_in: true,
            },
        ]
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Replace the permission set of a custom role.
    pub fn set_permissions(&mut self, permissions: Vec<Permission>) -> Result<(), AuthError> {
        if self.built_in {
            return Err(AuthError::BuiltInRole(self.name.clone()));
        }
        self.permissions = normalize(permissions);
        Ok(())
    }
}

fn normalize(mut permissions: Vec<Permission>) -> Vec<Permission> {
    permissions.sort();
    permissions.dedup();
    permissions
}

fn validate_role_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim().to_lowercase();
    let valid = !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid {
        return Err(AuthError::InvalidRoleName(name));
    }
    Ok(name)
}

//! Stock-holding locations.

use crate::error::CommerceError;
use crate::ids::LocationId;
use crate::util::{now, required};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// What kind of place a location is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    #[default]
    Warehouse,
    Outlet,
}

/// A warehouse or outlet that holds stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Short uppercase code, unique (e.g. `DHK-WH`).
    pub code: String,
    pub kind: LocationKind,
    pub address: Option<String>,
    /// Storefront orders are fulfilled from the default location.
    pub is_default: bool,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document for Location {
    const COLLECTION: &'static str = "locations";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub kind: Option<LocationKind>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub kind: Option<LocationKind>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Location {
    pub fn create(input: NewLocation) -> Result<Self, CommerceError> {
        let now = now();
        Ok(Self {
            id: LocationId::generate(),
            name: required("name", &input.name)?,
            code: normalize_code(&input.code)?,
            kind: input.kind.unwrap_or_default(),
            address: input.address,
            is_default: input.is_default,
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: LocationPatch) -> Result<(), CommerceError> {
        if let Some(name) = patch.name {
            self.name = required("name", &name)?;
        }
        if let Some(code) = patch.code {
            self.code = normalize_code(&code)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(is_default) = patch.is_default {
            self.is_default = is_default;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        if self.is_default && !self.active {
            return Err(CommerceError::ValidationError(
                "the default location must be active".to_string(),
            ));
        }
        self.updated_at = now();
        Ok(())
    }
}

fn normalize_code(code: &str) -> Result<String, CommerceError> {
    let code = required("code", code)?.to_uppercase();
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CommerceError::ValidationError(format!(
            "invalid location code: {:?}",
            code
        )));
    }
    Ok(code)
}

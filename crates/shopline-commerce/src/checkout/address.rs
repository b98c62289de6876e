//! Address types.

use crate::error::CommerceError;
use crate::util::required;
use serde::{Deserialize, Serialize};

/// A delivery address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Address {
    /// Recipient name.
    pub name: String,
    /// Contact phone for the courier.
    pub phone: String,
    /// Address line 1.
    pub line1: String,
    /// Address line 2 (apt, road, etc.).
    #[serde(default)]
    pub line2: Option<String>,
    /// Area or thana.
    #[serde(default)]
    pub area: Option<String>,
    /// City or district.
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    /// Country name.
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "Bangladesh".to_string()
}

impl Address {
    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.clone()];
        if let Some(ref line2) = self.line2 {
            parts.push(line2.clone());
        }
        if let Some(ref area) = self.area {
            parts.push(area.clone());
        }
        parts.push(self.city.clone());
        if let Some(ref postal_code) = self.postal_code {
            parts.push(postal_code.clone());
        }
        parts.push(self.country.clone());
        parts.join(", ")
    }

    /// Trim the fields and reject blanks in required ones.
    pub fn validated(self) -> Result<Self, CommerceError> {
        let phone = required("phone", &self.phone)?;
        if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
        {
            return Err(CommerceError::ValidationError(format!(
                "invalid phone number: {:?}",
                phone
            )));
        }
        Ok(Self {
            name: required("name", &self.name)?,
            phone,
            line1: required("line1", &self.line1)?,
            line2: self.line2.filter(|s| !s.trim().is_empty()),
            area: self.area.filter(|s| !s.trim().is_empty()),
            city: required("city", &self.city)?,
            postal_code: self.postal_code.filter(|s| !s.trim().is_empty()),
            country: required("country", &self.country)?,
        })
    }
}

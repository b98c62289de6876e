//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a ProductId where a VariantId is expected.
//!
//! Generated ids are 24 lowercase hex characters: a 4-byte big-endian Unix
//! timestamp followed by 8 random bytes, so they sort roughly by creation.

use crate::CommerceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a generated id in hex characters.
pub const ID_LEN: usize = 24;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident, $label:literal) => {
        #[doc = concat!("Unique ", $label, " identifier.")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(generate_id())
            }

            /// Parse an externally supplied id, rejecting malformed input.
            pub fn parse(id: &str) -> Result<Self, CommerceError> {
                if is_valid_id(id) {
                    Ok(Self(id.to_string()))
                } else {
                    Err(CommerceError::ValidationError(format!(
                        "malformed {} id: {:?}",
                        $label, id
                    )))
                }
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&$name> for shopline_db::Value {
            fn from(id: &$name) -> Self {
                shopline_db::Value::Text(id.0.clone())
            }
        }

        impl From<$name> for shopline_db::Value {
            fn from(id: $name) -> Self {
                shopline_db::Value::Text(id.0)
            }
        }
    };
}

define_id!(ProductId, "product");
define_id!(VariantId, "variant");
define_id!(CategoryId, "category");
define_id!(SubcategoryId, "subcategory");
define_id!(LocationId, "location");
define_id!(LotId, "stock lot");
define_id!(AdjustmentId, "inventory adjustment");
define_id!(PurchaseId, "purchase");
define_id!(TransferId, "transfer");
define_id!(LineItemId, "cart line");
define_id!(OrderId, "order");
define_id!(PaymentId, "payment");
define_id!(BannerId, "banner");
define_id!(UserId, "user");

/// Check whether a string has the shape of a generated id.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Generate a unique ID from the current time and random bytes.
fn generate_id() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 12];
    let ts = crate::util::now() as u32;
    bytes[..4].copy_from_slice(&ts.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}

/// Short random suffix for human-readable document numbers (e.g. `ORD-…-3fa2`).
pub(crate) fn short_suffix() -> String {
    use rand::Rng;
    let n: u16 = rand::thread_rng().gen();
    format!("{:04x}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = ProductId::new("prod-123");
        assert_eq!(id.as_str(), "prod-123");
    }

    #[test]
    fn test_id_generation() {
        let id1 = ProductId::generate();
        let id2 = ProductId::generate();
        assert_ne!(id1, id2);
        assert!(is_valid_id(id1.as_str()));
    }

    #[test]
    fn test_id_parse() {
        let generated = OrderId::generate();
        assert_eq!(OrderId::parse(generated.as_str()).unwrap(), generated);

        assert!(OrderId::parse("not-an-id").is_err());
        assert!(OrderId::parse("65A1C0DE0000000000000001").is_err());
        assert!(OrderId::parse("65a1c0de0000000000000001").is_ok());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = CategoryId::new("65a1c0de0000000000000001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65a1c0de0000000000000001\"");
    }

    #[test]
    fn test_id_equality() {
        let id1 = ProductId::new("same");
        let id2 = ProductId::new("same");
        let id3 = ProductId::new("different");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }
}

//! Transactional operations behind the HTTP handlers.
//!
//! Every operation that touches more than one document opens a transaction
//! with `db.begin()` and runs all reads and writes on it. Dropping the
//! transaction without `commit()` rolls everything back, so an early `?`
//! return leaves the store untouched.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod purchase;
pub mod storefront;
pub mod transfer;
pub mod wishlist;

use shopline_commerce::CommerceError;
use shopline_db::{Connection, Document, DocumentStore};

use crate::error::AppError;

/// Load a document by id, mapping absence to a domain not-found error.
pub(crate) async fn load<T: Document>(
    conn: &mut Connection,
    id: &str,
    missing: fn(String) -> CommerceError,
) -> Result<T, AppError> {
    match conn.get::<T>(id).await? {
        Some(doc) => Ok(doc),
        None => Err(missing(id.to_string()).into()),
    }
}

//! Type-safe document store for Shopline.
//!
//! Every aggregate is persisted as a JSON document inside a single SQLite
//! table, grouped by collection. The API mirrors a document database:
//! typed `get`/`insert`/`save`, filters over JSON paths, pagination and
//! multi-document transactions.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopline_db::{Db, Document, DocumentStore, Filter, PageRequest, Sort};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Category {
//!     id: String,
//!     name: String,
//!     active: bool,
//! }
//!
//! impl Document for Category {
//!     const COLLECTION: &'static str = "categories";
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! let db = Db::connect("sqlite://shop.db", 5).await?;
//! db.migrate().await?;
//!
//! let mut tx = db.begin().await?;
//! tx.insert(&category).await?;
//! tx.commit().await?;
//!
//! let mut conn = db.acquire().await?;
//! let page = conn
//!     .page::<Category>(&Filter::new().eq("active", true), &Sort::Newest, PageRequest::default())
//!     .await?;
//! ```

mod db;
mod error;
mod page;
mod store;
mod types;

pub use db::Db;
pub use error::DbError;
pub use page::{Page, PageRequest, Pagination, DEFAULT_LIMIT, MAX_LIMIT};
pub use store::{Document, DocumentStore};
pub use types::{Condition, Filter, Query, Sort, Value};

/// Connection type every store operation runs on.
///
/// Both pooled connections and open transactions dereference to it.
pub use sqlx::SqliteConnection as Connection;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Db, DbError, Document, DocumentStore, Filter, Page, PageRequest, Pagination, Query, Sort,
        Value,
    };
}

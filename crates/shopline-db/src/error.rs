//! Database error types.

use thiserror::Error;

/// Errors that can occur when using the document store.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open the database.
    #[error("Failed to open database: {0}")]
    OpenError(String),

    /// Failed to execute a query.
    #[error("Query execution failed: {0}")]
    QueryError(#[from] sqlx::Error),

    /// Failed to (de)serialize a document body.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// A filter or sort referenced an unusable field path.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A document with the same id already exists in the collection.
    #[error("Document already exists: {collection}/{id}")]
    Duplicate { collection: &'static str, id: String },

    /// No document with the given id exists in the collection.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: &'static str, id: String },
}

impl DbError {
    /// Check if this is a missing-document error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

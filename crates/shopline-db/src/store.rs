//! Typed document operations on a connection or transaction.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqliteConnection;

use crate::{DbError, Filter, Page, PageRequest, Pagination, Query, Sort, Value};

/// A type stored as one JSON document in a named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Unpin {
    /// Collection name.
    const COLLECTION: &'static str;

    /// Document id, unique within the collection.
    fn id(&self) -> &str;
}

/// Bind a list of [`Value`]s onto a sqlx query in order.
macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Integer(i) => query.bind(*i),
                Value::Real(f) => query.bind(*f),
                Value::Text(s) => query.bind(s.clone()),
            };
        }
        query
    }};
}

/// Document operations.
///
/// Implemented for [`SqliteConnection`], so the same calls work on a pooled
/// connection (`db.acquire()`) and inside a transaction (`db.begin()`).
#[async_trait]
pub trait DocumentStore {
    /// Get a document by id.
    async fn get<T: Document>(&mut self, id: &str) -> Result<Option<T>, DbError>;

    /// Get a document by id, failing with [`DbError::NotFound`] if absent.
    async fn require<T: Document>(&mut self, id: &str) -> Result<T, DbError>;

    /// Insert a new document, failing with [`DbError::Duplicate`] if the id exists.
    async fn insert<T: Document>(&mut self, doc: &T) -> Result<(), DbError>;

    /// Insert or replace a document.
    async fn save<T: Document>(&mut self, doc: &T) -> Result<(), DbError>;

    /// Replace an existing document, failing with [`DbError::NotFound`] if absent.
    async fn update<T: Document>(&mut self, doc: &T) -> Result<(), DbError>;

    /// Delete a document. Returns whether it existed.
    async fn delete<T: Document>(&mut self, id: &str) -> Result<bool, DbError>;

    /// Find documents matching a query.
    async fn find<T: Document>(&mut self, query: &Query) -> Result<Vec<T>, DbError>;

    /// Find the first document matching a filter.
    async fn find_one<T: Document>(&mut self, filter: &Filter) -> Result<Option<T>, DbError>;

    /// Count documents matching a filter.
    async fn count<T: Document>(&mut self, filter: &Filter) -> Result<i64, DbError>;

    /// Fetch one page of documents matching a filter.
    async fn page<T: Document>(
        &mut self,
        filter: &Filter,
        sort: &Sort,
        request: PageRequest,
    ) -> Result<Page<T>, DbError>;
}

#[async_trait]
impl DocumentStore for SqliteConnection {
    async fn get<T: Document>(&mut self, id: &str) -> Result<Option<T>, DbError> {
        let body: Option<String> = sqlx::query_scalar::<_, String>(
            "SELECT body FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(T::COLLECTION)
        .bind(id.to_string())
        .fetch_optional(&mut *self)
        .await?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn require<T: Document>(&mut self, id: &str) -> Result<T, DbError> {
        self.get::<T>(id).await?.ok_or_else(|| DbError::NotFound {
            collection: T::COLLECTION,
            id: id.to_string(),
        })
    }

    async fn insert<T: Document>(&mut self, doc: &T) -> Result<(), DbError> {
        let body = serde_json::to_string(doc)?;
        let now = current_millis();
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(T::COLLECTION)
        .bind(doc.id().to_string())
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&mut *self)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DbError::Duplicate {
                collection: T::COLLECTION,
                id: doc.id().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save<T: Document>(&mut self, doc: &T) -> Result<(), DbError> {
        let body = serde_json::to_string(doc)?;
        let now = current_millis();
        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (collection, id) DO UPDATE SET \
             body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(T::COLLECTION)
        .bind(doc.id().to_string())
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&mut *self)
        .await?;
        Ok(())
    }

    async fn update<T: Document>(&mut self, doc: &T) -> Result<(), DbError> {
        let body = serde_json::to_string(doc)?;
        let result = sqlx::query(
            "UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(body)
        .bind(current_millis())
        .bind(T::COLLECTION)
        .bind(doc.id().to_string())
        .execute(&mut *self)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                collection: T::COLLECTION,
                id: doc.id().to_string(),
            });
        }
        Ok(())
    }

    async fn delete<T: Document>(&mut self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(T::COLLECTION)
            .bind(id.to_string())
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find<T: Document>(&mut self, query: &Query) -> Result<Vec<T>, DbError> {
        let (clause, mut binds) = query.filter.compile()?;
        let sql = format!(
            "SELECT body FROM documents WHERE collection = ?{clause} ORDER BY {} LIMIT ? OFFSET ?",
            query.sort.to_sql()?
        );
        binds.insert(0, Value::Text(T::COLLECTION.to_string()));
        binds.push(Value::Integer(query.limit.unwrap_or(-1)));
        binds.push(Value::Integer(query.offset));

        let rows: Vec<String> =
            bind_values!(sqlx::query_scalar::<_, String>(&sql), binds.iter())
                .fetch_all(&mut *self)
                .await?;

        rows.iter()
            .map(|body| serde_json::from_str(body).map_err(DbError::from))
            .collect()
    }

    async fn find_one<T: Document>(&mut self, filter: &Filter) -> Result<Option<T>, DbError> {
        let query = Query::filter(filter.clone()).sort(Sort::Oldest).limit(1);
        Ok(self.find::<T>(&query).await?.into_iter().next())
    }

    async fn count<T: Document>(&mut self, filter: &Filter) -> Result<i64, DbError> {
        let (clause, mut binds) = filter.compile()?;
        let sql = format!("SELECT COUNT(*) FROM documents WHERE collection = ?{clause}");
        binds.insert(0, Value::Text(T::COLLECTION.to_string()));

        let total: i64 = bind_values!(sqlx::query_scalar::<_, i64>(&sql), binds.iter())
            .fetch_one(&mut *self)
            .await?;
        Ok(total)
    }

    async fn page<T: Document>(
        &mut self,
        filter: &Filter,
        sort: &Sort,
        request: PageRequest,
    ) -> Result<Page<T>, DbError> {
        let total = self.count::<T>(filter).await?;
        let query = Query::filter(filter.clone())
            .sort(sort.clone())
            .limit(request.limit)
            .offset(request.offset());
        let items = self.find::<T>(&query).await?;

        Ok(Page {
            items,
            pagination: Pagination::new(request, total),
        })
    }
}

/// Get current Unix timestamp in milliseconds.
fn current_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Db;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        name: String,
        active: bool,
        position: i64,
        lines: Vec<Line>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Line {
        sku: String,
    }

    impl Document for Item {
        const COLLECTION: &'static str = "items";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str, name: &str, active: bool, position: i64) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
            active,
            position,
            lines: vec![Line {
                sku: format!("SKU-{id}"),
            }],
        }
    }

    async fn db() -> Db {
        let db = Db::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_write_transactions() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("shopline-db-{}-{}.db", std::process::id(), nanos));
        let db = Db::connect(&format!("sqlite://{}", path.display()), 5)
            .await
            .unwrap();
        db.migrate().await.unwrap();

        let mut tasks = Vec::new();
        for n in 0..8 {
            let db = db.clone();
            tasks.push(tokio::spawn(async move {
                let mut tx = db.begin().await?;
                let seen = tx.count::<Item>(&Filter::new()).await?;
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                tx.insert(&item(&format!("i{n}"), "Item", true, seen)).await?;
                tx.commit().await?;
                Ok::<_, DbError>(())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut conn = db.acquire().await.unwrap();
        assert_eq!(conn.count::<Item>(&Filter::new()).await.unwrap(), 8);
        drop(conn);
        db.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();

        conn.insert(&item("a", "Alpha", true, 1)).await.unwrap();
        let loaded: Item = conn.require("a").await.unwrap();
        assert_eq!(loaded.name, "Alpha");

        assert!(conn.delete::<Item>("a").await.unwrap());
        assert!(!conn.delete::<Item>("a").await.unwrap());
        assert!(conn.get::<Item>("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();

        conn.insert(&item("a", "Alpha", true, 1)).await.unwrap();
        let result = conn.insert(&item("a", "Again", true, 1)).await;
        assert!(matches!(result, Err(DbError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();

        let result = conn.update(&item("missing", "X", true, 1)).await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));

        conn.save(&item("b", "Beta", true, 1)).await.unwrap();
        conn.update(&item("b", "Beta 2", true, 1)).await.unwrap();
        let loaded: Item = conn.require("b").await.unwrap();
        assert_eq!(loaded.name, "Beta 2");
    }

    #[tokio::test]
    async fn test_filter_sort_and_page() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();

        conn.insert(&item("a", "Red Shirt", true, 3)).await.unwrap();
        conn.insert(&item("b", "Blue Shirt", false, 1)).await.unwrap();
        conn.insert(&item("c", "Green Hat", true, 2)).await.unwrap();

        let active = Filter::new().eq("active", true);
        assert_eq!(conn.count::<Item>(&active).await.unwrap(), 2);

        let by_position: Vec<Item> = conn
            .find(&Query::filter(Filter::new()).sort(Sort::asc("position")))
            .await
            .unwrap();
        let ids: Vec<&str> = by_position.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let shirts: Vec<Item> = conn
            .find(&Query::filter(Filter::new().contains("name", "SHIRT")))
            .await
            .unwrap();
        assert_eq!(shirts.len(), 2);

        let page: Page<Item> = conn
            .page(&Filter::new(), &Sort::Oldest, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "c");
        assert_eq!(page.pagination.total, 3);
        assert!(!page.pagination.has_next);

        let far: Page<Item> = conn
            .page(&Filter::new(), &Sort::Oldest, PageRequest::new(i64::MAX, 20))
            .await
            .unwrap();
        assert!(far.items.is_empty());
        assert_eq!(far.pagination.total, 3);
    }

    #[tokio::test]
    async fn test_element_eq() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();

        conn.insert(&item("a", "A", true, 1)).await.unwrap();
        conn.insert(&item("b", "B", true, 1)).await.unwrap();

        let found: Option<Item> = conn
            .find_one(&Filter::new().element_eq("lines", "sku", "SKU-b"))
            .await
            .unwrap();
        assert_eq!(found.map(|i| i.id), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let db = db().await;

        {
            let mut tx = db.begin().await.unwrap();
            tx.insert(&item("a", "A", true, 1)).await.unwrap();
            // dropped without commit
        }

        let mut conn = db.acquire().await.unwrap();
        assert!(conn.get::<Item>("a").await.unwrap().is_none());
    }
}

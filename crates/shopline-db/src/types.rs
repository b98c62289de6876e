//! Query value types, filters and sort orders.

use crate::DbError;

/// A value that can be compared against a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value (matches missing fields too).
    Null,
    /// Integer value. Booleans are stored as 0/1 by SQLite's JSON functions.
    Integer(i64),
    /// Real/float value.
    Real(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(if v { 1 } else { 0 })
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A single condition on a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value (`Null` matches a null or missing field).
    Eq(String, Value),
    /// Field differs from value.
    Ne(String, Value),
    /// Field is greater than value.
    Gt(String, Value),
    /// Field contains the text, case-insensitively.
    Contains(String, String),
    /// Field equals any of the values.
    In(String, Vec<Value>),
    /// Some element of an array field has `field == value`.
    ElementEq {
        array: String,
        field: String,
        value: Value,
    },
    /// At least one of the nested conditions holds.
    Or(Vec<Condition>),
}

impl Condition {
    fn compile(&self, sql: &mut String, binds: &mut Vec<Value>) -> Result<(), DbError> {
        match self {
            Condition::Eq(path, Value::Null) => {
                sql.push_str(&format!("{} IS NULL", json_path(path)?));
            }
            Condition::Eq(path, value) => {
                sql.push_str(&format!("{} = ?", json_path(path)?));
                binds.push(value.clone());
            }
            Condition::Ne(path, Value::Null) => {
                sql.push_str(&format!("{} IS NOT NULL", json_path(path)?));
            }
            Condition::Ne(path, value) => {
                let field = json_path(path)?;
                sql.push_str(&format!("({field} IS NULL OR {field} <> ?)"));
                binds.push(value.clone());
            }
            Condition::Gt(path, value) => {
                sql.push_str(&format!("{} > ?", json_path(path)?));
                binds.push(value.clone());
            }
            Condition::Contains(path, text) => {
                sql.push_str(&format!("LOWER({}) LIKE ? ESCAPE '\\'", json_path(path)?));
                binds.push(Value::Text(format!("%{}%", escape_like(&text.to_lowercase()))));
            }
            Condition::In(_, values) if values.is_empty() => {
                sql.push('0');
            }
            Condition::In(path, values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{} IN ({placeholders})", json_path(path)?));
                binds.extend(values.iter().cloned());
            }
            Condition::ElementEq {
                array,
                field,
                value,
            } => {
                validate_path(array)?;
                validate_path(field)?;
                sql.push_str(&format!(
                    "EXISTS (SELECT 1 FROM json_each(body, '$.{array}') \
                     WHERE json_extract(json_each.value, '$.{field}') = ?)"
                ));
                binds.push(value.clone());
            }
            Condition::Or(conditions) if conditions.is_empty() => {
                sql.push('0');
            }
            Condition::Or(conditions) => {
                sql.push('(');
                for (i, condition) in conditions.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(" OR ");
                    }
                    condition.compile(sql, binds)?;
                }
                sql.push(')');
            }
        }
        Ok(())
    }
}

/// A conjunction of conditions.
///
/// # Example
///
/// ```
/// use shopline_db::Filter;
///
/// let filter = Filter::new()
///     .eq("category_id", "65a1c0de0000000000000001")
///     .eq("status", "active")
///     .contains("name", "shirt");
/// assert_eq!(filter.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Create an empty filter (matches every document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw condition.
    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Require `path == value`.
    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Condition::Eq(path.into(), value.into()))
    }

    /// Require `path != value`.
    pub fn ne(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Condition::Ne(path.into(), value.into()))
    }

    /// Require `path > value`.
    pub fn gt(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Condition::Gt(path.into(), value.into()))
    }

    /// Require that at least one of `paths` equals `value`.
    pub fn any_eq<P: Into<String>>(
        self,
        paths: impl IntoIterator<Item = P>,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        self.with(Condition::Or(
            paths
                .into_iter()
                .map(|p| Condition::Eq(p.into(), value.clone()))
                .collect(),
        ))
    }

    /// Require `path == value` only when a value is given.
    pub fn eq_opt<V: Into<Value>>(self, path: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(path, value),
            None => self,
        }
    }

    /// Require that `path` contains `text` (case-insensitive).
    pub fn contains(self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.with(Condition::Contains(path.into(), text.into()))
    }

    /// Require that `path` is one of `values`.
    pub fn is_in<V: Into<Value>>(
        self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.with(Condition::In(
            path.into(),
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// Require that an element of the `array` field has `field == value`.
    pub fn element_eq(
        self,
        array: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.with(Condition::ElementEq {
            array: array.into(),
            field: field.into(),
            value: value.into(),
        })
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Check if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render the filter as `AND`-prefixed SQL plus bind values.
    pub(crate) fn compile(&self) -> Result<(String, Vec<Value>), DbError> {
        let mut sql = String::new();
        let mut binds = Vec::new();
        for condition in &self.conditions {
            sql.push_str(" AND ");
            condition.compile(&mut sql, &mut binds)?;
        }
        Ok((sql, binds))
    }
}

/// Sort order for query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Sort {
    /// Most recently inserted first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
    /// By a field, ascending.
    Asc(String),
    /// By a field, descending.
    Desc(String),
}

impl Sort {
    /// Sort ascending by a field.
    pub fn asc(path: impl Into<String>) -> Self {
        Sort::Asc(path.into())
    }

    /// Sort descending by a field.
    pub fn desc(path: impl Into<String>) -> Self {
        Sort::Desc(path.into())
    }

    pub(crate) fn to_sql(&self) -> Result<String, DbError> {
        Ok(match self {
            Sort::Newest => "created_at DESC, rowid DESC".to_string(),
            Sort::Oldest => "created_at ASC, rowid ASC".to_string(),
            Sort::Asc(path) => format!("{} ASC, rowid ASC", json_path(path)?),
            Sort::Desc(path) => format!("{} DESC, rowid DESC", json_path(path)?),
        })
    }
}

/// A complete query: filter, sort and window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Sort,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Query {
    /// Query every document matching a filter.
    pub fn filter(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Set the sort order.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` results.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset.max(0);
        self
    }
}

fn validate_path(path: &str) -> Result<(), DbError> {
    let valid = !path.is_empty()
        && !path.starts_with('.')
        && !path.ends_with('.')
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(DbError::InvalidQuery(format!("invalid field path: {path:?}")))
    }
}

fn json_path(path: &str) -> Result<String, DbError> {
    validate_path(path)?;
    Ok(format!("json_extract(body, '$.{path}')"))
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_compiles_conditions() {
        let filter = Filter::new()
            .eq("status", "active")
            .eq("deleted_at", Value::Null)
            .is_in("kind", ["a", "b"]);
        let (sql, binds) = filter.compile().unwrap();

        assert_eq!(
            sql,
            " AND json_extract(body, '$.status') = ? \
             AND json_extract(body, '$.deleted_at') IS NULL \
             AND json_extract(body, '$.kind') IN (?, ?)"
        );
        assert_eq!(binds.len(), 3);
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let (_, binds) = Filter::new().contains("name", "50%_Off").compile().unwrap();
        assert_eq!(binds, vec![Value::Text("%50\\%\\_off%".to_string())]);
    }

    #[test]
    fn test_invalid_path_rejected() {
        let result = Filter::new().eq("name'); DROP TABLE documents; --", 1).compile();
        assert!(matches!(result, Err(DbError::InvalidQuery(_))));
        assert!(Sort::asc("").to_sql().is_err());
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let (sql, binds) = Filter::new()
            .is_in("id", Vec::<&str>::new())
            .compile()
            .unwrap();
        assert_eq!(sql, " AND 0");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_gt_and_any_eq() {
        let (sql, binds) = Filter::new()
            .gt("remaining", 0)
            .any_eq(["from", "to"], "x")
            .compile()
            .unwrap();
        assert_eq!(
            sql,
            " AND json_extract(body, '$.remaining') > ? \
             AND (json_extract(body, '$.from') = ? OR json_extract(body, '$.to') = ?)"
        );
        assert_eq!(binds.len(), 3);
    }

    #[test]
    fn test_bool_value_is_integer() {
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from(None::<&str>), Value::Null);
    }
}

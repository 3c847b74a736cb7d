use routekit_core::handler::BoxFuture;
use routekit_data::{Dialect, Query, Row, Storage, StorageError};
use sqlx::{Database, Pool};

/// [`Storage`] over an `sqlx::Pool<DB>`.
///
/// # Example
///
/// ```ignore
/// let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await?;
/// let storage = Arc::new(SqlxStorage::new(pool));
/// registry.get("/users", CrudEndpoint::list(meta, storage))?;
/// ```
pub struct SqlxStorage<DB: Database> {
    pool: Pool<DB>,
}

impl<DB: Database> SqlxStorage<DB> {
    pub fn new(pool: Pool<DB>) -> Self {
        Self { pool }
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }
}

impl<DB: Database> Clone for SqlxStorage<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<DB: Database> std::fmt::Debug for SqlxStorage<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxStorage")
            .field("database", &DB::NAME)
            .field("size", &self.pool.size())
            .finish()
    }
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use crate::error::SqlxErrorExt;
    use serde_json::{Map, Number, Value};
    use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePoolOptions, SqliteRow};
    use sqlx::{Column, Row as _, TypeInfo, ValueRef};

    type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

    impl SqlxStorage<Sqlite> {
        /// Open a pool on `url`. In-memory databases get a single connection
        /// so every query sees the same database.
        pub async fn connect(url: &str) -> Result<Self, StorageError> {
            let max = if url.contains(":memory:") { 1 } else { 5 };
            let pool = SqlitePoolOptions::new()
                .max_connections(max)
                .connect(url)
                .await
                .map_err(SqlxErrorExt::into_storage_error)?;
            tracing::debug!(url, max_connections = max, "Opened SQLite pool");
            Ok(Self::new(pool))
        }

        /// Run a multi-statement script, e.g. a schema.
        pub async fn execute_script(&self, sql: &str) -> Result<(), StorageError> {
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(SqlxErrorExt::into_storage_error)?;
            Ok(())
        }
    }

    impl Storage for SqlxStorage<Sqlite> {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }

        fn execute<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Row>, StorageError>> {
            Box::pin(async move {
                let mut q = sqlx::query(&query.sql);
                for value in &query.params {
                    q = bind(q, value);
                }
                let rows = q
                    .fetch_all(&self.pool)
                    .await
                    .map_err(SqlxErrorExt::into_storage_error)?;
                rows.iter().map(row_to_json).collect()
            })
        }
    }

    /// Bind a JSON value. Arrays and objects are stored as JSON text.
    fn bind<'q>(q: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
        match value {
            Value::Null => q.bind(None::<String>),
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => q.bind(i),
                None => q.bind(n.as_f64()),
            },
            Value::String(s) => q.bind(s.clone()),
            other => q.bind(other.to_string()),
        }
    }

    /// Decode a row by the declared column type, falling back to the value's
    /// storage class.
    pub(crate) fn row_to_json(row: &SqliteRow) -> Result<Row, StorageError> {
        let mut out = Map::new();
        for column in row.columns() {
            let idx = column.ordinal();
            let raw = row
                .try_get_raw(idx)
                .map_err(SqlxErrorExt::into_storage_error)?;
            if raw.is_null() {
                out.insert(column.name().to_string(), Value::Null);
                continue;
            }
            let declared = column.type_info().name().to_ascii_uppercase();
            let stored = raw.type_info().name().to_ascii_uppercase();
            let decode = |e: sqlx::Error| e.into_storage_error();
            let value = if declared == "BOOLEAN" {
                Value::Bool(row.try_get::<i64, _>(idx).map_err(decode)? != 0)
            } else {
                match stored.as_str() {
                    "INTEGER" => Value::from(row.try_get::<i64, _>(idx).map_err(decode)?),
                    "REAL" => {
                        let f = row.try_get::<f64, _>(idx).map_err(decode)?;
                        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                    }
                    "BLOB" => {
                        let bytes = row.try_get::<Vec<u8>, _>(idx).map_err(decode)?;
                        Value::String(String::from_utf8_lossy(&bytes).into_owned())
                    }
                    _ => Value::String(row.try_get::<String, _>(idx).map_err(decode)?),
                }
            };
            out.insert(column.name().to_string(), value);
        }
        Ok(out)
    }
}

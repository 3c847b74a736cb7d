use routekit_core::handler::BoxFuture;
use routekit_data::{Dialect, Query, Row, Storage, StorageError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&Query) -> Result<Vec<Row>, StorageError> + Send + Sync>;

/// Scripted [`Storage`] that records every query it receives.
///
/// Responses queued with [`push_rows`](MockStorage::push_rows) /
/// [`push_error`](MockStorage::push_error) are returned in order. Once the
/// queue is empty the responder (if any) answers, otherwise an empty result.
///
/// ```ignore
/// let storage = MockStorage::new()
///     .push_rows(vec![row(json!({ "id": 1 }))])
///     .push_error(StorageError::constraint("users.email", "UNIQUE"));
/// ```
pub struct MockStorage {
    dialect: Dialect,
    script: Mutex<VecDeque<Result<Vec<Row>, StorageError>>>,
    responder: Option<Responder>,
    executed: Mutex<Vec<Query>>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::Sqlite,
            script: Mutex::new(VecDeque::new()),
            responder: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn push_rows(self, rows: Vec<Row>) -> Self {
        self.script.lock().unwrap().push_back(Ok(rows));
        self
    }

    pub fn push_error(self, err: StorageError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    /// Queue a single-row `COUNT(*)` result.
    pub fn push_count(self, total: u64) -> Self {
        self.push_rows(vec![row(serde_json::json!({ "total": total }))])
    }

    /// Answer unscripted queries with `f`.
    pub fn respond_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Query) -> Result<Vec<Row>, StorageError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    /// Every query executed so far, in order.
    pub fn executed(&self) -> Vec<Query> {
        self.executed.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|q| q.sql).collect()
    }

    pub fn assert_executed_count(&self, expected: usize) {
        let sql = self.executed_sql();
        assert_eq!(sql.len(), expected, "Expected {expected} queries, got {sql:#?}");
    }
}

impl Storage for MockStorage {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Row>, StorageError>> {
        Box::pin(async move {
            tracing::trace!(sql = %query.sql, "MockStorage executing");
            self.executed.lock().unwrap().push(query.clone());
            let scripted = self.script.lock().unwrap().pop_front();
            match scripted {
                Some(result) => result,
                None => match self.responder {
                    Some(ref f) => f(query),
                    None => Ok(Vec::new()),
                },
            }
        })
    }
}

/// Build a [`Row`] from a JSON object literal.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row() expects a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(sql: &str) -> Query {
        Query {
            sql: sql.to_string(),
            params: vec![json!(1)],
        }
    }

    #[tokio::test]
    async fn scripted_results_then_empty() {
        let storage = MockStorage::new()
            .push_rows(vec![row(json!({ "id": 1 }))])
            .push_error(StorageError::other("down"));

        let first = storage.execute(&query("SELECT 1")).await.unwrap();
        assert_eq!(first[0]["id"], 1);
        assert!(storage.execute(&query("SELECT 2")).await.is_err());
        assert!(storage.execute(&query("SELECT 3")).await.unwrap().is_empty());
        assert_eq!(storage.executed_sql(), vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[tokio::test]
    async fn responder_answers_unscripted_queries() {
        let storage = MockStorage::new().respond_with(|q| {
            Ok(vec![row(json!({ "params": q.params.len() }))])
        });
        let rows = storage.execute(&query("SELECT 1")).await.unwrap();
        assert_eq!(rows[0]["params"], 1);
    }
}

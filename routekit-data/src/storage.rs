use crate::error::StorageError;
use crate::query::{Dialect, Query};
use routekit_core::handler::BoxFuture;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One result row, column name to JSON value.
pub type Row = Map<String, Value>;

/// The collaborator that runs parameterized queries.
///
/// Uses a boxed future so `Arc<dyn Storage>` can be shared by endpoints.
pub trait Storage: Send + Sync + 'static {
    /// Placeholder style the backend expects.
    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    fn execute<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Row>, StorageError>>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Row>, StorageError>> {
        (**self).execute(query)
    }
}

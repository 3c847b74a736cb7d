use crate::query::QueryError;
use routekit_core::ApiError;

/// Failure reported by a storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A unique, foreign-key, not-null or check constraint rejected the query.
    ConstraintViolation { identifier: String, message: String },
    /// Any other failure (connection, syntax, decoding).
    Other(String),
}

impl StorageError {
    pub fn constraint(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::ConstraintViolation {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn other(err: impl std::fmt::Display) -> Self {
        StorageError::Other(err.to_string())
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::ConstraintViolation { identifier, message } => {
                write!(f, "Constraint '{identifier}' violated: {message}")
            }
            StorageError::Other(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    Query(QueryError),
    Storage(StorageError),
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Query(err) => Some(err),
            DataError::Storage(err) => Some(err),
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}

impl From<StorageError> for DataError {
    fn from(err: StorageError) -> Self {
        DataError::Storage(err)
    }
}

/// Unmapped constraint violations become conflicts; everything else is an
/// internal error whose detail stays out of the response body.
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConstraintViolation { identifier, .. } => ApiError::Conflict { identifier },
            StorageError::Other(msg) => ApiError::Storage(msg),
        }
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Query(e) => ApiError::Storage(e.to_string()),
            DataError::Storage(e) => e.into(),
        }
    }
}

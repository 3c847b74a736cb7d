use routekit_data::{extract_constraint_identifier, StorageError};
use sqlx::error::ErrorKind;

/// Extension trait for converting `sqlx::Error` into [`StorageError`].
///
/// Orphan rules forbid `From<sqlx::Error> for StorageError` here; use
/// `.into_storage_error()` instead.
pub trait SqlxErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_storage_error(self) -> StorageError {
        let sqlx::Error::Database(ref db) = self else {
            return StorageError::other(&self);
        };
        let is_constraint = matches!(
            db.kind(),
            ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
        );
        if !is_constraint {
            return StorageError::other(&self);
        }
        let message = db.message().to_string();
        let identifier = db
            .constraint()
            .map(str::to_string)
            .or_else(|| extract_constraint_identifier(&message))
            .unwrap_or_default();
        StorageError::constraint(identifier, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_opaque() {
        let err = sqlx::Error::RowNotFound.into_storage_error();
        assert!(matches!(err, StorageError::Other(_)));
    }
}

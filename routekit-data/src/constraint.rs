use crate::error::StorageError;
use regex::Regex;
use routekit_core::error::{FieldError, Violation};
use routekit_core::{ApiError, ValidationError};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Storage constraint identifier to the validation error reported for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintMessageMap {
    entries: BTreeMap<String, FieldError>,
}

impl ConstraintMessageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `identifier` as an error on body field `field`.
    pub fn field(self, identifier: &str, field: &str, message: &str) -> Self {
        let error = FieldError::new(
            vec!["body".to_string(), field.to_string()],
            Violation::Constraint {
                identifier: identifier.to_string(),
            },
        )
        .with_message(message);
        self.entry(identifier, error)
    }

    pub fn entry(mut self, identifier: &str, error: FieldError) -> Self {
        self.entries.insert(identifier.to_string(), error);
        self
    }

    pub fn resolve(&self, identifier: &str) -> Option<&FieldError> {
        self.entries.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn a storage failure into the response error. Only violations of a
    /// mapped constraint become validation errors.
    pub fn map_storage_error(&self, err: StorageError) -> ApiError {
        if let StorageError::ConstraintViolation { identifier, .. } = &err {
            if let Some(mapped) = self.resolve(identifier) {
                return ApiError::Validation(ValidationError::single(mapped.clone()));
            }
        }
        err.into()
    }
}

fn constraint_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // SQLite: `UNIQUE constraint failed: users.email`
            Regex::new(r"constraint failed: (.+)$").expect("valid regex"),
            // Postgres: `violates unique constraint "users_email_key"`
            Regex::new(r#"constraint "([^"]+)""#).expect("valid regex"),
        ]
    })
}

/// Extract the constraint identifier from a driver error message.
pub fn extract_constraint_identifier(message: &str) -> Option<String> {
    constraint_patterns()
        .iter()
        .find_map(|re| re.captures(message))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use routekit_core::http::StatusCode;

    #[test]
    fn extracts_identifiers() {
        assert_eq!(
            extract_constraint_identifier("UNIQUE constraint failed: users.email").as_deref(),
            Some("users.email")
        );
        assert_eq!(
            extract_constraint_identifier(
                "duplicate key value violates unique constraint \"users_email_key\""
            )
            .as_deref(),
            Some("users_email_key")
        );
        assert_eq!(extract_constraint_identifier("FOREIGN KEY constraint failed"), None);
    }

    #[test]
    fn mapped_violation_is_exactly_the_mapped_error() {
        let map = ConstraintMessageMap::new().field("users.email", "email", "Email already taken");
        let err = map.map_storage_error(StorageError::constraint("users.email", "UNIQUE"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let ApiError::Validation(v) = err else {
            panic!("expected validation error");
        };
        assert_eq!(v.errors(), &[map.resolve("users.email").unwrap().clone()]);
        assert_eq!(v.errors()[0].message, "Email already taken");
        assert_eq!(v.errors()[0].path, vec!["body", "email"]);
    }

    #[test]
    fn unmapped_violation_is_conflict_with_identifier() {
        let map = ConstraintMessageMap::new().field("users.email", "email", "taken");
        let err = map.map_storage_error(StorageError::constraint("users.username", "UNIQUE"));
        assert!(matches!(err, ApiError::Conflict { ref identifier } if identifier == "users.username"));
        assert_eq!(err.body()["errors"][0]["code"], 7003);
    }

    #[test]
    fn other_errors_stay_internal() {
        let err = ConstraintMessageMap::new().map_storage_error(StorageError::other("timeout"));
        assert!(matches!(err, ApiError::Storage(_)));
    }
}

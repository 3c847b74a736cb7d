use crate::params::ParamLocation;
use crate::response::ApiResponse;
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

/// Stable error codes carried in the `code` field of every error body.
pub mod codes {
    pub const INTERNAL: u32 = 7000;
    pub const VALIDATION: u32 = 7001;
    pub const NOT_FOUND: u32 = 7002;
    pub const CONFLICT: u32 = 7003;
}

// ── Field-level validation errors ──────────────────────────

/// The constraint a field violated.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Required,
    InvalidType { expected: &'static str },
    InvalidJson,
    InvalidFormat { format: &'static str },
    InvalidEnum { allowed: Vec<String> },
    TooShort { min: usize },
    TooLong { max: usize },
    TooSmall { min: f64 },
    TooLarge { max: f64 },
    Pattern { pattern: String },
    UnknownField,
    /// A storage constraint mapped to a field.
    Constraint { identifier: String },
    Custom(String),
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Required => write!(f, "Required"),
            Violation::InvalidType { expected } => write!(f, "Expected {expected}"),
            Violation::InvalidJson => write!(f, "Malformed JSON body"),
            Violation::InvalidFormat { format } => write!(f, "Invalid {format}"),
            Violation::InvalidEnum { allowed } => {
                write!(f, "Expected one of: {}", allowed.join(", "))
            }
            Violation::TooShort { min } => write!(f, "Must contain at least {min} character(s)"),
            Violation::TooLong { max } => write!(f, "Must contain at most {max} character(s)"),
            Violation::TooSmall { min } => write!(f, "Must be greater than or equal to {min}"),
            Violation::TooLarge { max } => write!(f, "Must be less than or equal to {max}"),
            Violation::Pattern { pattern } => write!(f, "Must match pattern {pattern}"),
            Violation::UnknownField => write!(f, "Unknown field"),
            Violation::Constraint { identifier } => {
                write!(f, "Violates constraint {identifier}")
            }
            Violation::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

/// A single failing field, addressed by its location-qualified path
/// (e.g. `["body", "email"]`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub path: Vec<String>,
    pub violation: Violation,
    pub message: String,
}

impl FieldError {
    pub fn new(path: Vec<String>, violation: Violation) -> Self {
        let message = violation.to_string();
        Self {
            path,
            violation,
            message,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The path joined with dots, e.g. `body.email`.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Every field that failed validation for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Find the error reported for a dotted path such as `query.page`.
    pub fn find(&self, dotted: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.dotted_path() == dotted)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed:")?;
        for err in &self.errors {
            write!(f, "\n  - {}: {}", err.dotted_path(), err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// ── Registration-time errors ───────────────────────────────

/// A route or endpoint configuration defect, detected while registering.
///
/// Never turned into a response: the route is refused instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatchError {
    /// A primary key has no matching URL parameter.
    PrimaryKeyMismatch { key: String, path: String },
    /// Explicit `path_parameters` do not line up with the primary keys.
    PathParameterCount {
        expected: usize,
        found: usize,
        path: String,
    },
    /// A path parameter is declared but the URL has no such segment.
    UnknownPathParameter { name: String, path: String },
    /// Two parameters share name and location with different types.
    ConflictingParameter {
        name: String,
        location: ParamLocation,
    },
    /// An endpoint setting names a field the model does not have.
    UnknownField { field: String, model: String },
    DuplicateRoute { method: String, path: String },
    Invalid(String),
}

impl std::fmt::Display for SchemaMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaMismatchError::PrimaryKeyMismatch { key, path } => write!(
                f,
                "Primary keys differ from URL parameters: key '{key}' has no matching path parameter in '{path}'"
            ),
            SchemaMismatchError::PathParameterCount {
                expected,
                found,
                path,
            } => write!(
                f,
                "Route '{path}' declares {found} path parameter(s) for {expected} primary key(s)"
            ),
            SchemaMismatchError::UnknownPathParameter { name, path } => {
                write!(f, "Path parameter '{name}' does not appear in '{path}'")
            }
            SchemaMismatchError::ConflictingParameter { name, location } => write!(
                f,
                "Parameter '{name}' in {} is declared twice with different types",
                location.as_str()
            ),
            SchemaMismatchError::UnknownField { field, model } => {
                write!(f, "Model '{model}' has no field '{field}'")
            }
            SchemaMismatchError::DuplicateRoute { method, path } => {
                write!(f, "Route {method} {path} is already registered")
            }
            SchemaMismatchError::Invalid(msg) => write!(f, "Invalid route definition: {msg}"),
        }
    }
}

impl std::error::Error for SchemaMismatchError {}

// ── Request-time errors ────────────────────────────────────

/// Errors a request can end in. Each maps to a status and a stable code.
#[derive(Debug, Clone)]
pub enum ApiError {
    Validation(ValidationError),
    NotFound(String),
    /// Unmapped storage constraint violation; the identifier is kept for logs.
    Conflict { identifier: String },
    /// Any other collaborator failure. The message never reaches the client.
    Storage(String),
}

#[derive(Serialize)]
struct ErrorEntry<'a> {
    code: u32,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a [String]>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            ApiError::Validation(_) => codes::VALIDATION,
            ApiError::NotFound(_) => codes::NOT_FOUND,
            ApiError::Conflict { .. } => codes::CONFLICT,
            ApiError::Storage(_) => codes::INTERNAL,
        }
    }

    /// The fixed `{ success: false, errors: [...] }` body.
    pub fn body(&self) -> Value {
        let code = self.code();
        let errors: Vec<Value> = match self {
            ApiError::Validation(v) => v
                .errors()
                .iter()
                .map(|e| {
                    json!(ErrorEntry {
                        code,
                        message: &e.message,
                        path: Some(&e.path),
                    })
                })
                .collect(),
            ApiError::NotFound(msg) => vec![json!(ErrorEntry {
                code,
                message: msg,
                path: None,
            })],
            ApiError::Conflict { .. } => vec![json!(ErrorEntry {
                code,
                message: "Conflicts with an existing record",
                path: None,
            })],
            ApiError::Storage(_) => vec![json!(ErrorEntry {
                code,
                message: "Internal Error",
                path: None,
            })],
        };
        json!({ "success": false, "errors": errors })
    }

    pub fn into_response(self) -> ApiResponse {
        ApiResponse::new(self.status(), self.body())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(v) => write!(f, "{v}"),
            ApiError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            ApiError::Conflict { identifier } => write!(f, "Conflict on constraint '{identifier}'"),
            ApiError::Storage(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        err.into_response()
    }
}

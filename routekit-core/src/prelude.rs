//! Import the common routekit-core types with a single `use`.
//!
//! ```ignore
//! use routekit_core::prelude::*;
//!
//! let mut registry = RouteRegistry::new();
//! registry.get(
//!     "/health",
//!     RouteEndpoint::new(handler_fn(|_req| async {
//!         Ok(ApiResponse::success(serde_json::json!("ok")))
//!     })),
//! )?;
//! ```

pub use crate::config::ApiConfig;
pub use crate::contract::{ResponseSpec, RouteContract};
pub use crate::error::{ApiError, SchemaMismatchError, ValidationError};
pub use crate::handler::{handler_fn, Endpoint, Handler, HandlerResult, RouteEndpoint};
pub use crate::logger::{ApiLogger, Logger};
pub use crate::params::{ParamDef, ParamLocation};
pub use crate::registry::RouteRegistry;
pub use crate::request::{RawRequest, ValidatedRequest};
pub use crate::response::ApiResponse;
pub use crate::schema::{FieldSchema, FieldType, ObjectSchema};

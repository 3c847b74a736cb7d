pub mod config;
pub mod contract;
pub mod error;
pub mod handler;
pub mod logger;
pub mod merge;
pub mod params;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod schema;

pub use config::{ApiConfig, ConfigError, ConfigValue, FromConfigValue, PaginationConfig, RawConfig};
pub use contract::{ContractBuilder, ResponseSpec, RouteContract};
pub use error::{ApiError, FieldError, SchemaMismatchError, ValidationError, Violation};
pub use handler::{
    handler_fn, BeforeValidate, BoxFuture, Endpoint, FnHandler, Handler, HandlerResult,
    MountedEndpoint, Operation, RouteEndpoint, RouteTarget,
};
pub use logger::{init_tracing, init_tracing_with, ApiLogger, Logger, TracingLogger};
pub use merge::{bind_primary_keys, merge_path_params, KeyBinding, PathParamAccumulator};
pub use params::{ParamDef, ParamLocation};
pub use registry::{RegisteredRoute, RouteRegistry, Scope};
pub use request::{RawRequest, ValidatedRequest};
pub use response::ApiResponse;
pub use schema::{Constraints, FieldSchema, FieldType, ObjectSchema};

pub use http;

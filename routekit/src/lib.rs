//! routekit - validated routes, OpenAPI documents and auto-CRUD.
//!
//! This facade crate re-exports the routekit sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use routekit::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                        |
//! |-------------|---------|------------------------------|
//! | `crud`      | **yes** | `routekit-crud`              |
//! | `openapi`   | **yes** | `routekit-openapi`           |
//! | `data`      | no      | `routekit-data` (pulled in by `crud`) |
//! | `data-sqlx` | no      | `routekit-data-sqlx`         |
//! | `sqlite`    | no      | `routekit-data-sqlx/sqlite`  |
//! | `test`      | no      | `routekit-test`              |
//! | `full`      | no      | All of the above             |

pub extern crate routekit_core;

// Re-export everything from routekit-core at the top level for convenience.
pub use routekit_core::*;

#[cfg(feature = "data")]
pub use routekit_data;

#[cfg(feature = "crud")]
pub use routekit_crud;

#[cfg(feature = "openapi")]
pub use routekit_openapi;

#[cfg(feature = "data-sqlx")]
pub use routekit_data_sqlx;

#[cfg(feature = "test")]
pub use routekit_test;

/// Unified prelude - import everything with `use routekit::prelude::*`.
///
/// Includes the core prelude plus types from all enabled feature crates.
pub mod prelude {
    pub use routekit_core::prelude::*;

    #[cfg(feature = "data")]
    pub use routekit_data::prelude::*;

    #[cfg(feature = "crud")]
    pub use routekit_crud::{CrudEndpoint, EndpointMeta, HookContext, Mutation, OrderDirection};

    #[cfg(feature = "openapi")]
    pub use routekit_openapi::{assemble, CachedDocument, OpenApiConfig};

    #[cfg(feature = "data-sqlx")]
    pub use routekit_data_sqlx::prelude::*;
}

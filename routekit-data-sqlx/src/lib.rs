//! SQLx storage backend for routekit.
//!
//! [`SqlxStorage`] runs the parameterized queries built by `routekit-data`
//! against an `sqlx` pool, decodes rows into JSON objects and turns driver
//! constraint failures into [`StorageError::ConstraintViolation`](routekit_data::StorageError).
//!
//! # Feature flags
//!
//! | Feature  | Driver |
//! |----------|--------|
//! | `sqlite` | SQLite via `sqlx/sqlite` (default) |

pub mod error;
pub mod storage;

pub use error::SqlxErrorExt;
pub use storage::SqlxStorage;

/// Re-exports of the most commonly used types from both `routekit-data` and this crate.
pub mod prelude {
    pub use crate::{SqlxErrorExt, SqlxStorage};
    pub use routekit_data::prelude::*;
}

pub mod constraint;
pub mod error;
pub mod model;
pub mod page;
pub mod query;
pub mod storage;

pub use constraint::{extract_constraint_identifier, ConstraintMessageMap};
pub use error::{DataError, StorageError};
pub use model::{Model, ModelBuilder};
pub use page::{ListResult, Pagination, ResultInfo};
pub use query::{escape_like, Condition, Dialect, IdentifierPolicy, Query, QueryBuilder, QueryError};
pub use storage::{Row, Storage};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        ConstraintMessageMap, Dialect, ListResult, Model, Pagination, Query, QueryBuilder, Row,
        Storage, StorageError,
    };
}

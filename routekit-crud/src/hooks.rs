//! Replaceable steps of the CRUD operations.
//!
//! Each variant runs the same pipeline: an optional `before_validate` on the
//! raw request, then `fetch_one`, `mutate` or `list` against storage. The
//! defaults below build their statements through [`QueryBuilder`]; any of
//! them can be swapped for a custom function on the endpoint.

use crate::meta::EndpointMeta;
use crate::query::QuerySpec;
use routekit_core::handler::{BeforeValidate, BoxFuture};
use routekit_core::{ApiError, Logger};
use routekit_data::{DataError, Dialect, ListResult, Query, QueryBuilder, Row, Storage, StorageError};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// Column/value pairs.
pub type Values = Vec<(String, Value)>;

/// What a hook can reach: storage, the endpoint metadata and the logger.
#[derive(Clone)]
pub struct HookContext {
    pub storage: Arc<dyn Storage>,
    pub meta: Arc<EndpointMeta>,
    pub logger: Logger,
}

impl HookContext {
    pub fn dialect(&self) -> Dialect {
        self.storage.dialect()
    }

    pub fn table(&self) -> &str {
        self.meta.model().table()
    }

    /// A builder over the model's table in the storage dialect.
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new_with_dialect(self.table(), self.dialect())
    }

    /// Run `query`, logging it without its bound values.
    pub async fn execute(&self, query: &Query) -> Result<Vec<Row>, StorageError> {
        self.logger.debug(
            "query executed",
            &json!({ "sql": query.sql, "params": query.params.len() }),
        );
        self.storage.execute(query).await
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("model", &self.meta.model().name())
            .finish()
    }
}

/// A write against the model's table.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert { values: Values },
    Update { filters: Values, values: Values },
    Delete { filters: Values },
}

pub type FetchOneHook =
    Arc<dyn Fn(HookContext, Values) -> BoxFuture<'static, Result<Option<Row>, ApiError>> + Send + Sync>;
pub type MutateHook =
    Arc<dyn Fn(HookContext, Mutation) -> BoxFuture<'static, Result<Row, ApiError>> + Send + Sync>;
pub type ListHook =
    Arc<dyn Fn(HookContext, QuerySpec) -> BoxFuture<'static, Result<ListResult, ApiError>> + Send + Sync>;

/// The hook set of one endpoint.
#[derive(Clone)]
pub struct Hooks {
    pub before_validate: Option<BeforeValidate>,
    pub fetch_one: FetchOneHook,
    pub mutate: MutateHook,
    pub list: ListHook,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            before_validate: None,
            fetch_one: fetch_one_hook(default_fetch_one),
            mutate: mutate_hook(default_mutate),
            list: list_hook(default_list),
        }
    }
}

pub(crate) fn fetch_one_hook<F, Fut>(f: F) -> FetchOneHook
where
    F: Fn(HookContext, Values) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Row>, ApiError>> + Send + 'static,
{
    Arc::new(
        move |ctx: HookContext, filters: Values| -> BoxFuture<'static, Result<Option<Row>, ApiError>> {
            Box::pin(f(ctx, filters))
        },
    )
}

pub(crate) fn mutate_hook<F, Fut>(f: F) -> MutateHook
where
    F: Fn(HookContext, Mutation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Row, ApiError>> + Send + 'static,
{
    Arc::new(
        move |ctx: HookContext, mutation: Mutation| -> BoxFuture<'static, Result<Row, ApiError>> {
            Box::pin(f(ctx, mutation))
        },
    )
}

pub(crate) fn list_hook<F, Fut>(f: F) -> ListHook
where
    F: Fn(HookContext, QuerySpec) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ListResult, ApiError>> + Send + 'static,
{
    Arc::new(
        move |ctx: HookContext, spec: QuerySpec| -> BoxFuture<'static, Result<ListResult, ApiError>> {
            Box::pin(f(ctx, spec))
        },
    )
}

fn build_failed(err: routekit_data::QueryError) -> ApiError {
    DataError::from(err).into()
}

/// `SELECT * ... WHERE <filters> LIMIT 1`.
pub async fn default_fetch_one(ctx: HookContext, filters: Values) -> Result<Option<Row>, ApiError> {
    let mut qb = ctx.query_builder();
    for (column, value) in filters {
        qb = qb.where_eq(&column, value);
    }
    let query = qb.limit(1).build_select(&["*"]).map_err(build_failed)?;
    let rows = ctx.execute(&query).await?;
    Ok(rows.into_iter().next())
}

/// Insert, update or delete one row and return it (`RETURNING *`).
///
/// Constraint violations of inserts and updates go through the endpoint's
/// constraint message map.
pub async fn default_mutate(ctx: HookContext, mutation: Mutation) -> Result<Row, ApiError> {
    let (query, mapped) = match mutation {
        Mutation::Insert { values } => (ctx.query_builder().build_insert(&values), true),
        Mutation::Update { filters, values } => {
            let mut qb = ctx.query_builder();
            for (column, value) in filters {
                qb = qb.where_eq(&column, value);
            }
            (qb.build_update(&values), true)
        }
        Mutation::Delete { filters } => {
            let mut qb = ctx.query_builder();
            for (column, value) in filters {
                qb = qb.where_eq(&column, value);
            }
            (qb.build_delete(), false)
        }
    };
    let query = query.map_err(build_failed)?;

    let rows = match ctx.execute(&query).await {
        Ok(rows) => rows,
        Err(err) => {
            if let StorageError::ConstraintViolation { ref identifier, .. } = err {
                ctx.logger.warn(
                    "constraint violation",
                    &json!({ "table": ctx.table(), "identifier": identifier }),
                );
            }
            return Err(if mapped {
                ctx.meta.constraints_messages().map_storage_error(err)
            } else {
                err.into()
            });
        }
    };
    // An empty RETURNING means the row vanished after it was fetched.
    rows.into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", ctx.meta.model().name())))
}

/// Count and fetch one page with the same predicate.
pub async fn default_list(ctx: HookContext, spec: QuerySpec) -> Result<ListResult, ApiError> {
    let count = spec
        .query_builder(ctx.table(), ctx.dialect())
        .build_count()
        .map_err(build_failed)?;
    let select = spec
        .page_builder(ctx.table(), ctx.dialect())
        .build_select(&["*"])
        .map_err(build_failed)?;

    let total = total_count(&ctx.execute(&count).await?);
    let rows = ctx.execute(&select).await?;
    Ok(ListResult::new(rows, spec.pagination, total))
}

fn total_count(rows: &[Row]) -> u64 {
    let Some(row) = rows.first() else {
        return 0;
    };
    let value = row.get("total").or_else(|| row.values().next());
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

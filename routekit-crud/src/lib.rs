//! Auto-CRUD for routekit.
//!
//! One [`EndpointMeta`] describes a model and how it may be listed; the
//! [`CrudEndpoint`] factories turn it into create, read, update, delete and
//! list routes with contracts, OpenAPI descriptions and storage access.

pub mod endpoint;
pub mod hooks;
pub mod meta;
pub mod query;

pub use endpoint::{CrudEndpoint, CrudKind};
pub use hooks::{
    default_fetch_one, default_list, default_mutate, FetchOneHook, HookContext, Hooks, ListHook,
    MutateHook, Mutation, Values,
};
pub use meta::{EndpointMeta, EndpointMetaBuilder, OrderDirection};
pub use query::{list_params, QuerySpec};

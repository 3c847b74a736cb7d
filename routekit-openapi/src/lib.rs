//! OpenAPI 3.1 document assembly.
//!
//! [`assemble`] walks a [`RouteRegistry`](routekit_core::RouteRegistry) and
//! merges each route's contract description with its operation metadata.
//! Titled object schemas are shared through `components.schemas`; the output
//! is deterministic so it can be cached ([`CachedDocument`]) and diffed.

mod builder;
mod cache;
pub mod components;
mod config;

pub use builder::{assemble, assemble_json};
pub use cache::CachedDocument;
pub use components::ComponentRegistry;
pub use config::{OpenApiConfig, Server, OPENAPI_VERSION};

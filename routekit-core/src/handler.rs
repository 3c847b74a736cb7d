use crate::contract::{ContractBuilder, ResponseSpec, RouteContract};
use crate::error::{ApiError, SchemaMismatchError};
use crate::logger::Logger;
use crate::merge::merge_path_params;
use crate::params::ParamDef;
use crate::request::{RawRequest, ValidatedRequest};
use crate::response::ApiResponse;
use crate::schema::FieldSchema;
use http::Method;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type HandlerResult = Result<ApiResponse, ApiError>;

/// Hook run on the raw request before contract validation.
pub type BeforeValidate = Arc<dyn Fn(&mut RawRequest) -> Result<(), ApiError> + Send + Sync>;

/// Request handler invoked with an already validated request.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: ValidatedRequest, logger: &Logger) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ValidatedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler(f)
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(ValidatedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: ValidatedRequest, _logger: &Logger) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(req))
    }
}

/// Documentation attached to an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
}

/// Where an endpoint is being mounted: method, full normalized path and the
/// path parameters resolved across the enclosing scopes.
#[derive(Debug, Clone)]
pub struct RouteTarget {
    pub method: Method,
    pub path: String,
    pub path_params: Vec<ParamDef>,
}

/// An endpoint bound to a concrete route.
pub struct MountedEndpoint {
    pub contract: RouteContract,
    pub handler: Arc<dyn Handler>,
    pub operation: Operation,
    pub before_validate: Option<BeforeValidate>,
}

/// Something that can be registered on a route.
///
/// Mounting happens once, at registration; configuration defects must
/// surface here as [`SchemaMismatchError`].
pub trait Endpoint {
    fn mount(self, target: &RouteTarget) -> Result<MountedEndpoint, SchemaMismatchError>;
}

/// A hand-written endpoint: explicit parameters, body and responses plus a
/// handler.
pub struct RouteEndpoint {
    contract: ContractBuilder,
    own_path_params: Vec<ParamDef>,
    handler: Arc<dyn Handler>,
    operation: Operation,
    before_validate: Option<BeforeValidate>,
}

impl RouteEndpoint {
    pub fn new(handler: impl Handler) -> Self {
        Self {
            contract: RouteContract::builder(),
            own_path_params: Vec::new(),
            handler: Arc::new(handler),
            operation: Operation::default(),
            before_validate: None,
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        if param.is_path() {
            self.own_path_params.push(param);
        } else {
            self.contract = self.contract.param(param);
        }
        self
    }

    pub fn body(mut self, schema: FieldSchema) -> Self {
        self.contract = self.contract.body(schema);
        self
    }

    pub fn response(mut self, status: u16, spec: ResponseSpec) -> Self {
        self.contract = self.contract.response(status, spec);
        self
    }

    pub fn strict_query(mut self) -> Self {
        self.contract = self.contract.strict_query();
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.operation.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.operation.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.operation.tags.push(tag.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.operation.deprecated = true;
        self
    }

    pub fn before_validate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RawRequest) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.before_validate = Some(Arc::new(hook));
        self
    }
}

impl Endpoint for RouteEndpoint {
    fn mount(self, target: &RouteTarget) -> Result<MountedEndpoint, SchemaMismatchError> {
        if let Some(stray) = self
            .own_path_params
            .iter()
            .find(|p| !target.path_params.iter().any(|t| t.name == p.name))
        {
            return Err(SchemaMismatchError::UnknownPathParameter {
                name: stray.name.clone(),
                path: target.path.clone(),
            });
        }
        let path_params =
            merge_path_params([target.path_params.as_slice(), self.own_path_params.as_slice()]);
        let contract = self.contract.prepend_params(path_params).build()?;
        Ok(MountedEndpoint {
            contract,
            handler: self.handler,
            operation: self.operation,
            before_validate: self.before_validate,
        })
    }
}

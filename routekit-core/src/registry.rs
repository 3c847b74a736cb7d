use crate::contract::RouteContract;
use crate::error::{ApiError, FieldError, SchemaMismatchError, ValidationError, Violation};
use crate::handler::{BeforeValidate, Endpoint, Handler, Operation, RouteTarget};
use crate::logger::Logger;
use crate::merge::{join_paths, normalize_path, PathParamAccumulator};
use crate::params::ParamDef;
use crate::request::RawRequest;
use crate::response::ApiResponse;
use http::Method;
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// A route after registration: immutable contract plus handler.
#[derive(Clone)]
pub struct RegisteredRoute {
    method: Method,
    path: String,
    contract: Arc<RouteContract>,
    handler: Arc<dyn Handler>,
    operation: Operation,
    before_validate: Option<BeforeValidate>,
}

impl RegisteredRoute {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full path in OpenAPI form (`/users/{id}`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn contract(&self) -> &RouteContract {
        &self.contract
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Validate the request, run the handler and render any error with the
    /// fixed error shape.
    pub async fn call(&self, mut req: RawRequest, logger: &Logger) -> ApiResponse {
        logger.info(
            "request received",
            &json!({ "method": self.method.as_str(), "path": self.path }),
        );

        if let Some(ref hook) = self.before_validate {
            if let Err(err) = hook(&mut req) {
                return err.into_response();
            }
        }

        let validated = match self.contract.validate(&req) {
            Ok(v) => v,
            Err(err) => {
                logger.debug(
                    "request rejected",
                    &json!({ "path": self.path, "errors": err.errors().len() }),
                );
                return ApiError::Validation(err).into_response();
            }
        };

        match self.handler.call(validated, logger).await {
            Ok(response) => response,
            Err(err) => {
                if let ApiError::Storage(ref msg) = err {
                    logger.error("storage failure", &json!({ "path": self.path, "error": msg }));
                }
                err.into_response()
            }
        }
    }
}

impl std::fmt::Debug for RegisteredRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

/// Explicit collection of routes, owned by the application.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<RegisteredRoute>,
    logger: Logger,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn routes(&self) -> &[RegisteredRoute] {
        &self.routes
    }

    /// Register an endpoint at the root scope.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        endpoint: impl Endpoint,
    ) -> Result<&mut Self, SchemaMismatchError> {
        self.register(method, &PathParamAccumulator::new(), path, endpoint)?;
        Ok(self)
    }

    pub fn get(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::GET, path, endpoint)
    }

    pub fn post(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::POST, path, endpoint)
    }

    pub fn put(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::PUT, path, endpoint)
    }

    pub fn patch(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::PATCH, path, endpoint)
    }

    pub fn delete(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::DELETE, path, endpoint)
    }

    /// Open a nested scope under `prefix`.
    pub fn scope(&mut self, prefix: &str) -> Scope<'_> {
        Scope {
            registry: self,
            prefix: normalize_path(prefix),
            params: PathParamAccumulator::new(),
        }
    }

    fn register(
        &mut self,
        method: Method,
        params: &PathParamAccumulator,
        path: &str,
        endpoint: impl Endpoint,
    ) -> Result<(), SchemaMismatchError> {
        let path = normalize_path(path);
        let path_params = params.resolve(&path)?;
        let target = RouteTarget {
            method: method.clone(),
            path: path.clone(),
            path_params,
        };
        let mounted = endpoint.mount(&target)?;

        if self.find(&method, &path).is_some() {
            return Err(SchemaMismatchError::DuplicateRoute {
                method: method.to_string(),
                path,
            });
        }

        tracing::debug!(method = %method, path = %path, "Registered route");
        self.routes.push(RegisteredRoute {
            method,
            path,
            contract: Arc::new(mounted.contract),
            handler: mounted.handler,
            operation: mounted.operation,
            before_validate: mounted.before_validate,
        });
        Ok(())
    }

    /// Look up a route by method and path template.
    pub fn find(&self, method: &Method, template: &str) -> Option<&RegisteredRoute> {
        let template = normalize_path(template);
        self.routes
            .iter()
            .find(|r| r.method == *method && r.path == template)
    }

    /// Match a concrete request path. Literal segments beat parameters.
    ///
    /// Captured values are returned as they appear in the URL, still
    /// percent-encoded.
    pub fn match_route(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(&RegisteredRoute, HashMap<String, String>)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.routes
            .iter()
            .filter(|r| r.method == *method)
            .filter_map(|r| match_template(&r.path, &segments).map(|(score, p)| (score, r, p)))
            .max_by_key(|(score, _, _)| *score)
            .map(|(_, r, p)| (r, p))
    }

    /// Route a raw request by its method and path and run it.
    pub async fn dispatch(&self, mut req: RawRequest) -> ApiResponse {
        let matched = self
            .match_route(req.method(), req.path())
            .map(|(route, params)| (route.clone(), params));
        match matched {
            Some((route, params)) => {
                match decode_path_params(params) {
                    Ok(params) => req.set_path_params(params),
                    Err(err) => return ApiError::Validation(err).into_response(),
                }
                route.call(req, &self.logger).await
            }
            None => ApiError::NotFound("Route not found".into()).into_response(),
        }
    }
}

/// Match `segments` against a normalized template, returning the number of
/// literal segments matched and the captured parameters.
fn match_template(template: &str, segments: &[&str]) -> Option<(usize, HashMap<String, String>)> {
    let parts: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() != segments.len() {
        return None;
    }
    let mut literals = 0;
    let mut params = HashMap::new();
    for (part, seg) in parts.iter().zip(segments) {
        match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some(name) => {
                params.insert(name.to_string(), (*seg).to_string());
            }
            None if part == seg => literals += 1,
            None => return None,
        }
    }
    Some((literals, params))
}

/// Percent-decode captured path values. Values that do not decode to UTF-8
/// are reported under `params.<name>`.
fn decode_path_params(
    raw: HashMap<String, String>,
) -> Result<HashMap<String, String>, ValidationError> {
    let mut decoded = HashMap::with_capacity(raw.len());
    let mut errors = Vec::new();
    for (name, value) in raw {
        match percent_decode_str(&value).decode_utf8() {
            Ok(v) => {
                decoded.insert(name, v.into_owned());
            }
            Err(_) => errors.push(FieldError::new(
                vec!["params".to_string(), name],
                Violation::InvalidFormat { format: "utf-8" },
            )),
        }
    }
    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(ValidationError::new(errors))
    }
}

/// A nested registration scope. Path parameters declared here apply to
/// every route and sub-scope registered through it.
#[derive(Debug)]
pub struct Scope<'r> {
    registry: &'r mut RouteRegistry,
    prefix: String,
    params: PathParamAccumulator,
}

impl<'r> Scope<'r> {
    /// Declare path parameters contributed by this scope's prefix.
    pub fn params(mut self, defs: Vec<ParamDef>) -> Self {
        self.params.push(defs);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn scope(&mut self, prefix: &str) -> Scope<'_> {
        Scope {
            registry: &mut *self.registry,
            prefix: join_paths(&self.prefix, prefix),
            params: self.params.clone(),
        }
    }

    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        endpoint: impl Endpoint,
    ) -> Result<&mut Self, SchemaMismatchError> {
        let full = join_paths(&self.prefix, path);
        self.registry.register(method, &self.params, &full, endpoint)?;
        Ok(self)
    }

    pub fn get(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::GET, path, endpoint)
    }

    pub fn post(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::POST, path, endpoint)
    }

    pub fn put(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::PUT, path, endpoint)
    }

    pub fn patch(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::PATCH, path, endpoint)
    }

    pub fn delete(&mut self, path: &str, endpoint: impl Endpoint) -> Result<&mut Self, SchemaMismatchError> {
        self.route(Method::DELETE, path, endpoint)
    }
}

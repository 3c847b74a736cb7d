use crate::hooks::{fetch_one_hook, list_hook, mutate_hook, HookContext, Hooks, Mutation, Values};
use crate::meta::EndpointMeta;
use crate::query::{list_params, QuerySpec};
use routekit_core::handler::{BoxFuture, Endpoint, Handler, HandlerResult, MountedEndpoint, Operation, RouteTarget};
use routekit_core::merge::{bind_primary_keys, merge_path_params, KeyBinding};
use routekit_core::schema::{FieldSchema, FieldType, ObjectSchema};
use routekit_core::{
    ApiError, ApiResponse, Logger, ParamDef, RawRequest, ResponseSpec, RouteContract,
    SchemaMismatchError, ValidatedRequest,
};
use routekit_data::{ListResult, Model, Row, Storage};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// The five generated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudKind {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl CrudKind {
    fn binds_primary_keys(self) -> bool {
        matches!(self, CrudKind::Read | CrudKind::Update | CrudKind::Delete)
    }

    fn verb(self) -> &'static str {
        match self {
            CrudKind::Create => "create",
            CrudKind::Read => "get",
            CrudKind::Update => "update",
            CrudKind::Delete => "delete",
            CrudKind::List => "list",
        }
    }
}

/// A generated endpoint: one [`CrudKind`] over an [`EndpointMeta`], a
/// storage collaborator and a set of [`Hooks`].
///
/// ```ignore
/// let meta = Arc::new(EndpointMeta::builder(user).filter_fields(&["email"]).build()?);
/// registry.get("/users", CrudEndpoint::list(meta.clone(), storage.clone()))?;
/// registry.get("/users/{id}", CrudEndpoint::read(meta, storage))?;
/// ```
pub struct CrudEndpoint {
    kind: CrudKind,
    meta: Arc<EndpointMeta>,
    storage: Arc<dyn Storage>,
    hooks: Hooks,
    operation: Operation,
}

impl CrudEndpoint {
    pub fn new(kind: CrudKind, meta: impl Into<Arc<EndpointMeta>>, storage: Arc<dyn Storage>) -> Self {
        Self {
            kind,
            meta: meta.into(),
            storage,
            hooks: Hooks::default(),
            operation: Operation::default(),
        }
    }

    pub fn create(meta: impl Into<Arc<EndpointMeta>>, storage: Arc<dyn Storage>) -> Self {
        Self::new(CrudKind::Create, meta, storage)
    }

    pub fn read(meta: impl Into<Arc<EndpointMeta>>, storage: Arc<dyn Storage>) -> Self {
        Self::new(CrudKind::Read, meta, storage)
    }

    pub fn update(meta: impl Into<Arc<EndpointMeta>>, storage: Arc<dyn Storage>) -> Self {
        Self::new(CrudKind::Update, meta, storage)
    }

    pub fn delete(meta: impl Into<Arc<EndpointMeta>>, storage: Arc<dyn Storage>) -> Self {
        Self::new(CrudKind::Delete, meta, storage)
    }

    pub fn list(meta: impl Into<Arc<EndpointMeta>>, storage: Arc<dyn Storage>) -> Self {
        Self::new(CrudKind::List, meta, storage)
    }

    pub fn kind(&self) -> CrudKind {
        self.kind
    }

    pub fn with_before_validate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RawRequest) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.hooks.before_validate = Some(Arc::new(hook));
        self
    }

    pub fn with_fetch_one<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext, Values) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Row>, ApiError>> + Send + 'static,
    {
        self.hooks.fetch_one = fetch_one_hook(f);
        self
    }

    pub fn with_mutate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext, Mutation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Row, ApiError>> + Send + 'static,
    {
        self.hooks.mutate = mutate_hook(f);
        self
    }

    pub fn with_list<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext, QuerySpec) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ListResult, ApiError>> + Send + 'static,
    {
        self.hooks.list = list_hook(f);
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

    /// Replace the default tag (the model name).
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.operation.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.operation.deprecated = true;
        self
    }

    fn default_operation(&self) -> Operation {
        let name = self.meta.model().name();
        let (id, summary) = match self.kind {
            CrudKind::List => (format!("list{name}s"), format!("List {name}s")),
            kind => {
                let verb = kind.verb();
                let mut title = verb.to_string();
                title[..1].make_ascii_uppercase();
                (format!("{verb}{name}"), format!("{title} {name}"))
            }
        };
        Operation {
            operation_id: Some(self.operation.operation_id.clone().unwrap_or(id)),
            summary: Some(self.operation.summary.clone().unwrap_or(summary)),
            description: self.operation.description.clone(),
            tags: if self.operation.tags.is_empty() {
                vec![name.to_string()]
            } else {
                self.operation.tags.clone()
            },
            deprecated: self.operation.deprecated,
        }
    }
}

fn param_schema(model: &Model, field: &str) -> Result<FieldSchema, SchemaMismatchError> {
    model
        .param_schema(field)
        .ok_or_else(|| SchemaMismatchError::UnknownField {
            field: field.to_string(),
            model: model.name().to_string(),
        })
}

fn without(schema: ObjectSchema, fields: &[String]) -> ObjectSchema {
    if fields.is_empty() {
        return schema;
    }
    let mut out = match schema.title() {
        Some(t) => ObjectSchema::titled(t),
        None => ObjectSchema::new(),
    };
    for (name, field) in schema.fields() {
        if !fields.iter().any(|f| f == name) {
            out.insert(name.to_string(), field.clone());
        }
    }
    out
}

fn envelope(result: FieldSchema) -> FieldSchema {
    FieldSchema::object(
        ObjectSchema::new()
            .field("success", FieldSchema::boolean())
            .field("result", result),
    )
}

fn list_envelope(model: &Model) -> FieldSchema {
    let info = ObjectSchema::titled("ResultInfo")
        .field("page", FieldSchema::integer())
        .field("per_page", FieldSchema::integer())
        .field("count", FieldSchema::integer())
        .field("total_count", FieldSchema::integer());
    FieldSchema::object(
        ObjectSchema::new()
            .field("success", FieldSchema::boolean())
            .field(
                "result",
                FieldSchema::array(FieldType::Object(model.schema().clone())),
            )
            .field("result_info", FieldSchema::object(info)),
    )
}

impl Endpoint for CrudEndpoint {
    fn mount(self, target: &RouteTarget) -> Result<MountedEndpoint, SchemaMismatchError> {
        let model = self.meta.model();

        let bindings: Vec<KeyBinding> = if self.kind.binds_primary_keys() {
            bind_primary_keys(
                model.primary_keys(),
                &target.path_params,
                self.meta.path_parameters(),
                &target.path,
            )?
        } else {
            Vec::new()
        };

        // Remaining path parameters naming model fields scope the operation.
        let scope: Vec<String> = target
            .path_params
            .iter()
            .filter(|p| !bindings.iter().any(|b| b.param == p.name) && model.has_field(&p.name))
            .map(|p| p.name.clone())
            .collect();

        let mut typed = Vec::with_capacity(bindings.len() + scope.len());
        for b in &bindings {
            typed.push(ParamDef::path(b.param.clone(), param_schema(model, &b.key)?));
        }
        for field in &scope {
            typed.push(ParamDef::path(field.clone(), param_schema(model, field)?));
        }
        let path_params = merge_path_params([target.path_params.as_slice(), typed.as_slice()]);

        let name = model.name();
        let mut contract = RouteContract::builder().params(path_params);
        contract = match self.kind {
            CrudKind::Create => contract
                .body(FieldSchema::object(without(
                    model.create_schema(self.meta.include_primary_keys_on_create()),
                    &scope,
                )))
                .response(409, ResponseSpec::error("Conflicts with an existing record")),
            CrudKind::Read => contract.response(404, ResponseSpec::error(format!("{name} not found"))),
            CrudKind::Update => contract
                .body(FieldSchema::object(without(model.update_schema(), &scope)))
                .response(404, ResponseSpec::error(format!("{name} not found")))
                .response(409, ResponseSpec::error("Conflicts with an existing record")),
            CrudKind::Delete => contract.response(404, ResponseSpec::error(format!("{name} not found"))),
            CrudKind::List => contract.params(list_params(&self.meta)).strict_query(),
        };
        let success = match self.kind {
            CrudKind::List => list_envelope(model),
            _ => envelope(FieldSchema::object(model.schema().clone())),
        };
        let contract = contract
            .response(200, ResponseSpec::json("Successful response", success))
            .response(400, ResponseSpec::error("Validation error"))
            .response(500, ResponseSpec::error("Internal error"))
            .build()?;

        tracing::debug!(
            kind = ?self.kind,
            model = %name,
            path = %target.path,
            "Mounted CRUD endpoint"
        );

        let operation = self.default_operation();
        let before_validate = self.hooks.before_validate.clone();
        let handler = CrudHandler {
            kind: self.kind,
            meta: self.meta,
            storage: self.storage,
            hooks: self.hooks,
            bindings,
            scope,
        };
        Ok(MountedEndpoint {
            contract,
            handler: Arc::new(handler),
            operation,
            before_validate,
        })
    }
}

struct CrudHandler {
    kind: CrudKind,
    meta: Arc<EndpointMeta>,
    storage: Arc<dyn Storage>,
    hooks: Hooks,
    bindings: Vec<KeyBinding>,
    scope: Vec<String>,
}

fn path_value(req: &ValidatedRequest, param: &str) -> Result<Value, ApiError> {
    req.param(param)
        .cloned()
        .ok_or_else(|| ApiError::Storage(format!("path parameter '{param}' missing after validation")))
}

/// Body fields present in the request, in model order, minus `skip`.
fn body_values(model: &Model, body: Option<&Value>, skip: impl Fn(&str) -> bool) -> Values {
    let Some(Value::Object(body)) = body else {
        return Vec::new();
    };
    model
        .fields()
        .filter(|(name, _)| !skip(name))
        .filter_map(|(name, _)| body.get(name).map(|v| (name.to_string(), v.clone())))
        .collect()
}

impl CrudHandler {
    fn key_filters(&self, req: &ValidatedRequest) -> Result<Values, ApiError> {
        let mut filters = self.scope_filters(req)?;
        let mut keys = Vec::with_capacity(self.bindings.len());
        for b in &self.bindings {
            keys.push((b.key.clone(), path_value(req, &b.param)?));
        }
        keys.append(&mut filters);
        Ok(keys)
    }

    fn scope_filters(&self, req: &ValidatedRequest) -> Result<Values, ApiError> {
        self.scope
            .iter()
            .map(|f| Ok((f.clone(), path_value(req, f)?)))
            .collect()
    }

    fn not_found(&self) -> ApiError {
        ApiError::NotFound(format!("{} not found", self.meta.model().name()))
    }
}

impl Handler for CrudHandler {
    fn call(&self, req: ValidatedRequest, logger: &Logger) -> BoxFuture<'static, HandlerResult> {
        let ctx = HookContext {
            storage: self.storage.clone(),
            meta: self.meta.clone(),
            logger: logger.clone(),
        };
        let hooks = self.hooks.clone();
        let model = self.meta.model();

        let prepared: Result<Prepared, ApiError> = match self.kind {
            CrudKind::Create => self.scope_filters(&req).map(|scope| {
                let mut values = body_values(model, req.body(), |f| scope.iter().any(|(s, _)| s == f));
                values.extend(scope);
                Prepared::Create(values)
            }),
            CrudKind::Read => self.key_filters(&req).map(Prepared::Read),
            CrudKind::Update => self.key_filters(&req).map(|filters| {
                let values = body_values(model, req.body(), |f| {
                    model.is_primary_key(f) || self.scope.iter().any(|s| s == f)
                });
                Prepared::Update(filters, values)
            }),
            CrudKind::Delete => self.key_filters(&req).map(Prepared::Delete),
            CrudKind::List => self
                .scope_filters(&req)
                .and_then(|scope| Ok(QuerySpec::from_request(&self.meta, &req, scope)?))
                .map(Prepared::List),
        };
        let not_found = self.not_found();

        Box::pin(async move {
            match prepared? {
                Prepared::Create(values) => {
                    let row = (hooks.mutate)(ctx, Mutation::Insert { values }).await?;
                    Ok(ApiResponse::success(Value::Object(row)))
                }
                Prepared::Read(filters) => match (hooks.fetch_one)(ctx, filters).await? {
                    Some(row) => Ok(ApiResponse::success(Value::Object(row))),
                    None => Err(not_found),
                },
                Prepared::Update(filters, values) => {
                    let Some(existing) = (hooks.fetch_one)(ctx.clone(), filters.clone()).await? else {
                        return Err(not_found);
                    };
                    if values.is_empty() {
                        return Ok(ApiResponse::success(Value::Object(existing)));
                    }
                    let row = (hooks.mutate)(ctx, Mutation::Update { filters, values }).await?;
                    Ok(ApiResponse::success(Value::Object(row)))
                }
                Prepared::Delete(filters) => {
                    if (hooks.fetch_one)(ctx.clone(), filters.clone()).await?.is_none() {
                        return Err(not_found);
                    }
                    let row = (hooks.mutate)(ctx, Mutation::Delete { filters }).await?;
                    Ok(ApiResponse::success(Value::Object(row)))
                }
                Prepared::List(spec) => {
                    let list = (hooks.list)(ctx, spec).await?;
                    Ok(ApiResponse::ok(list.to_value()))
                }
            }
        })
    }
}

enum Prepared {
    Create(Values),
    Read(Values),
    Update(Values, Values),
    Delete(Values),
    List(QuerySpec),
}

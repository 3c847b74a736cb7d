use crate::components::{error_schema, ComponentRegistry, ERROR_SCHEMA};
use crate::config::OpenApiConfig;
use routekit_core::{RegisteredRoute, RouteRegistry};
use serde_json::{json, Map, Value};

/// Build the OpenAPI document for every route in `registry`.
///
/// Routes are visited in `(path, method)` order and every object in the
/// output is key-sorted, so the result depends only on the set of routes,
/// not on the order they were registered in.
pub fn assemble(config: &OpenApiConfig, registry: &RouteRegistry) -> Value {
    let mut routes: Vec<&RegisteredRoute> = registry.routes().iter().collect();
    routes.sort_by(|a, b| {
        (a.path(), a.method().as_str()).cmp(&(b.path(), b.method().as_str()))
    });

    let mut components = ComponentRegistry::new();
    let error_ref = routes
        .iter()
        .any(|r| r.contract().responses().keys().any(|status| *status >= 400))
        .then(|| {
            let name = components.register(ERROR_SCHEMA, error_schema());
            format!("#/components/schemas/{name}")
        });

    let mut paths: Map<String, Value> = Map::new();
    for route in &routes {
        let mut operation = describe_operation(route, error_ref.as_deref());
        components.hoist(&mut operation);

        let item = paths
            .entry(route.path().to_string())
            .or_insert_with(|| json!({}));
        if let Some(obj) = item.as_object_mut() {
            obj.insert(route.method().as_str().to_lowercase(), operation);
        }
    }
    for item in paths.values_mut() {
        if let Some(obj) = item.as_object_mut() {
            lift_path_parameters(obj);
        }
    }

    tracing::debug!(
        paths = paths.len(),
        schemas = components.len(),
        "Assembled OpenAPI document"
    );

    let mut doc = Map::new();
    doc.insert("openapi".into(), json!(config.openapi));
    doc.insert("info".into(), json!(config.info()));
    if !config.servers.is_empty() {
        doc.insert("servers".into(), json!(config.servers));
    }
    doc.insert("paths".into(), Value::Object(paths));
    doc.insert(
        "components".into(),
        json!({ "schemas": Value::Object(components.into_map()) }),
    );
    sort_keys(Value::Object(doc))
}

/// [`assemble`] serialized to compact JSON.
pub fn assemble_json(config: &OpenApiConfig, registry: &RouteRegistry) -> String {
    assemble(config, registry).to_string()
}

fn describe_operation(route: &RegisteredRoute, error_ref: Option<&str>) -> Value {
    let mut operation = match route.contract().describe() {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };

    let meta = route.operation();
    if let Some(ref id) = meta.operation_id {
        operation.insert("operationId".into(), json!(id));
    }
    if let Some(ref summary) = meta.summary {
        operation.insert("summary".into(), json!(summary));
    }
    if let Some(ref description) = meta.description {
        operation.insert("description".into(), json!(description));
    }
    if !meta.tags.is_empty() {
        operation.insert("tags".into(), json!(meta.tags));
    }
    if meta.deprecated {
        operation.insert("deprecated".into(), json!(true));
    }

    if let (Some(reference), Some(Value::Object(responses))) =
        (error_ref, operation.get_mut("responses"))
    {
        for (status, response) in responses.iter_mut() {
            let is_error = status.parse::<u16>().is_ok_and(|s| s >= 400);
            if let (true, Some(obj)) = (is_error, response.as_object_mut()) {
                obj.entry("content").or_insert_with(|| {
                    json!({ "application/json": { "schema": { "$ref": reference } } })
                });
            }
        }
    }

    Value::Object(operation)
}

/// Move path parameters shared verbatim by every operation of a path item
/// up to the path item.
fn lift_path_parameters(item: &mut Map<String, Value>) {
    let mut shared: Option<Vec<Value>> = None;
    for operation in item.values() {
        let params = path_parameters(operation);
        match shared {
            None => shared = Some(params),
            Some(ref s) if *s == params => {}
            Some(_) => return,
        }
    }
    let Some(shared) = shared.filter(|s| !s.is_empty()) else {
        return;
    };

    for operation in item.values_mut() {
        let Some(op) = operation.as_object_mut() else {
            continue;
        };
        let remaining: Vec<Value> = match op.get("parameters") {
            Some(Value::Array(params)) => params
                .iter()
                .filter(|p| p["in"] != "path")
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        if remaining.is_empty() {
            op.remove("parameters");
        } else {
            op.insert("parameters".into(), Value::Array(remaining));
        }
    }
    item.insert("parameters".into(), Value::Array(shared));
}

fn path_parameters(operation: &Value) -> Vec<Value> {
    operation["parameters"]
        .as_array()
        .map(|params| {
            params
                .iter()
                .filter(|p| p["in"] == "path")
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Rebuild every object with its keys in sorted order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(obj) => {
            let mut entries: Vec<(String, Value)> = obj.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

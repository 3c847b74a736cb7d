use routekit_core::{
    handler_fn, ApiResponse, FieldSchema, ObjectSchema, ParamDef, RouteEndpoint, RouteRegistry,
};
use routekit_crud::{CrudEndpoint, EndpointMeta};
use routekit_data::Model;
use routekit_openapi::{assemble, assemble_json, CachedDocument, OpenApiConfig, Server};
use routekit_test::MockStorage;
use serde_json::{json, Value};
use std::sync::Arc;

// ── Helpers ─────────────────────────────────────────────────

fn config() -> OpenApiConfig {
    OpenApiConfig::new("Users API", "1.2.0").with_server(Server::new("https://api.example.com"))
}

fn user_meta() -> Arc<EndpointMeta> {
    let model = Model::builder("User")
        .field("id", FieldSchema::integer())
        .field("email", FieldSchema::email())
        .field("name", FieldSchema::string().optional())
        .primary_key("id")
        .build()
        .unwrap();
    Arc::new(
        EndpointMeta::builder(model)
            .filter_fields(&["email"])
            .build()
            .unwrap(),
    )
}

fn health() -> RouteEndpoint {
    RouteEndpoint::new(handler_fn(|_req| async { Ok(ApiResponse::success(json!("ok"))) }))
        .operation_id("health")
        .tag("ops")
}

fn register(registry: &mut RouteRegistry, which: usize, meta: Arc<EndpointMeta>, storage: Arc<MockStorage>) {
    match which {
        0 => registry.get("/users", CrudEndpoint::list(meta, storage)),
        1 => registry.post("/users", CrudEndpoint::create(meta, storage)),
        2 => registry.get("/users/{id}", CrudEndpoint::read(meta, storage)),
        3 => registry.patch("/users/{id}", CrudEndpoint::update(meta, storage)),
        4 => registry.delete("/users/{id}", CrudEndpoint::delete(meta, storage)),
        _ => registry.get("/health", health()),
    }
    .unwrap();
}

fn registry_in(order: &[usize]) -> RouteRegistry {
    let meta = user_meta();
    let storage = Arc::new(MockStorage::new());
    let mut registry = RouteRegistry::new();
    for &i in order {
        register(&mut registry, i, meta.clone(), storage.clone());
    }
    registry
}

fn registry() -> RouteRegistry {
    registry_in(&[0, 1, 2, 3, 4, 5])
}

fn schema_ref(value: &Value) -> &str {
    value["$ref"].as_str().unwrap_or_default()
}

// ── Determinism ─────────────────────────────────────────────

#[test]
fn assembling_twice_is_byte_identical() {
    let registry = registry();
    assert_eq!(assemble_json(&config(), &registry), assemble_json(&config(), &registry));
}

#[test]
fn registration_order_does_not_matter() {
    let forward = assemble_json(&config(), &registry_in(&[0, 1, 2, 3, 4, 5]));
    let backward = assemble_json(&config(), &registry_in(&[5, 4, 3, 2, 1, 0]));
    let shuffled = assemble_json(&config(), &registry_in(&[3, 5, 0, 4, 2, 1]));
    assert_eq!(forward, backward);
    assert_eq!(forward, shuffled);
}

// ── Document shape ──────────────────────────────────────────

#[test]
fn top_level_fields() {
    let doc = assemble(&config(), &registry());
    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(doc["info"]["title"], "Users API");
    assert_eq!(doc["info"]["version"], "1.2.0");
    assert_eq!(doc["servers"], json!([{ "url": "https://api.example.com" }]));
    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(paths, vec!["/health", "/users", "/users/{id}"]);
}

#[test]
fn crud_operations_carry_their_metadata() {
    let doc = assemble(&config(), &registry());
    let users = &doc["paths"]["/users"];
    assert_eq!(users["get"]["operationId"], "listUsers");
    assert_eq!(users["post"]["operationId"], "createUser");
    assert_eq!(users["post"]["tags"], json!(["User"]));
    let item = &doc["paths"]["/users/{id}"];
    assert_eq!(item["get"]["operationId"], "getUser");
    assert_eq!(item["patch"]["operationId"], "updateUser");
    assert_eq!(item["delete"]["operationId"], "deleteUser");
    assert_eq!(doc["paths"]["/health"]["get"]["tags"], json!(["ops"]));
}

#[test]
fn shared_path_parameters_move_to_the_path_item() {
    let doc = assemble(&config(), &registry());
    let item = &doc["paths"]["/users/{id}"];
    assert_eq!(item["parameters"].as_array().unwrap().len(), 1);
    assert_eq!(item["parameters"][0]["name"], "id");
    assert_eq!(item["parameters"][0]["in"], "path");
    assert_eq!(item["parameters"][0]["required"], true);
    assert_eq!(item["parameters"][0]["schema"]["type"], "integer");
    for method in ["get", "patch", "delete"] {
        assert!(item[method].get("parameters").is_none(), "{method} kept its parameters");
    }
}

#[test]
fn list_parameters_are_documented() {
    let doc = assemble(&config(), &registry());
    let names: Vec<&str> = doc["paths"]["/users"]["get"]["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["page", "per_page", "email"]);
}

// ── Components ──────────────────────────────────────────────

#[test]
fn model_schema_is_shared_by_reference() {
    let doc = assemble(&config(), &registry());
    let schemas = doc["components"]["schemas"].as_object().unwrap();
    let names: Vec<&String> = schemas.keys().collect();
    assert_eq!(
        names,
        vec!["Error", "ResultInfo", "User", "UserCreate", "UserUpdate"]
    );

    let read = &doc["paths"]["/users/{id}"]["get"]["responses"]["200"]["content"]
        ["application/json"]["schema"];
    assert_eq!(schema_ref(&read["properties"]["result"]), "#/components/schemas/User");

    let list = &doc["paths"]["/users"]["get"]["responses"]["200"]["content"]["application/json"]
        ["schema"];
    assert_eq!(
        schema_ref(&list["properties"]["result"]["items"]),
        "#/components/schemas/User"
    );
    assert_eq!(
        schema_ref(&list["properties"]["result_info"]),
        "#/components/schemas/ResultInfo"
    );

    let create = &doc["paths"]["/users"]["post"]["requestBody"]["content"]["application/json"]
        ["schema"];
    assert_eq!(schema_ref(create), "#/components/schemas/UserCreate");
    assert!(schemas["UserCreate"]["properties"].get("id").is_none());
}

#[test]
fn error_responses_reference_the_error_component() {
    let doc = assemble(&config(), &registry());
    let responses = &doc["paths"]["/users/{id}"]["delete"]["responses"];
    for status in ["400", "404", "500"] {
        assert_eq!(
            schema_ref(&responses[status]["content"]["application/json"]["schema"]),
            "#/components/schemas/Error"
        );
    }
    assert!(responses.get("409").is_none());
    let error = &doc["components"]["schemas"]["Error"];
    assert_eq!(error["required"], json!(["success", "errors"]));
}

#[test]
fn conflicting_titles_get_numbered_names() {
    let mut registry = registry();
    let other_user = ObjectSchema::titled("User").field("handle", FieldSchema::string());
    registry
        .post(
            "/v2/users",
            RouteEndpoint::new(handler_fn(|_req| async { Ok(ApiResponse::success(json!(null))) }))
                .body(FieldSchema::object(other_user)),
        )
        .unwrap();

    let doc = assemble(&config(), &registry);
    let body = &doc["paths"]["/v2/users"]["post"]["requestBody"]["content"]
        ["application/json"]["schema"];
    assert_eq!(schema_ref(body), "#/components/schemas/User2");
    assert_eq!(
        doc["components"]["schemas"]["User2"]["properties"],
        json!({ "handle": { "type": "string" } })
    );
    assert!(doc["components"]["schemas"]["User"]["properties"].get("email").is_some());
}

#[test]
fn routes_without_error_responses_add_no_error_component() {
    let mut registry = RouteRegistry::new();
    registry.get("/health", health()).unwrap();
    let doc = assemble(&config(), &registry);
    assert!(doc["components"]["schemas"].get("Error").is_none());
}

// ── Cache ───────────────────────────────────────────────────

#[test]
fn cached_document_matches_a_fresh_assembly() {
    let registry = Arc::new(registry());
    let cache = CachedDocument::new(config(), registry.clone());
    assert!(!cache.is_built());
    assert_eq!(cache.json(), assemble_json(&config(), &registry));
    assert!(cache.is_built());
    assert_eq!(cache.value()["paths"]["/users"]["get"]["operationId"], "listUsers");
}

#[test]
fn path_parameter_declared_on_a_scope_is_typed() {
    let mut registry = RouteRegistry::new();
    registry
        .scope("/orgs/{org}")
        .params(vec![ParamDef::path("org", FieldSchema::uuid())])
        .get("/health", health())
        .unwrap();
    let doc = assemble(&config(), &registry);
    let item = &doc["paths"]["/orgs/{org}/health"];
    assert_eq!(item["parameters"][0]["schema"]["format"], "uuid");
}

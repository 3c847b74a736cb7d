use routekit::prelude::*;
use routekit_test::{row, MockStorage, TestApp};
use serde_json::json;
use std::sync::Arc;

const CONFIG: &str = "
openapi:
  title: Notes
  version: 0.3.0
pagination:
  default_per_page: 5
  max_per_page: 10
";

fn build(storage: Arc<MockStorage>) -> (RouteRegistry, OpenApiConfig) {
    let config = ApiConfig::from_yaml_str(CONFIG).unwrap();
    let note = Model::builder("Note")
        .field("id", FieldSchema::integer())
        .field("body", FieldSchema::string().min_length(1))
        .primary_key("id")
        .build()
        .unwrap();
    let meta = Arc::new(
        EndpointMeta::builder(note)
            .search_fields(&["body"])
            .pagination(config.pagination)
            .build()
            .unwrap(),
    );

    let mut registry = RouteRegistry::new();
    registry
        .get("/notes", CrudEndpoint::list(meta.clone(), storage.clone()))
        .unwrap()
        .get("/notes/{id}", CrudEndpoint::read(meta, storage))
        .unwrap()
        .get(
            "/health",
            RouteEndpoint::new(handler_fn(|_req| async { Ok(ApiResponse::success(json!("ok"))) })),
        )
        .unwrap();
    (registry, OpenApiConfig::from(&config))
}

#[tokio::test]
async fn configured_pagination_reaches_the_list_endpoint() {
    let storage = Arc::new(
        MockStorage::new()
            .push_count(1)
            .push_rows(vec![row(json!({ "id": 1, "body": "hello" }))]),
    );
    let (registry, _) = build(storage.clone());
    let app = TestApp::new(registry);

    app.get("/notes")
        .send()
        .await
        .assert_ok()
        .assert_json_path("result_info.per_page", 5);
    assert!(storage.executed_sql()[1].ends_with("LIMIT 5 OFFSET 0"));

    app.get("/notes?per_page=11")
        .send()
        .await
        .assert_bad_request()
        .assert_error_at("query.per_page", 7001);
}

#[test]
fn document_uses_the_configured_info() {
    let (registry, config) = build(Arc::new(MockStorage::new()));
    let doc = assemble(&config, &registry);
    assert_eq!(doc["info"]["title"], "Notes");
    assert_eq!(doc["info"]["version"], "0.3.0");
    assert_eq!(
        doc["paths"]["/notes"]["get"]["parameters"][1]["schema"]["maximum"],
        10
    );
    assert!(doc["components"]["schemas"].get("Note").is_some());
}

use http::{Method, StatusCode};
use routekit_core::prelude::*;
use routekit_core::{ApiLogger, SchemaMismatchError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn echo() -> RouteEndpoint {
    RouteEndpoint::new(handler_fn(|req: ValidatedRequest| async move {
        Ok(ApiResponse::success(req.to_value()))
    }))
}

#[test]
fn undeclared_segments_become_string_params() {
    let mut registry = RouteRegistry::new();
    registry.get("/orgs/:org/users/{id}", echo()).unwrap();

    let route = registry.find(&Method::GET, "/orgs/{org}/users/{id}").unwrap();
    let names: Vec<&str> = route.contract().params().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["org", "id"]);
    assert!(route
        .contract()
        .params()
        .iter()
        .all(|p| p.schema.ty == FieldType::String));
}

#[test]
fn nested_scopes_merge_path_params() {
    let mut registry = RouteRegistry::new();
    {
        let mut orgs = registry
            .scope("/orgs/{org}")
            .params(vec![ParamDef::path("org", FieldSchema::string())]);
        let mut teams = orgs
            .scope("/teams/{team}")
            .params(vec![
                ParamDef::path("team", FieldSchema::integer()),
                ParamDef::path("org", FieldSchema::uuid()),
            ]);
        teams.get("/members", echo()).unwrap();
    }

    let route = registry
        .find(&Method::GET, "/orgs/{org}/teams/{team}/members")
        .unwrap();
    let params = route.contract().params();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "org");
    assert_eq!(params[0].schema.ty, FieldType::Uuid);
    assert_eq!(params[1].name, "team");
    assert_eq!(params[1].schema.ty, FieldType::Integer);
}

#[test]
fn scope_param_missing_from_url_is_refused() {
    let mut registry = RouteRegistry::new();
    let mut scope = registry
        .scope("/items")
        .params(vec![ParamDef::path("id", FieldSchema::integer())]);
    let err = scope.get("/", echo()).unwrap_err();
    assert_eq!(
        err,
        SchemaMismatchError::UnknownPathParameter {
            name: "id".into(),
            path: "/items".into(),
        }
    );
}

#[test]
fn duplicate_route_is_refused() {
    let mut registry = RouteRegistry::new();
    registry.get("/a/{id}", echo()).unwrap();
    let err = registry.get("/a/:id", echo()).unwrap_err();
    assert!(matches!(err, SchemaMismatchError::DuplicateRoute { .. }));
    registry.post("/a/{id}", echo()).unwrap();
    assert_eq!(registry.routes().len(), 2);
}

#[tokio::test]
async fn dispatch_validates_and_invokes_handler() {
    let mut registry = RouteRegistry::new();
    registry
        .get(
            "/users/{id}",
            echo()
                .param(ParamDef::path("id", FieldSchema::integer()))
                .param(ParamDef::query("verbose", FieldSchema::boolean().optional())),
        )
        .unwrap();

    let res = registry
        .dispatch(RawRequest::new(Method::GET, "/users/7?verbose=true"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body()["success"], true);
    assert_eq!(res.body()["result"]["params"]["id"], 7);
    assert_eq!(res.body()["result"]["query"]["verbose"], true);

    let res = registry
        .dispatch(RawRequest::new(Method::GET, "/users/abc"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.body(),
        &json!({
            "success": false,
            "errors": [{ "code": 7001, "message": "Expected integer", "path": ["params", "id"] }]
        })
    );
}

#[tokio::test]
async fn path_values_are_percent_decoded() {
    let mut registry = RouteRegistry::new();
    registry
        .get(
            "/accounts/{email}/files/{name}",
            echo()
                .param(ParamDef::path("email", FieldSchema::email()))
                .param(ParamDef::path("name", FieldSchema::string())),
        )
        .unwrap();

    let res = registry
        .dispatch(RawRequest::new(Method::GET, "/accounts/a%40b.com/files/my%20notes%2Ftxt"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body()["result"]["params"]["email"], "a@b.com");
    assert_eq!(res.body()["result"]["params"]["name"], "my notes/txt");

    let res = registry
        .dispatch(RawRequest::new(Method::GET, "/accounts/a%40b.com/files/%FF"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.body()["errors"][0]["path"], json!(["params", "name"]));
    assert_eq!(res.body()["errors"][0]["message"], "Invalid utf-8");
}

#[tokio::test]
async fn literal_segments_win_over_parameters() {
    let mut registry = RouteRegistry::new();
    registry
        .get(
            "/users/{id}",
            RouteEndpoint::new(handler_fn(|_req| async {
                Ok(ApiResponse::success(json!("by id")))
            })),
        )
        .unwrap();
    registry
        .get(
            "/users/me",
            RouteEndpoint::new(handler_fn(|_req| async {
                Ok(ApiResponse::success(json!("me")))
            })),
        )
        .unwrap();

    let res = registry.dispatch(RawRequest::new(Method::GET, "/users/me")).await;
    assert_eq!(res.body()["result"], "me");
    let res = registry.dispatch(RawRequest::new(Method::GET, "/users/3")).await;
    assert_eq!(res.body()["result"], "by id");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let registry = RouteRegistry::new();
    let res = registry.dispatch(RawRequest::new(Method::GET, "/nope")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body()["errors"][0]["code"], 7002);
}

#[tokio::test]
async fn before_validate_can_rewrite_or_reject() {
    let mut registry = RouteRegistry::new();
    registry
        .get(
            "/search",
            echo()
                .param(ParamDef::query("q", FieldSchema::string()))
                .before_validate(|req: &mut RawRequest| {
                    if req.header_values("x-block").is_empty() {
                        req.query_pairs_mut().push(("q".into(), "injected".into()));
                        Ok(())
                    } else {
                        Err(ApiError::NotFound("Blocked".into()))
                    }
                }),
        )
        .unwrap();

    let res = registry.dispatch(RawRequest::new(Method::GET, "/search")).await;
    assert_eq!(res.body()["result"]["query"]["q"], "injected");

    let res = registry
        .dispatch(RawRequest::new(Method::GET, "/search").header("x-block", "1"))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[derive(Default)]
struct Lines(Mutex<Vec<String>>);

impl ApiLogger for Lines {
    fn log(&self, m: &str, _: &Value) {
        self.0.lock().unwrap().push(format!("log {m}"));
    }
    fn info(&self, m: &str, _: &Value) {
        self.0.lock().unwrap().push(format!("info {m}"));
    }
    fn warn(&self, m: &str, _: &Value) {
        self.0.lock().unwrap().push(format!("warn {m}"));
    }
    fn error(&self, m: &str, _: &Value) {
        self.0.lock().unwrap().push(format!("error {m}"));
    }
    fn debug(&self, m: &str, _: &Value) {
        self.0.lock().unwrap().push(format!("debug {m}"));
    }
    fn trace(&self, m: &str, _: &Value) {
        self.0.lock().unwrap().push(format!("trace {m}"));
    }
}

#[tokio::test]
async fn storage_failures_are_logged_and_hidden() {
    let lines = Arc::new(Lines::default());
    let mut registry = RouteRegistry::new().with_logger(Logger::from_arc(lines.clone()));
    registry
        .get(
            "/boom",
            RouteEndpoint::new(handler_fn(|_req| async {
                Err(ApiError::Storage("disk on fire".into()))
            })),
        )
        .unwrap();

    let res = registry.dispatch(RawRequest::new(Method::GET, "/boom")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body()["errors"][0]["message"], "Internal Error");
    assert!(!res.body().to_string().contains("disk on fire"));

    let seen = lines.0.lock().unwrap().clone();
    assert_eq!(seen, vec!["info request received", "error storage failure"]);
}

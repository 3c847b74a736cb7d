use http::header::{HeaderMap, HeaderName};
use http::{Method, StatusCode};
use routekit_core::{ApiResponse, RawRequest, RouteRegistry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// In-process test client dispatching through a [`RouteRegistry`].
pub struct TestApp {
    registry: RouteRegistry,
}

impl TestApp {
    pub fn new(registry: RouteRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Start building a GET request.
    pub fn get(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::GET, path)
    }

    /// Start building a POST request.
    pub fn post(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::POST, path)
    }

    /// Start building a PUT request.
    pub fn put(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::PUT, path)
    }

    /// Start building a PATCH request.
    pub fn patch(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::PATCH, path)
    }

    /// Start building a DELETE request.
    pub fn delete(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::DELETE, path)
    }

    pub fn request(&self, method: Method, path: &str) -> TestRequest<'_> {
        TestRequest {
            app: self,
            raw: RawRequest::new(method, path),
        }
    }
}

/// Builder for constructing and sending a test request.
pub struct TestRequest<'a> {
    app: &'a TestApp,
    raw: RawRequest,
}

impl<'a> TestRequest<'a> {
    /// Add a custom header.
    pub fn header(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.raw = self.raw.header(name, value.as_ref());
        self
    }

    /// Set the request body as JSON. Also sets Content-Type to `application/json`.
    pub fn json(mut self, body: &impl Serialize) -> Self {
        let value = serde_json::to_value(body).unwrap();
        self.raw = self.raw.json(&value);
        self
    }

    /// Set a raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw = self.raw.body(body.into());
        self
    }

    /// Dispatch the request and return the response.
    pub async fn send(self) -> TestResponse {
        TestResponse::from(self.app.registry.dispatch(self.raw).await)
    }
}

// ─── JSON path resolution ───

#[derive(Debug)]
pub enum PathToken {
    Field(String),
    Index(usize),
    Len,
}

pub fn tokenize_path(path: &str) -> Vec<PathToken> {
    let mut tokens = Vec::new();
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        if segment == "len()" {
            tokens.push(PathToken::Len);
            continue;
        }
        if let Some(bracket_pos) = segment.find('[') {
            let field = &segment[..bracket_pos];
            if !field.is_empty() {
                tokens.push(PathToken::Field(field.to_string()));
            }
            let mut rest = &segment[bracket_pos..];
            while let Some(start) = rest.find('[') {
                let end = rest.find(']').expect("unclosed bracket in JSON path");
                let index: usize = rest[start + 1..end]
                    .parse()
                    .expect("non-numeric array index in JSON path");
                tokens.push(PathToken::Index(index));
                rest = &rest[end + 1..];
            }
        } else {
            tokens.push(PathToken::Field(segment.to_string()));
        }
    }
    tokens
}

pub fn resolve_path(root: &Value, path: &str) -> Value {
    let mut current = root.clone();
    for token in tokenize_path(path) {
        current = match token {
            PathToken::Field(name) => current.get(&name).cloned().unwrap_or(Value::Null),
            PathToken::Index(idx) => current.get(idx).cloned().unwrap_or(Value::Null),
            PathToken::Len => {
                let len = match &current {
                    Value::Array(a) => a.len(),
                    Value::Object(o) => o.len(),
                    Value::String(s) => s.len(),
                    other => panic!("len() applied to non-collection: {other}"),
                };
                Value::from(len)
            }
        };
    }
    current
}

// ─── TestResponse ───

/// Response wrapper with status assertions, JSON-path assertions and the
/// error-shape helpers.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl From<ApiResponse> for TestResponse {
    fn from(res: ApiResponse) -> Self {
        Self {
            status: res.status(),
            headers: res.headers().clone(),
            body: res.into_body(),
        }
    }
}

impl TestResponse {
    /// Assert status is 200 OK.
    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    /// Assert status is 400 Bad Request.
    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    /// Assert status is 404 Not Found.
    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    /// Assert status is 409 Conflict.
    pub fn assert_conflict(self) -> Self {
        self.assert_status(StatusCode::CONFLICT)
    }

    /// Assert status is 500 Internal Server Error.
    pub fn assert_internal_error(self) -> Self {
        self.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "Expected {expected}, got {}\nBody: {}",
            self.status, self.body
        );
        self
    }

    /// Assert that a JSON path resolves to the expected value.
    ///
    /// ```ignore
    /// resp.assert_json_path("result[0].email", "a@b.io")
    ///     .assert_json_path("result.len()", 2)
    ///     .assert_json_path("result_info.total_count", 2);
    /// ```
    pub fn assert_json_path(self, path: &str, expected: impl Into<Value>) -> Self {
        let actual = resolve_path(&self.body, path);
        let expected = expected.into();
        assert_eq!(
            actual, expected,
            "JSON path \"{path}\" assertion failed\n  Expected: {expected}\n  Actual:   {actual}\n  Body: {}",
            self.body
        );
        self
    }

    /// Assert that a JSON path satisfies a predicate.
    pub fn assert_json_path_fn(self, path: &str, predicate: impl FnOnce(&Value) -> bool) -> Self {
        let actual = resolve_path(&self.body, path);
        assert!(
            predicate(&actual),
            "JSON path \"{path}\" predicate failed\n  Value: {actual}\n  Body: {}",
            self.body
        );
        self
    }

    /// Assert the body is the error shape and carries an error at `path`
    /// (e.g. `body.email`) with `code`.
    pub fn assert_error_at(self, path: &str, code: u32) -> Self {
        let found = self.body["errors"].as_array().is_some_and(|errors| {
            errors.iter().any(|e| {
                let joined = e["path"]
                    .as_array()
                    .map(|p| p.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("."));
                e["code"] == code && joined.as_deref() == Some(path)
            })
        });
        assert!(
            self.body["success"] == false && found,
            "No error with code {code} at \"{path}\"\n  Body: {}",
            self.body
        );
        self
    }

    /// Extract and deserialize a value at a JSON path.
    pub fn json_path<T: DeserializeOwned>(&self, path: &str) -> T {
        let value = resolve_path(&self.body, path);
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize JSON path \"{path}\": {e}\n  Value: {value}\n  Body: {}",
                self.body
            )
        })
    }

    /// Get a response header value by name.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name: HeaderName = name.as_ref().parse().ok()?;
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Deserialize the entire response body.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.body.clone())
            .unwrap_or_else(|e| panic!("Failed to deserialize body: {e}\nBody: {}", self.body))
    }
}

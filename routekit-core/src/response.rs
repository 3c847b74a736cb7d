use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};

/// A JSON response produced by a handler or by the error path.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// `{ "success": true, "result": result }`.
    pub fn success(result: Value) -> Self {
        Self::ok(json!({ "success": true, "result": result }))
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Convert into an `http::Response` carrying the serialized JSON.
    pub fn into_http(self) -> http::Response<Bytes> {
        let bytes = Bytes::from(self.body.to_string());
        let mut response = http::Response::new(bytes);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

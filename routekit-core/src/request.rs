use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Parse a query string into key-value pairs.
pub fn parse_query_string(query: Option<&str>) -> Vec<(String, String)> {
    match query {
        Some(q) => form_urlencoded::parse(q.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

/// An incoming request as handed over by the HTTP layer, before validation.
#[derive(Debug, Clone)]
pub struct RawRequest {
    method: Method,
    path: String,
    path_params: HashMap<String, String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RawRequest {
    /// Build from a method and a request target (`/users?page=2`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_string(),
            path_params: HashMap::new(),
            query: parse_query_string(query),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "Ignoring invalid header"),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json(mut self, value: &Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(value.to_string()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn query_pairs_mut(&mut self) -> &mut Vec<(String, String)> {
        &mut self.query
    }

    /// Every value sent for a query key, in order.
    pub fn query_values(&self, name: &str) -> Vec<String> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect()
    }

    /// Cookie values for `name`, read from every `Cookie` header.
    pub fn cookie_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
            .collect()
    }

    pub fn raw_body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Option<Bytes>) {
        self.body = body;
    }
}

/// Decoded request data, produced only when every contract rule holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRequest {
    params: Map<String, Value>,
    query: Map<String, Value>,
    headers: Map<String, Value>,
    cookies: Map<String, Value>,
    body: Option<Value>,
}

impl ValidatedRequest {
    pub(crate) fn new(
        params: Map<String, Value>,
        query: Map<String, Value>,
        headers: Map<String, Value>,
        cookies: Map<String, Value>,
        body: Option<Value>,
    ) -> Self {
        Self {
            params,
            query,
            headers,
            cookies,
            body,
        }
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn headers(&self) -> &Map<String, Value> {
        &self.headers
    }

    pub fn cookies(&self) -> &Map<String, Value> {
        &self.cookies
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// The whole request as `{ params, query, headers, body }`.
    pub fn to_value(&self) -> Value {
        json!({
            "params": self.params,
            "query": self.query,
            "headers": self.headers,
            "cookies": self.cookies,
            "body": self.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_splits_query() {
        let req = RawRequest::new(Method::GET, "/users?page=2&tag=a&tag=b&name=J%C3%B6");
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query_values("tag"), vec!["a", "b"]);
        assert_eq!(req.query_values("name"), vec!["Jö"]);
    }

    #[test]
    fn cookies_are_parsed() {
        let req = RawRequest::new(Method::GET, "/")
            .header("cookie", "session=abc; theme=dark")
            .header("cookie", "lang=en");
        assert_eq!(req.cookie_values("theme"), vec!["dark"]);
        assert_eq!(req.cookie_values("lang"), vec!["en"]);
        assert!(req.cookie_values("missing").is_empty());
    }
}

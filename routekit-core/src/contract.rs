use crate::error::{FieldError, SchemaMismatchError, ValidationError, Violation};
use crate::params::{ParamDef, ParamLocation};
use crate::request::{RawRequest, ValidatedRequest};
use crate::schema::FieldSchema;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One documented response of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub description: String,
    pub schema: Option<FieldSchema>,
}

impl ResponseSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema: None,
        }
    }

    pub fn json(description: impl Into<String>, schema: FieldSchema) -> Self {
        Self {
            description: description.into(),
            schema: Some(schema),
        }
    }

    /// Response described by the shared error envelope.
    pub fn error(description: impl Into<String>) -> Self {
        Self::new(description)
    }
}

/// The validated input/output description of one route.
///
/// Built once at registration and shared by every request to the route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteContract {
    params: Vec<ParamDef>,
    body: Option<FieldSchema>,
    responses: BTreeMap<u16, ResponseSpec>,
    strict_query: bool,
}

impl RouteContract {
    /// Build a contract, collapsing identical duplicate parameters.
    ///
    /// Two parameters with the same name and location but different types
    /// are a [`SchemaMismatchError::ConflictingParameter`].
    pub fn build(
        params: Vec<ParamDef>,
        body: Option<FieldSchema>,
        responses: impl IntoIterator<Item = (u16, ResponseSpec)>,
    ) -> Result<Self, SchemaMismatchError> {
        let mut merged: Vec<ParamDef> = Vec::with_capacity(params.len());
        for param in params {
            match merged
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) if existing.schema.ty == param.schema.ty => *existing = param,
                Some(_) => {
                    return Err(SchemaMismatchError::ConflictingParameter {
                        name: param.name,
                        location: param.location,
                    })
                }
                None => merged.push(param),
            }
        }

        let mut responses: BTreeMap<u16, ResponseSpec> = responses.into_iter().collect();
        if responses.is_empty() {
            responses.insert(200, ResponseSpec::new("Successful response"));
        }

        Ok(Self {
            params: merged,
            body,
            responses,
            strict_query: false,
        })
    }

    pub fn builder() -> ContractBuilder {
        ContractBuilder::default()
    }

    /// Reject query keys that no parameter declares.
    pub fn with_strict_query(mut self, strict: bool) -> Self {
        self.strict_query = strict;
        self
    }

    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    pub fn path_params(&self) -> impl Iterator<Item = &ParamDef> {
        self.params.iter().filter(|p| p.is_path())
    }

    pub fn body(&self) -> Option<&FieldSchema> {
        self.body.as_ref()
    }

    pub fn responses(&self) -> &BTreeMap<u16, ResponseSpec> {
        &self.responses
    }

    pub fn is_strict_query(&self) -> bool {
        self.strict_query
    }

    /// Validate and decode a request.
    ///
    /// Every parameter and the body are checked independently; the error
    /// lists all failing fields.
    pub fn validate(&self, req: &RawRequest) -> Result<ValidatedRequest, ValidationError> {
        let mut errors: Vec<FieldError> = Vec::new();
        let mut params = Map::new();
        let mut query = Map::new();
        let mut headers = Map::new();
        let mut cookies = Map::new();

        for def in &self.params {
            let raw = match def.location {
                ParamLocation::Path => req
                    .path_params()
                    .get(&def.name)
                    .map(|v| vec![v.clone()])
                    .unwrap_or_default(),
                ParamLocation::Query => req.query_values(&def.name),
                ParamLocation::Header => req.header_values(&def.name),
                ParamLocation::Cookie => req.cookie_values(&def.name),
            };
            let path = vec![def.location.error_prefix().to_string(), def.name.clone()];
            let target = match def.location {
                ParamLocation::Path => &mut params,
                ParamLocation::Query => &mut query,
                ParamLocation::Header => &mut headers,
                ParamLocation::Cookie => &mut cookies,
            };

            if raw.is_empty() {
                if let Some(ref default) = def.schema.default {
                    target.insert(def.name.clone(), default.clone());
                } else if def.schema.required || def.is_path() {
                    errors.push(FieldError::new(path, Violation::Required));
                }
                continue;
            }
            if let Some(value) = def.schema.decode_text(&raw, &path, &mut errors) {
                target.insert(def.name.clone(), value);
            }
        }

        if self.strict_query {
            let mut seen: Vec<&str> = Vec::new();
            for (key, _) in req.query_pairs() {
                let declared = self
                    .params
                    .iter()
                    .any(|p| p.location == ParamLocation::Query && p.name == *key);
                if !declared && !seen.contains(&key.as_str()) {
                    seen.push(key);
                    errors.push(FieldError::new(
                        vec!["query".into(), key.clone()],
                        Violation::UnknownField,
                    ));
                }
            }
        }

        let body = match self.body {
            Some(ref schema) => decode_body(schema, req, &mut errors),
            None => None,
        };

        if errors.is_empty() {
            Ok(ValidatedRequest::new(params, query, headers, cookies, body))
        } else {
            Err(ValidationError::new(errors))
        }
    }

    /// OpenAPI operation fragment: `parameters`, `requestBody`, `responses`.
    pub fn describe(&self) -> Value {
        let mut op = Map::new();

        let parameters: Vec<Value> = self.params.iter().map(ParamDef::describe).collect();
        if !parameters.is_empty() {
            op.insert("parameters".into(), Value::Array(parameters));
        }

        if let Some(ref body) = self.body {
            op.insert(
                "requestBody".into(),
                json!({
                    "required": body.required,
                    "content": {
                        "application/json": { "schema": body.to_json_schema() }
                    }
                }),
            );
        }

        let mut responses = Map::new();
        for (status, spec) in &self.responses {
            let mut entry = Map::new();
            entry.insert("description".into(), json!(spec.description));
            if let Some(ref schema) = spec.schema {
                entry.insert(
                    "content".into(),
                    json!({ "application/json": { "schema": schema.to_json_schema() } }),
                );
            }
            responses.insert(status.to_string(), Value::Object(entry));
        }
        op.insert("responses".into(), Value::Object(responses));

        Value::Object(op)
    }
}

fn decode_body(schema: &FieldSchema, req: &RawRequest, errors: &mut Vec<FieldError>) -> Option<Value> {
    let path = vec!["body".to_string()];
    let bytes = req.raw_body().filter(|b| !b.iter().all(u8::is_ascii_whitespace));
    let Some(bytes) = bytes else {
        if schema.required {
            errors.push(FieldError::new(path, Violation::Required));
        }
        return None;
    };
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => schema.decode_json(&value, &path, errors),
        Err(_) => {
            errors.push(FieldError::new(path, Violation::InvalidJson));
            None
        }
    }
}

/// Incremental construction of a [`RouteContract`].
#[derive(Debug, Default)]
pub struct ContractBuilder {
    params: Vec<ParamDef>,
    body: Option<FieldSchema>,
    responses: Vec<(u16, ResponseSpec)>,
    strict_query: bool,
}

impl ContractBuilder {
    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParamDef>) -> Self {
        self.params.extend(params);
        self
    }

    pub(crate) fn prepend_params(mut self, params: Vec<ParamDef>) -> Self {
        self.params.splice(0..0, params);
        self
    }

    pub fn body(mut self, schema: FieldSchema) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn response(mut self, status: u16, spec: ResponseSpec) -> Self {
        self.responses.push((status, spec));
        self
    }

    pub fn strict_query(mut self) -> Self {
        self.strict_query = true;
        self
    }

    pub fn build(self) -> Result<RouteContract, SchemaMismatchError> {
        Ok(RouteContract::build(self.params, self.body, self.responses)?
            .with_strict_query(self.strict_query))
    }
}

use crate::schema::FieldSchema;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Where a parameter is located in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    /// The OpenAPI `in` value.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }

    /// First segment of a validation error path for this location.
    pub fn error_prefix(self) -> &'static str {
        match self {
            ParamLocation::Path => "params",
            ParamLocation::Query => "query",
            ParamLocation::Header => "headers",
            ParamLocation::Cookie => "cookies",
        }
    }
}

/// One declared request parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub location: ParamLocation,
    pub schema: FieldSchema,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, location: ParamLocation, schema: FieldSchema) -> Self {
        Self {
            name: name.into(),
            location,
            schema,
        }
    }

    /// Path parameters are always required.
    pub fn path(name: impl Into<String>, mut schema: FieldSchema) -> Self {
        schema.required = true;
        schema.default = None;
        Self::new(name, ParamLocation::Path, schema)
    }

    pub fn query(name: impl Into<String>, schema: FieldSchema) -> Self {
        Self::new(name, ParamLocation::Query, schema)
    }

    pub fn header(name: impl Into<String>, schema: FieldSchema) -> Self {
        Self::new(name, ParamLocation::Header, schema)
    }

    pub fn cookie(name: impl Into<String>, schema: FieldSchema) -> Self {
        Self::new(name, ParamLocation::Cookie, schema)
    }

    pub fn is_path(&self) -> bool {
        self.location == ParamLocation::Path
    }

    /// The OpenAPI parameter object.
    pub fn describe(&self) -> Value {
        let mut schema = self.schema.to_json_schema();
        let description = schema
            .as_object_mut()
            .and_then(|obj| obj.remove("description"));

        let mut param = Map::new();
        param.insert("name".into(), json!(self.name));
        param.insert("in".into(), json!(self.location.as_str()));
        param.insert("required".into(), json!(self.schema.is_mandatory() || self.is_path()));
        if let Some(description) = description {
            param.insert("description".into(), description);
        }
        param.insert("schema".into(), schema);
        Value::Object(param)
    }
}

//! Field schemas shared by parameters, request bodies, responses and data
//! models, with the decoding rules applied during validation.
//!
//! Two decoding paths exist:
//!
//! - [`FieldSchema::decode_text`] for path, query, header and cookie values,
//!   which arrive as strings and are coerced to the declared type;
//! - [`FieldSchema::decode_json`] for JSON bodies, which are type-checked
//!   without string coercion.
//!
//! Both report every failure into the caller's error list instead of
//! stopping at the first one.

use crate::error::{FieldError, Violation};
use regex::Regex;
use serde_json::{json, Map, Number, Value};

/// The type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Email,
    Uuid,
    DateTime,
    Enum(Vec<String>),
    Array(Box<FieldType>),
    Object(ObjectSchema),
    Any,
}

impl FieldType {
    fn expected(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Email | FieldType::Uuid | FieldType::DateTime => {
                "string"
            }
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Enum(_) => "string",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
            FieldType::Any => "any",
        }
    }

    /// JSON Schema for the bare type, without field-level constraints.
    pub fn to_json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Email => json!({ "type": "string", "format": "email" }),
            FieldType::Uuid => json!({ "type": "string", "format": "uuid" }),
            FieldType::DateTime => json!({ "type": "string", "format": "date-time" }),
            FieldType::Enum(values) => json!({ "type": "string", "enum": values }),
            FieldType::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            FieldType::Object(obj) => obj.to_json_schema(),
            FieldType::Any => json!({}),
        }
    }
}

/// A compiled regex compared by its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(regex: Regex) -> Self {
        Self(regex)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<Pattern>,
}

/// A typed field with its presence rules and constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub ty: FieldType,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub constraints: Constraints,
}

impl FieldSchema {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            required: true,
            nullable: false,
            default: None,
            description: None,
            constraints: Constraints::default(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn email() -> Self {
        Self::new(FieldType::Email)
    }

    pub fn uuid() -> Self {
        Self::new(FieldType::Uuid)
    }

    pub fn date_time() -> Self {
        Self::new(FieldType::DateTime)
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(FieldType::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn array(item: FieldType) -> Self {
        Self::new(FieldType::Array(Box::new(item)))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::new(FieldType::Object(schema))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Default used when the field is absent. Makes the field optional.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.constraints.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.constraints.max_length = Some(max);
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.constraints.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        self.constraints.maximum = Some(max);
        self
    }

    pub fn pattern(mut self, regex: Regex) -> Self {
        self.constraints.pattern = Some(Pattern::new(regex));
        self
    }

    /// Whether an absent value is an error.
    pub fn is_mandatory(&self) -> bool {
        self.required && self.default.is_none()
    }

    /// JSON Schema for this field, including constraints and nullability.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = self.ty.to_json_schema();
        if let Some(obj) = schema.as_object_mut() {
            let c = &self.constraints;
            if let Some(v) = c.min_length {
                obj.insert("minLength".into(), json!(v));
            }
            if let Some(v) = c.max_length {
                obj.insert("maxLength".into(), json!(v));
            }
            if let Some(v) = c.minimum {
                obj.insert("minimum".into(), number_value(v));
            }
            if let Some(v) = c.maximum {
                obj.insert("maximum".into(), number_value(v));
            }
            if let Some(ref p) = c.pattern {
                obj.insert("pattern".into(), json!(p.as_str()));
            }
            if let Some(ref d) = self.default {
                obj.insert("default".into(), d.clone());
            }
            if let Some(ref d) = self.description {
                obj.insert("description".into(), json!(d));
            }
            if self.nullable {
                if let Some(Value::String(t)) = obj.get("type").cloned() {
                    obj.insert("type".into(), json!([t, "null"]));
                }
            }
        }
        schema
    }

    /// Decode string values from the path, query string, headers or cookies.
    ///
    /// `raw` holds every value sent under the key; scalars use the first one.
    pub fn decode_text(
        &self,
        raw: &[String],
        path: &[String],
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let decoded = match &self.ty {
            FieldType::Array(item) => {
                let mut out = Vec::with_capacity(raw.len());
                let before = errors.len();
                for (i, s) in raw.iter().enumerate() {
                    match coerce_text(item, s) {
                        Ok(v) => out.push(v),
                        Err(violation) => {
                            let mut item_path = path.to_vec();
                            item_path.push(i.to_string());
                            errors.push(FieldError::new(item_path, violation));
                        }
                    }
                }
                if errors.len() > before {
                    return None;
                }
                Value::Array(out)
            }
            ty => {
                let first = raw.first()?;
                match coerce_text(ty, first) {
                    Ok(v) => v,
                    Err(violation) => {
                        errors.push(FieldError::new(path.to_vec(), violation));
                        return None;
                    }
                }
            }
        };
        let before = errors.len();
        check_constraints(&self.constraints, &self.ty, &decoded, path, errors);
        (errors.len() == before).then_some(decoded)
    }

    /// Decode a JSON value (request bodies and nested objects).
    pub fn decode_json(
        &self,
        value: &Value,
        path: &[String],
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        if value.is_null() {
            if self.nullable {
                return Some(Value::Null);
            }
            errors.push(FieldError::new(
                path.to_vec(),
                Violation::InvalidType {
                    expected: self.ty.expected(),
                },
            ));
            return None;
        }

        let before = errors.len();
        let decoded = match &self.ty {
            FieldType::Object(obj) => return obj.decode(value, path, errors),
            FieldType::Array(item) => {
                let Some(items) = value.as_array() else {
                    errors.push(FieldError::new(
                        path.to_vec(),
                        Violation::InvalidType { expected: "array" },
                    ));
                    return None;
                };
                let item_schema = FieldSchema::new((**item).clone());
                let mut out = Vec::with_capacity(items.len());
                for (i, v) in items.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(i.to_string());
                    if let Some(v) = item_schema.decode_json(v, &item_path, errors) {
                        out.push(v);
                    }
                }
                Value::Array(out)
            }
            ty => match check_json_type(ty, value) {
                Ok(v) => v,
                Err(violation) => {
                    errors.push(FieldError::new(path.to_vec(), violation));
                    return None;
                }
            },
        };
        check_constraints(&self.constraints, &self.ty, &decoded, path, errors);
        (errors.len() == before).then_some(decoded)
    }
}

/// An ordered set of named fields. A titled object is published as a
/// shared component in the OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    title: Option<String>,
    fields: Vec<(String, FieldSchema)>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            fields: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a field. Re-adding a name replaces it in place.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.insert(name.into(), schema);
        self
    }

    pub fn insert(&mut self, name: String, schema: FieldSchema) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = schema,
            None => self.fields.push((name, schema)),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, schema) in &self.fields {
            properties.insert(name.clone(), schema.to_json_schema());
            if schema.is_mandatory() {
                required.push(json!(name));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        if let Some(ref title) = self.title {
            schema.insert("title".into(), json!(title));
        }
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// Decode an object, keeping only declared fields.
    pub fn decode(
        &self,
        value: &Value,
        path: &[String],
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let Some(input) = value.as_object() else {
            errors.push(FieldError::new(
                path.to_vec(),
                Violation::InvalidType { expected: "object" },
            ));
            return None;
        };

        let before = errors.len();
        let mut out = Map::new();
        for (name, schema) in &self.fields {
            let mut field_path = path.to_vec();
            field_path.push(name.clone());
            match input.get(name) {
                Some(v) => {
                    if let Some(decoded) = schema.decode_json(v, &field_path, errors) {
                        out.insert(name.clone(), decoded);
                    }
                }
                None => {
                    if let Some(ref d) = schema.default {
                        out.insert(name.clone(), d.clone());
                    } else if schema.required {
                        errors.push(FieldError::new(field_path, Violation::Required));
                    }
                }
            }
        }
        (errors.len() == before).then_some(Value::Object(out))
    }
}

fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        json!(v as i64)
    } else {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn coerce_text(ty: &FieldType, raw: &str) -> Result<Value, Violation> {
    match ty {
        FieldType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(|i| json!(i))
            .map_err(|_| Violation::InvalidType { expected: "integer" }),
        FieldType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or(Violation::InvalidType { expected: "number" }),
        FieldType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(json!(true)),
            "false" | "0" => Ok(json!(false)),
            _ => Err(Violation::InvalidType { expected: "boolean" }),
        },
        FieldType::Object(_) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object)
            .ok_or(Violation::InvalidType { expected: "object" }),
        FieldType::Any => Ok(json!(raw)),
        other => check_json_type(other, &json!(raw)),
    }
}

fn check_json_type(ty: &FieldType, value: &Value) -> Result<Value, Violation> {
    let invalid = || Violation::InvalidType {
        expected: ty.expected(),
    };
    match ty {
        FieldType::String => value.as_str().map(|_| value.clone()).ok_or_else(invalid),
        FieldType::Integer => match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                // `i64::MAX as f64` rounds up to 2^63.
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(json!(f as i64))
                }
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
        FieldType::Number => value
            .is_number()
            .then(|| value.clone())
            .ok_or_else(invalid),
        FieldType::Boolean => value
            .is_boolean()
            .then(|| value.clone())
            .ok_or_else(invalid),
        FieldType::Email => {
            let s = value.as_str().ok_or_else(invalid)?;
            is_email(s)
                .then(|| value.clone())
                .ok_or(Violation::InvalidFormat { format: "email" })
        }
        FieldType::Uuid => {
            let s = value.as_str().ok_or_else(invalid)?;
            parse_uuid(s)
                .map(Value::String)
                .ok_or(Violation::InvalidFormat { format: "uuid" })
        }
        FieldType::DateTime => {
            let s = value.as_str().ok_or_else(invalid)?;
            is_date_time(s)
                .then(|| value.clone())
                .ok_or(Violation::InvalidFormat { format: "date-time" })
        }
        FieldType::Enum(allowed) => {
            let s = value.as_str().ok_or_else(invalid)?;
            if allowed.iter().any(|a| a == s) {
                Ok(value.clone())
            } else {
                Err(Violation::InvalidEnum {
                    allowed: allowed.clone(),
                })
            }
        }
        FieldType::Array(_) | FieldType::Object(_) => Err(invalid()),
        FieldType::Any => Ok(value.clone()),
    }
}

fn check_constraints(
    c: &Constraints,
    ty: &FieldType,
    value: &Value,
    path: &[String],
    errors: &mut Vec<FieldError>,
) {
    if let Some(s) = value.as_str() {
        let len = s.chars().count();
        if let Some(min) = c.min_length {
            if len < min {
                errors.push(FieldError::new(path.to_vec(), Violation::TooShort { min }));
            }
        }
        if let Some(max) = c.max_length {
            if len > max {
                errors.push(FieldError::new(path.to_vec(), Violation::TooLong { max }));
            }
        }
        if let Some(ref p) = c.pattern {
            if !p.is_match(s) {
                errors.push(FieldError::new(
                    path.to_vec(),
                    Violation::Pattern {
                        pattern: p.as_str().to_string(),
                    },
                ));
            }
        }
    }
    if matches!(ty, FieldType::Integer | FieldType::Number) {
        if let Some(n) = value.as_f64() {
            if let Some(min) = c.minimum {
                if n < min {
                    errors.push(FieldError::new(path.to_vec(), Violation::TooSmall { min }));
                }
            }
            if let Some(max) = c.maximum {
                if n > max {
                    errors.push(FieldError::new(path.to_vec(), Violation::TooLarge { max }));
                }
            }
        }
    }
    if let (FieldType::Array(_), Some(items)) = (ty, value.as_array()) {
        if let Some(min) = c.min_length {
            if items.len() < min {
                errors.push(FieldError::new(path.to_vec(), Violation::TooShort { min }));
            }
        }
        if let Some(max) = c.max_length {
            if items.len() > max {
                errors.push(FieldError::new(path.to_vec(), Violation::TooLong { max }));
            }
        }
    }
}

fn is_email(s: &str) -> bool {
    garde::rules::email::parse_email(s).is_ok()
}

/// Canonical hyphenated lowercase form of any accepted UUID spelling.
fn parse_uuid(s: &str) -> Option<String> {
    uuid::Uuid::parse_str(s)
        .ok()
        .map(|u| u.hyphenated().to_string())
}

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(String::from).collect()
    }

    #[test]
    fn text_coercion() {
        let mut errors = Vec::new();
        let v = FieldSchema::integer().decode_text(&["42".into()], &path("query.id"), &mut errors);
        assert_eq!(v, Some(json!(42)));
        let v = FieldSchema::boolean().decode_text(&["1".into()], &path("query.on"), &mut errors);
        assert_eq!(v, Some(json!(true)));
        assert!(errors.is_empty());

        let v = FieldSchema::integer().decode_text(&["4x".into()], &path("query.id"), &mut errors);
        assert!(v.is_none());
        assert_eq!(errors[0].violation, Violation::InvalidType { expected: "integer" });
    }

    #[test]
    fn text_array_decodes_every_value() {
        let mut errors = Vec::new();
        let schema = FieldSchema::array(FieldType::Integer);
        let v = schema.decode_text(&["1".into(), "2".into()], &path("query.ids"), &mut errors);
        assert_eq!(v, Some(json!([1, 2])));
    }

    #[test]
    fn json_object_collects_all_errors() {
        let schema = ObjectSchema::new()
            .field("email", FieldSchema::email())
            .field("name", FieldSchema::string().min_length(3))
            .field("age", FieldSchema::integer().optional());
        let mut errors = Vec::new();
        let out = schema.decode(
            &json!({ "email": "nope", "name": "ab", "extra": 1 }),
            &path("body"),
            &mut errors,
        );
        assert!(out.is_none());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].dotted_path(), "body.email");
        assert_eq!(errors[1].violation, Violation::TooShort { min: 3 });
    }

    #[test]
    fn json_object_drops_unknown_and_fills_defaults() {
        let schema = ObjectSchema::new()
            .field("name", FieldSchema::string())
            .field("role", FieldSchema::string().default_value(json!("member")));
        let mut errors = Vec::new();
        let out = schema.decode(&json!({ "name": "ann", "extra": true }), &path("body"), &mut errors);
        assert_eq!(out, Some(json!({ "name": "ann", "role": "member" })));
    }

    #[test]
    fn nullable_accepts_null_only_when_declared() {
        let mut errors = Vec::new();
        let v = FieldSchema::string().nullable().decode_json(&Value::Null, &path("body.x"), &mut errors);
        assert_eq!(v, Some(Value::Null));
        let v = FieldSchema::string().decode_json(&Value::Null, &path("body.x"), &mut errors);
        assert!(v.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn formats() {
        assert!(is_email("a@b.com"));
        assert!(!is_email("a@"));
        assert!(!is_email("not an email"));
        assert_eq!(
            parse_uuid("123E4567-E89B-12D3-A456-426614174000").as_deref(),
            Some("123e4567-e89b-12d3-a456-426614174000")
        );
        assert!(parse_uuid("123e4567-e89b-12d3-a456").is_none());
        assert!(is_date_time("2024-01-02T03:04:05Z"));
        assert!(is_date_time("2024-01-02T03:04:05.123+02:00"));
        assert!(!is_date_time("2024-01-02"));
        assert!(!is_date_time("2024-13-45T99:99:99Z"));
        assert!(!is_date_time("2023-02-29T00:00:00Z"));
    }

    #[test]
    fn json_schema_output() {
        let schema = FieldSchema::string()
            .min_length(1)
            .max_length(10)
            .nullable()
            .description("display name");
        let js = schema.to_json_schema();
        assert_eq!(js["type"], json!(["string", "null"]));
        assert_eq!(js["minLength"], 1);
        assert_eq!(js["description"], "display name");

        let obj = ObjectSchema::titled("User")
            .field("id", FieldSchema::integer())
            .field("bio", FieldSchema::string().optional());
        let js = obj.to_json_schema();
        assert_eq!(js["title"], "User");
        assert_eq!(js["required"], json!(["id"]));
    }
}

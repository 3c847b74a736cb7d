use crate::query::is_valid_identifier;
use regex::Regex;
use routekit_core::schema::{FieldSchema, FieldType, ObjectSchema};
use routekit_core::SchemaMismatchError;
use schemars::JsonSchema;
use serde_json::{Map, Value};

/// Schema, primary key and table of one stored entity.
///
/// Built once and shared read-only by every endpoint serving the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    table: String,
    schema: ObjectSchema,
    primary_keys: Vec<String>,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            table: None,
            schema: ObjectSchema::new(),
            primary_keys: Vec::new(),
        }
    }

    /// Derive a model from a JSON Schema object (`properties`, `required`,
    /// `$defs` references).
    pub fn from_json_schema(
        name: impl Into<String>,
        schema: &Value,
        primary_keys: &[&str],
    ) -> Result<Self, SchemaMismatchError> {
        let name = name.into();
        let FieldType::Object(object) = parse_object(schema, schema, 0)? else {
            return Err(SchemaMismatchError::Invalid(format!(
                "model '{name}' schema is not an object"
            )));
        };
        let mut builder = Model::builder(name);
        builder.schema = object;
        for key in primary_keys {
            builder = builder.primary_key(*key);
        }
        builder.build()
    }

    /// Derive a model from a type implementing [`JsonSchema`].
    pub fn from_type<T: JsonSchema>(primary_keys: &[&str]) -> Result<Self, SchemaMismatchError> {
        let schema = schemars::schema_for!(T);
        let value =
            serde_json::to_value(&schema).map_err(|e| SchemaMismatchError::Invalid(e.to_string()))?;
        let name = value
            .get("title")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| T::schema_name().to_string());
        Self::from_json_schema(name, &value, primary_keys)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn is_primary_key(&self, field: &str) -> bool {
        self.primary_keys.iter().any(|k| k == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.schema.contains(field)
    }

    pub fn field(&self, field: &str) -> Option<&FieldSchema> {
        self.schema.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.schema.fields()
    }

    /// Row schema, titled with the model name.
    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    /// Body accepted on creation: every field except the primary keys,
    /// unless `include_primary_keys` is set.
    pub fn create_schema(&self, include_primary_keys: bool) -> ObjectSchema {
        let mut out = ObjectSchema::titled(format!("{}Create", self.name));
        for (name, schema) in self.schema.fields() {
            if include_primary_keys || !self.is_primary_key(name) {
                out.insert(name.to_string(), schema.clone());
            }
        }
        out
    }

    /// Body accepted on update: non-key fields, all optional, no defaults.
    pub fn update_schema(&self) -> ObjectSchema {
        let mut out = ObjectSchema::titled(format!("{}Update", self.name));
        for (name, schema) in self.schema.fields() {
            if self.is_primary_key(name) {
                continue;
            }
            let mut schema = schema.clone();
            schema.required = false;
            schema.default = None;
            out.insert(name.to_string(), schema);
        }
        out
    }

    /// Schema of a field used as a path or query parameter: required, not
    /// nullable, no default.
    pub fn param_schema(&self, field: &str) -> Option<FieldSchema> {
        self.schema.get(field).map(|s| {
            let mut s = s.clone();
            s.required = true;
            s.nullable = false;
            s.default = None;
            s
        })
    }
}

pub struct ModelBuilder {
    name: String,
    table: Option<String>,
    schema: ObjectSchema,
    primary_keys: Vec<String>,
}

impl ModelBuilder {
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.schema = self.schema.field(name, schema);
        self
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_keys.push(name.into());
        self
    }

    /// Override the table name (default: the lower-cased model name).
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn build(self) -> Result<Model, SchemaMismatchError> {
        if self.primary_keys.is_empty() {
            return Err(SchemaMismatchError::Invalid(format!(
                "model '{}' declares no primary key",
                self.name
            )));
        }
        if let Some(key) = self.primary_keys.iter().find(|k| !self.schema.contains(k)) {
            return Err(SchemaMismatchError::UnknownField {
                field: key.clone(),
                model: self.name,
            });
        }
        let table = self.table.unwrap_or_else(|| self.name.to_lowercase());
        if !is_valid_identifier(&table, false) {
            return Err(SchemaMismatchError::Invalid(format!(
                "model '{}' has invalid table name '{table}'",
                self.name
            )));
        }
        if let Some((bad, _)) = self.schema.fields().find(|(f, _)| !is_valid_identifier(f, false)) {
            return Err(SchemaMismatchError::Invalid(format!(
                "model '{}' has invalid field name '{bad}'",
                self.name
            )));
        }
        Ok(Model {
            schema: self.schema.with_title(self.name.clone()),
            name: self.name,
            table,
            primary_keys: self.primary_keys,
        })
    }
}

const MAX_REF_DEPTH: usize = 16;

fn invalid(msg: impl Into<String>) -> SchemaMismatchError {
    SchemaMismatchError::Invalid(msg.into())
}

fn resolve_ref<'a>(reference: &str, root: &'a Value) -> Result<&'a Value, SchemaMismatchError> {
    let pointer = reference
        .strip_prefix('#')
        .ok_or_else(|| invalid(format!("unsupported schema reference '{reference}'")))?;
    root.pointer(pointer)
        .ok_or_else(|| invalid(format!("unresolved schema reference '{reference}'")))
}

fn parse_object(value: &Value, root: &Value, depth: usize) -> Result<FieldType, SchemaMismatchError> {
    Ok(parse_field(value, root, depth)?.ty)
}

fn parse_field(value: &Value, root: &Value, depth: usize) -> Result<FieldSchema, SchemaMismatchError> {
    if depth > MAX_REF_DEPTH {
        return Ok(FieldSchema::new(FieldType::Any));
    }
    let Some(obj) = value.as_object() else {
        // `true` accepts anything.
        return Ok(FieldSchema::new(FieldType::Any));
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        let mut field = parse_field(resolve_ref(reference, root)?, root, depth + 1)?;
        apply_annotations(&mut field, obj)?;
        return Ok(field);
    }

    if let Some(Value::Array(all)) = obj.get("allOf") {
        if let [single] = all.as_slice() {
            let mut field = parse_field(single, root, depth + 1)?;
            apply_annotations(&mut field, obj)?;
            return Ok(field);
        }
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(Value::Array(variants)) = obj.get(key) {
            let non_null: Vec<&Value> = variants.iter().filter(|v| !is_null_schema(v)).collect();
            let mut field = match non_null.as_slice() {
                [single] => parse_field(single, root, depth + 1)?,
                _ => FieldSchema::new(FieldType::Any),
            };
            if non_null.len() < variants.len() {
                field.nullable = true;
            }
            apply_annotations(&mut field, obj)?;
            return Ok(field);
        }
    }

    let (ty_name, nullable) = match obj.get("type") {
        Some(Value::String(t)) => (Some(t.as_str()), false),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            (names.into_iter().find(|t| *t != "null"), nullable)
        }
        _ => (None, false),
    };

    let ty = if let Some(Value::Array(values)) = obj.get("enum") {
        FieldType::Enum(
            values
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
        )
    } else {
        match ty_name {
            Some("string") => match obj.get("format").and_then(Value::as_str) {
                Some("email") => FieldType::Email,
                Some("uuid") => FieldType::Uuid,
                Some("date-time") => FieldType::DateTime,
                _ => FieldType::String,
            },
            Some("integer") => FieldType::Integer,
            Some("number") => FieldType::Number,
            Some("boolean") => FieldType::Boolean,
            Some("array") => {
                let items = match obj.get("items") {
                    Some(items) => parse_field(items, root, depth + 1)?.ty,
                    None => FieldType::Any,
                };
                FieldType::Array(Box::new(items))
            }
            Some("object") => FieldType::Object(parse_properties(obj, root, depth)?),
            _ if obj.contains_key("properties") => {
                FieldType::Object(parse_properties(obj, root, depth)?)
            }
            _ => FieldType::Any,
        }
    };

    let mut field = FieldSchema::new(ty);
    field.nullable = nullable;
    apply_annotations(&mut field, obj)?;
    Ok(field)
}

fn parse_properties(
    obj: &Map<String, Value>,
    root: &Value,
    depth: usize,
) -> Result<ObjectSchema, SchemaMismatchError> {
    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let mut out = match obj.get("title").and_then(Value::as_str) {
        Some(title) => ObjectSchema::titled(title),
        None => ObjectSchema::new(),
    };
    if let Some(Value::Object(props)) = obj.get("properties") {
        for (name, prop) in props {
            let mut field = parse_field(prop, root, depth + 1)?;
            if !required.contains(&name.as_str()) {
                field.required = false;
            }
            out.insert(name.clone(), field);
        }
    }
    Ok(out)
}

fn apply_annotations(field: &mut FieldSchema, obj: &Map<String, Value>) -> Result<(), SchemaMismatchError> {
    let as_usize = |k: &str| obj.get(k).and_then(Value::as_u64).map(|v| v as usize);
    if let Some(v) = as_usize("minLength").or_else(|| as_usize("minItems")) {
        field.constraints.min_length = Some(v);
    }
    if let Some(v) = as_usize("maxLength").or_else(|| as_usize("maxItems")) {
        field.constraints.max_length = Some(v);
    }
    if let Some(v) = obj.get("minimum").and_then(Value::as_f64) {
        field.constraints.minimum = Some(v);
    }
    if let Some(v) = obj.get("maximum").and_then(Value::as_f64) {
        field.constraints.maximum = Some(v);
    }
    if let Some(p) = obj.get("pattern").and_then(Value::as_str) {
        let regex = Regex::new(p).map_err(|e| invalid(format!("invalid pattern '{p}': {e}")))?;
        *field = field.clone().pattern(regex);
    }
    if let Some(d) = obj.get("description").and_then(Value::as_str) {
        field.description = Some(d.to_string());
    }
    if let Some(d) = obj.get("default") {
        field.default = Some(d.clone());
        field.required = false;
    }
    Ok(())
}

fn is_null_schema(v: &Value) -> bool {
    v.get("type").and_then(Value::as_str) == Some("null")
}

//! Shared component schemas.
//!
//! Titled object schemas found in operation fragments are moved into
//! `components.schemas` and replaced by a `$ref`. A title maps to one
//! schema; a different schema reusing a title is stored under the next free
//! numbered name (`User2`, `User3`, ...).

use serde_json::{json, Map, Value};

/// Keys that belong to the hoisted component. Everything else on the node
/// (`description`, `default`) is field-level and stays next to the `$ref`.
const COMPONENT_KEYS: &[&str] = &["type", "title", "properties", "required"];

pub const ERROR_SCHEMA: &str = "Error";

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    schemas: Map<String, Value>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `schema` under `title`, or under a suffixed name if `title` is
    /// already taken by a different schema. Returns the name used.
    pub fn register(&mut self, title: &str, schema: Value) -> String {
        let mut n = 1usize;
        loop {
            let name = if n == 1 {
                title.to_string()
            } else {
                format!("{title}{n}")
            };
            match self.schemas.get(&name) {
                Some(existing) if *existing == schema => return name,
                Some(_) => n += 1,
                None => {
                    if n > 1 {
                        tracing::debug!(title, name = %name, "Component title reused by a different schema");
                    }
                    self.schemas.insert(name.clone(), schema);
                    return name;
                }
            }
        }
    }

    /// Rewrite `value` in place, hoisting every titled object schema.
    ///
    /// Children are hoisted before their parent so a parent component holds
    /// references, not copies.
    pub fn hoist(&mut self, value: &mut Value) {
        match value {
            Value::Object(obj) => {
                for (_, child) in obj.iter_mut() {
                    self.hoist(child);
                }
                if let Some(replacement) = self.hoist_node(obj) {
                    *value = replacement;
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.hoist(item);
                }
            }
            _ => {}
        }
    }

    fn hoist_node(&mut self, obj: &mut Map<String, Value>) -> Option<Value> {
        let title = obj.get("title")?.as_str()?.to_string();
        let nullable = match obj.get("type")? {
            Value::String(t) if t == "object" => false,
            Value::Array(types) if types.contains(&json!("object")) && types.contains(&json!("null")) => true,
            _ => return None,
        };
        if !matches!(obj.get("properties"), Some(Value::Object(_))) {
            return None;
        }

        let mut component = Map::new();
        let mut siblings = Map::new();
        for (key, v) in std::mem::take(obj) {
            if COMPONENT_KEYS.contains(&key.as_str()) {
                component.insert(key, v);
            } else {
                siblings.insert(key, v);
            }
        }
        component.insert("type".into(), json!("object"));

        let name = self.register(&title, Value::Object(component));
        let reference = json!({ "$ref": format!("#/components/schemas/{name}") });
        if nullable {
            siblings.insert("anyOf".into(), json!([reference, { "type": "null" }]));
        } else if let Value::Object(r) = reference {
            siblings.extend(r);
        }
        Some(Value::Object(siblings))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.schemas
    }
}

/// The fixed error body `{ success: false, errors: [{ code, message, path? }] }`.
pub fn error_schema() -> Value {
    json!({
        "type": "object",
        "title": ERROR_SCHEMA,
        "properties": {
            "success": { "type": "boolean" },
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "code": { "type": "integer" },
                        "message": { "type": "string" },
                        "path": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["code", "message"]
                }
            }
        },
        "required": ["success", "errors"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(extra: &str) -> Value {
        json!({
            "type": "object",
            "title": "User",
            "properties": { "id": { "type": "integer" }, extra: { "type": "string" } },
            "required": ["id"]
        })
    }

    #[test]
    fn identical_schemas_share_one_entry() {
        let mut registry = ComponentRegistry::new();
        let mut a = json!({ "schema": user("email") });
        let mut b = json!({ "items": [user("email")] });
        registry.hoist(&mut a);
        registry.hoist(&mut b);
        assert_eq!(registry.len(), 1);
        assert_eq!(a["schema"]["$ref"], "#/components/schemas/User");
        assert_eq!(b["items"][0]["$ref"], "#/components/schemas/User");
        assert!(registry.get("User").unwrap().get("title").is_some());
    }

    #[test]
    fn conflicting_title_gets_a_suffix() {
        let mut registry = ComponentRegistry::new();
        let mut a = user("email");
        let mut b = user("nickname");
        let mut c = user("nickname");
        registry.hoist(&mut a);
        registry.hoist(&mut b);
        registry.hoist(&mut c);
        assert_eq!(a["$ref"], "#/components/schemas/User");
        assert_eq!(b["$ref"], "#/components/schemas/User2");
        assert_eq!(c["$ref"], "#/components/schemas/User2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn nested_objects_are_hoisted_first() {
        let mut registry = ComponentRegistry::new();
        let mut envelope = json!({
            "type": "object",
            "properties": {
                "success": { "type": "boolean" },
                "result": user("email")
            }
        });
        registry.hoist(&mut envelope);
        assert_eq!(envelope["properties"]["result"]["$ref"], "#/components/schemas/User");
        // untitled envelope stays inline
        assert_eq!(envelope["type"], "object");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn field_level_keys_stay_beside_the_reference() {
        let mut registry = ComponentRegistry::new();
        let mut node = user("email");
        node["description"] = json!("Owner");
        node["type"] = json!(["object", "null"]);
        registry.hoist(&mut node);
        assert_eq!(node["description"], "Owner");
        assert_eq!(node["anyOf"][0]["$ref"], "#/components/schemas/User");
        assert_eq!(node["anyOf"][1]["type"], "null");
        assert_eq!(registry.get("User").unwrap()["type"], "object");
        assert!(registry.get("User").unwrap().get("description").is_none());
    }
}

//! Declarative tool argument schemas
//!
//! An [`ArgumentSchema`] is built once by a tool and used twice: to check the
//! `arguments` of a `tools/call` request and to render the `inputSchema`
//! advertised by `tools/list`.
//!
//! ```
//! use mcp_tool_server::mcp::schema::{ArgumentSchema, Field, FieldType};
//!
//! let schema = ArgumentSchema::new()
//!     .field(Field::required("name", FieldType::String).filled().description("Who to greet"))
//!     .field(Field::optional("excited", FieldType::Boolean));
//!
//! assert!(schema.validate(&serde_json::json!({"name": "World"})).is_ok());
//! assert!(schema.validate(&serde_json::json!({"name": ""})).is_err());
//! ```

use serde_json::{json, Map, Value};

use crate::error::ValidationError;

/// Type of a single argument field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldType>),
    Object(ArgumentSchema),
}

impl FieldType {
    /// Array whose items all have type `item`
    pub fn array(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    /// Nested object described by `schema`
    pub fn object(schema: ArgumentSchema) -> Self {
        FieldType::Object(schema)
    }

    /// JSON Schema type name
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        }
    }

    fn expected(&self) -> String {
        match self {
            FieldType::Integer | FieldType::Array(_) | FieldType::Object(_) => {
                format!("must be an {}", self.type_name())
            }
            _ => format!("must be a {}", self.type_name()),
        }
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        let matches = match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array(item) => match value.as_array() {
                Some(items) => {
                    for (index, element) in items.iter().enumerate() {
                        item.check(element, &format!("{}[{}]", path, index))?;
                    }
                    true
                }
                None => false,
            },
            FieldType::Object(schema) => match value.as_object() {
                Some(object) => {
                    schema.validate_object(object, path)?;
                    true
                }
                None => false,
            },
        };

        if matches {
            Ok(())
        } else {
            Err(ValidationError::new(path, self.expected()))
        }
    }

    fn render(&self) -> Value {
        match self {
            FieldType::Array(item) => json!({"type": "array", "items": item.render()}),
            FieldType::Object(schema) => schema.render_object(false),
            other => json!({"type": other.type_name()}),
        }
    }
}

/// A single keyed argument
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub required: bool,
    pub filled: bool,
    pub field_type: FieldType,
    pub description: Option<String>,
}

impl Field {
    /// Field that must be present
    pub fn required(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            required: true,
            filled: false,
            field_type,
            description: None,
        }
    }

    /// Field that may be absent or null
    pub fn optional(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(key, field_type)
        }
    }

    /// Reject empty strings, arrays and objects
    pub fn filled(mut self) -> Self {
        self.filled = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        if self.filled && is_blank(value) {
            return Err(ValidationError::new(path, "must be filled"));
        }
        self.field_type.check(value, path)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Ordered set of argument fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    fields: Vec<Field>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any earlier field with the same key
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.key == field.key) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Check `input` against the schema without transforming it
    pub fn validate(&self, input: &Value) -> Result<(), ValidationError> {
        let object = input
            .as_object()
            .ok_or_else(|| ValidationError::new("arguments", "must be an object"))?;
        self.validate_arguments(object)
    }

    /// Check an already-unwrapped argument object
    pub fn validate_arguments(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        self.validate_object(arguments, "")
    }

    fn validate_object(
        &self,
        object: &Map<String, Value>,
        prefix: &str,
    ) -> Result<(), ValidationError> {
        for field in &self.fields {
            let path = if prefix.is_empty() {
                field.key.clone()
            } else {
                format!("{}.{}", prefix, field.key)
            };

            match object.get(&field.key) {
                None if field.required => return Err(ValidationError::new(path, "is missing")),
                None => {}
                Some(Value::Null) if !field.required => {}
                Some(value) => field.check(value, &path)?,
            }
        }
        Ok(())
    }

    /// Render as the `inputSchema` of a `tools/list` entry.
    ///
    /// Only top-level fields carry their description; nested object fields
    /// render `type`, `properties` and `required` alone.
    pub fn to_wire_schema(&self) -> Value {
        self.render_object(true)
    }

    fn render_object(&self, top_level: bool) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut rendered = field.field_type.render();
            if top_level {
                if let (Some(description), Some(obj)) =
                    (&field.description, rendered.as_object_mut())
                {
                    obj.insert("description".to_string(), Value::String(description.clone()));
                }
            }
            properties.insert(field.key.clone(), rendered);
        }

        let required: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| Value::String(f.key.clone()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if top_level || !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

/// `inputSchema` for a tool that declares no argument schema
pub fn empty_wire_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

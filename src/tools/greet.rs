//! `greet` tool

use serde_json::{Map, Value};

use crate::mcp::schema::{ArgumentSchema, Field, FieldType};
use crate::mcp::tools::{Tool, ToolAnnotations, ToolOutput};

/// Says hello
pub struct Greet;

impl Tool for Greet {
    fn name(&self) -> &str {
        "greet"
    }

    fn description(&self) -> &str {
        "Greets a person by name"
    }

    fn argument_schema(&self) -> Option<ArgumentSchema> {
        Some(
            ArgumentSchema::new()
                .field(
                    Field::required("name", FieldType::String)
                        .filled()
                        .description("Name of the person to greet"),
                )
                .field(
                    Field::optional("excited", FieldType::Boolean)
                        .description("Shout the greeting"),
                ),
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(
            ToolAnnotations::new()
                .title("Greeter")
                .read_only_hint(true)
                .open_world_hint(false),
        )
    }

    fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let name = args.get("name").and_then(Value::as_str).unwrap_or_default();
        let excited = args.get("excited").and_then(Value::as_bool).unwrap_or(false);

        let greeting = format!("Hello, {}!", name);
        Ok(if excited {
            greeting.to_uppercase().into()
        } else {
            greeting.into()
        })
    }
}

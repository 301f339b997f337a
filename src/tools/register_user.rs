//! `register_user` tool
//!
//! Takes a nested `user` object and hands back the stored record as
//! structured output, with the assigned id repeated in `_meta`.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::bail;
use serde_json::{json, Map, Value};

use crate::mcp::metadata::Metadata;
use crate::mcp::schema::{ArgumentSchema, Field, FieldType};
use crate::mcp::tools::{Tool, ToolAnnotations, ToolOutput};

/// In-memory user registration
pub struct RegisterUser {
    next_id: AtomicU64,
}

impl RegisterUser {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for RegisterUser {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for RegisterUser {
    fn name(&self) -> &str {
        "register_user"
    }

    fn description(&self) -> &str {
        "Registers a user and returns the stored record"
    }

    fn argument_schema(&self) -> Option<ArgumentSchema> {
        let user = ArgumentSchema::new()
            .field(
                Field::required("name", FieldType::String)
                    .filled()
                    .description("Display name"),
            )
            .field(
                Field::required("email", FieldType::String)
                    .filled()
                    .description("Contact address"),
            );

        Some(
            ArgumentSchema::new()
                .field(
                    Field::required("user", FieldType::object(user))
                        .description("User to register"),
                )
                .field(
                    Field::optional("tags", FieldType::array(FieldType::String))
                        .description("Free-form labels"),
                ),
        )
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::new().title("Register user").idempotent_hint(false))
    }

    fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let user = args.get("user").unwrap_or(&Value::Null);
        let name = user["name"].as_str().unwrap_or_default();
        let email = user["email"].as_str().unwrap_or_default();

        if !email.contains('@') {
            bail!("invalid email address: {}", email);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tags = args.get("tags").cloned().unwrap_or_else(|| json!([]));

        let mut meta = Metadata::new();
        meta.insert("user_id".to_string(), json!(id));

        let output = ToolOutput::structured(json!({
            "id": id,
            "name": name,
            "email": email.to_lowercase(),
            "tags": tags,
        }))
        .with_metadata(meta)?;

        Ok(output)
    }
}

use std::collections::BTreeMap;

use serde_json::Value;

use super::types::{ToolEntry, ToolError, ToolHandler, ToolResult, ToolSchema};

/// Tools available to one agent run, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, handler: ToolHandler, mut schema: ToolSchema) -> Result<(), ToolError> {
        if name.is_empty() {
            return Err(ToolError::InvalidName);
        }
        if schema.name.is_empty() {
            schema.name = name.to_string();
        }
        if schema.name != name {
            return Err(ToolError::SchemaMismatch(schema.name));
        }
        if self.tools.contains_key(name) {
            return Err(ToolError::Duplicate(name.to_string()));
        }
        self.tools.insert(
            name.to_string(),
            ToolEntry {
                name: name.to_string(),
                handler,
                schema,
            },
        );
        Ok(())
    }

    pub fn execute(&self, name: &str, args: Value) -> ToolResult {
        let entry = match self.tools.get(name) {
            Some(entry) => entry,
            None => return ToolResult::failed(format!("tool not found: {}", name)),
        };

        match (entry.handler)(args) {
            Ok(output) => ToolResult::ok(output),
            Err(err) => ToolResult::failed(err),
        }
    }

    pub fn get_schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|entry| entry.schema.clone()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

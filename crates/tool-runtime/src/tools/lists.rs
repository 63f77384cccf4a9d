//! List registry tools: create, read, replace, delete and enumerate item lists.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use fanout_core::ListStore;

use crate::tool::{required_str, required_strings, Tool, ToolDefinition, ToolError, ToolResult};

fn list_id_schema() -> Value {
    json!({
        "type": "string",
        "description": "Id returned by create_list"
    })
}

fn items_schema() -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": "Ordered work items (file paths, URLs, identifiers)"
    })
}

fn not_found(list_id: &str) -> ToolError {
    ToolError::NotFound(format!("no list with id '{list_id}'"))
}

/// Register a new list of items.
pub struct CreateListTool {
    store: Arc<ListStore>,
}

impl CreateListTool {
    pub fn new(store: Arc<ListStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateListTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_list".to_string(),
            description: "Store a list of items and return its id for use with run_shell and run_agent."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "items": items_schema() },
                "required": ["items"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let items = required_strings(&input, "items")?;
        let list = self.store.create(items);
        Ok(ToolResult::text(format!(
            "Created list {} with {} items",
            list.id,
            list.items.len()
        )))
    }
}

/// Show the items of a list, one per line.
pub struct GetListTool {
    store: Arc<ListStore>,
}

impl GetListTool {
    pub fn new(store: Arc<ListStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetListTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_list".to_string(),
            description: "Show the items of a stored list, one per line.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "list_id": list_id_schema() },
                "required": ["list_id"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let list_id = required_str(&input, "list_id")?;
        let items = self.store.lookup(list_id).ok_or_else(|| not_found(list_id))?;
        debug!(list_id, items = items.len(), "list read");
        Ok(ToolResult::text(items.join("\n")))
    }
}

/// Replace the items of an existing list.
pub struct UpdateListTool {
    store: Arc<ListStore>,
}

impl UpdateListTool {
    pub fn new(store: Arc<ListStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateListTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "update_list".to_string(),
            description: "Replace the items of a stored list.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": list_id_schema(),
                    "items": items_schema()
                },
                "required": ["list_id", "items"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let list_id = required_str(&input, "list_id")?;
        let items = required_strings(&input, "items")?;
        let list = self
            .store
            .update(list_id, items)
            .ok_or_else(|| not_found(list_id))?;
        Ok(ToolResult::text(format!(
            "Updated list {} ({} items)",
            list.id,
            list.items.len()
        )))
    }
}

/// Remove a list from the registry.
pub struct DeleteListTool {
    store: Arc<ListStore>,
}

impl DeleteListTool {
    pub fn new(store: Arc<ListStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteListTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "delete_list".to_string(),
            description: "Delete a stored list.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "list_id": list_id_schema() },
                "required": ["list_id"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let list_id = required_str(&input, "list_id")?;
        if !self.store.delete(list_id) {
            return Err(not_found(list_id));
        }
        Ok(ToolResult::text(format!("Deleted list {list_id}")))
    }
}

/// Enumerate stored lists with their item counts.
pub struct ListListsTool {
    store: Arc<ListStore>,
}

impl ListListsTool {
    pub fn new(store: Arc<ListStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListListsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_lists".to_string(),
            description: "Show all stored lists with their item counts.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn execute(&self, _input: Value) -> Result<ToolResult, ToolError> {
        let infos = self.store.list();
        if infos.is_empty() {
            return Ok(ToolResult::text("No lists"));
        }
        let lines: Vec<String> = infos
            .iter()
            .map(|info| format!("{} ({} items)", info.id, info.item_count))
            .collect();
        Ok(ToolResult::text(lines.join("\n")))
    }
}

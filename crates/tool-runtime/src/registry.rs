//! Name-ordered registry of the tools the server exposes.

use std::collections::BTreeMap;
use std::sync::Arc;

use fanout_core::ListStore;
use fanout_engine::Engine;
use tracing::info;

use crate::tool::{Tool, ToolDefinition};
use crate::tools::{
    CreateListTool, DeleteListTool, GetListTool, ListListsTool, RunAgentTool, RunShellTool, UpdateListTool,
};

/// Tools keyed by name. `tools/list` reports them in name order.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Every built-in tool, sharing one list store and engine.
    ///
    /// `run_agent` is left out when no agent is enabled, so clients never
    /// see a tool they cannot call.
    pub fn builtin(store: Arc<ListStore>, engine: Arc<Engine>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(CreateListTool::new(store.clone()))?;
        registry.register(GetListTool::new(store.clone()))?;
        registry.register(UpdateListTool::new(store.clone()))?;
        registry.register(DeleteListTool::new(store.clone()))?;
        registry.register(ListListsTool::new(store.clone()))?;
        registry.register(RunShellTool::new(store.clone(), engine.clone()))?;
        if engine.enabled_agents().is_empty() {
            info!("no agents enabled; run_agent not registered");
        } else {
            registry.register(RunAgentTool::new(store, engine))?;
        }
        info!(tools = ?registry.names(), "tool registry ready");
        Ok(registry)
    }

    /// Register a tool under its definition's name.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let def = tool.definition();
        if self.tools.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        self.tools.insert(def.name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions of every tool, sorted by name.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),
}

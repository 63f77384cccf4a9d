//! Fan-out tools: run a shell command or a coding agent once per list item.
//!
//! Both resolve the list id against the [`ListStore`] before the engine is
//! touched, so an unknown id creates no run and writes nothing to disk.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use fanout_core::{AgentKind, ListStore};
use fanout_engine::{Engine, EngineError};

use crate::tool::{required_str, Tool, ToolDefinition, ToolError, ToolResult};

fn resolve(store: &ListStore, list_id: &str) -> Result<Vec<String>, ToolError> {
    store
        .lookup(list_id)
        .ok_or_else(|| ToolError::NotFound(format!("no list with id '{list_id}'")))
}

fn engine_error(e: EngineError) -> ToolError {
    match e {
        EngineError::AgentDisabled(_) => ToolError::InvalidInput(e.to_string()),
        other => ToolError::ExecutionFailed(other.to_string()),
    }
}

/// Run a shell command template once per item of a list.
pub struct RunShellTool {
    store: Arc<ListStore>,
    engine: Arc<Engine>,
}

impl RunShellTool {
    pub fn new(store: Arc<ListStore>, engine: Arc<Engine>) -> Self {
        Self { store, engine }
    }
}

#[async_trait]
impl Tool for RunShellTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "run_shell".to_string(),
            description: format!(
                "Run a shell command once per item of a list, {} at a time. \
                 $item in the command is replaced by the shell-quoted item. \
                 Output goes to per-item files listed in the result.",
                self.engine.config().concurrency
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": {
                        "type": "string",
                        "description": "Id returned by create_list"
                    },
                    "command": {
                        "type": "string",
                        "description": "Command template, e.g. 'wc -l $item'"
                    }
                },
                "required": ["list_id", "command"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let list_id = required_str(&input, "list_id")?;
        let command = required_str(&input, "command")?;
        let items = resolve(&self.store, list_id)?;

        info!(list_id, command, items = items.len(), "run_shell");
        let summary = self
            .engine
            .run_shell(&items, command)
            .await
            .map_err(|e| {
                warn!(list_id, error = %e, "run_shell failed");
                engine_error(e)
            })?;
        Ok(ToolResult::text(summary.render()))
    }
}

/// Run a coding agent once per item of a list.
pub struct RunAgentTool {
    store: Arc<ListStore>,
    engine: Arc<Engine>,
}

impl RunAgentTool {
    pub fn new(store: Arc<ListStore>, engine: Arc<Engine>) -> Self {
        Self { store, engine }
    }
}

#[async_trait]
impl Tool for RunAgentTool {
    fn definition(&self) -> ToolDefinition {
        let agents: Vec<&str> = self.engine.enabled_agents().iter().map(|a| a.name()).collect();
        ToolDefinition {
            name: "run_agent".to_string(),
            description: format!(
                "Run a coding agent non-interactively once per item of a list, {} at a time. \
                 $item in the prompt is replaced by the item verbatim. \
                 Output goes to per-item files listed in the result.",
                self.engine.config().concurrency
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": {
                        "type": "string",
                        "description": "Id returned by create_list"
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Prompt template, e.g. 'Summarize $item'"
                    },
                    "agent": {
                        "type": "string",
                        "enum": agents,
                        "description": "Agent CLI to run"
                    }
                },
                "required": ["list_id", "prompt", "agent"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let list_id = required_str(&input, "list_id")?;
        let prompt = required_str(&input, "prompt")?;
        let agent: AgentKind = required_str(&input, "agent")?
            .parse()
            .map_err(|e: fanout_core::ConfigError| ToolError::InvalidInput(e.to_string()))?;
        let items = resolve(&self.store, list_id)?;

        info!(list_id, %agent, items = items.len(), "run_agent");
        let summary = self
            .engine
            .run_agent(&items, prompt, agent)
            .await
            .map_err(|e| {
                warn!(list_id, %agent, error = %e, "run_agent failed");
                engine_error(e)
            })?;
        Ok(ToolResult::text(summary.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::{AgentConfig, EngineConfig};
    use std::num::NonZeroUsize;
    use std::path::Path;

    fn engine(results: &Path, work: &Path, agents: AgentConfig) -> Arc<Engine> {
        let config = EngineConfig {
            results_dir: results.to_path_buf(),
            concurrency: NonZeroUsize::new(4).unwrap(),
            ..EngineConfig::default()
        };
        Arc::new(Engine::new(config, agents, work.to_path_buf()))
    }

    #[tokio::test]
    async fn test_run_shell_reports_sinks() {
        let work = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        std::fs::write(work.path().join("a.txt"), "1\n2\n").unwrap();
        let store = Arc::new(ListStore::new());
        let list = store.create(vec!["a.txt".into()]);
        let tool = RunShellTool::new(store, engine(results.path(), work.path(), AgentConfig::all_enabled()));

        let result = tool
            .execute(json!({"list_id": list.id, "command": "wc -l $item"}))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("a.txt.stdout.txt"));
        assert!(result.content.contains("\"total_invocations\": 1"));
    }

    #[tokio::test]
    async fn test_unknown_list_creates_no_run() {
        let work = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let tool = RunShellTool::new(
            Arc::new(ListStore::new()),
            engine(results.path(), work.path(), AgentConfig::all_enabled()),
        );

        let err = tool
            .execute(json!({"list_id": "lost-list-000", "command": "echo $item"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(std::fs::read_dir(results.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_shell_requires_command() {
        let work = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let store = Arc::new(ListStore::new());
        let list = store.create(vec!["x".into()]);
        let tool = RunShellTool::new(store, engine(results.path(), work.path(), AgentConfig::all_enabled()));

        let err = tool.execute(json!({"list_id": list.id})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_agent_schema_lists_only_enabled() {
        let work = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let agents = AgentConfig {
            enabled: vec![AgentKind::Claude, AgentKind::Opencode],
            ..AgentConfig::default()
        };
        let tool = RunAgentTool::new(Arc::new(ListStore::new()), engine(results.path(), work.path(), agents));

        let def = tool.definition();
        assert_eq!(def.input_schema["properties"]["agent"]["enum"], json!(["claude", "opencode"]));
    }

    #[tokio::test]
    async fn test_run_agent_rejects_unknown_and_disabled_agents() {
        let work = tempfile::tempdir().unwrap();
        let results = tempfile::tempdir().unwrap();
        let store = Arc::new(ListStore::new());
        let list = store.create(vec!["x".into()]);
        let agents = AgentConfig {
            enabled: vec![AgentKind::Claude],
            ..AgentConfig::default()
        };
        let tool = RunAgentTool::new(store, engine(results.path(), work.path(), agents));

        let unknown = tool
            .execute(json!({"list_id": list.id, "prompt": "p", "agent": "cursor"}))
            .await
            .unwrap_err();
        assert!(matches!(unknown, ToolError::InvalidInput(_)));

        let disabled = tool
            .execute(json!({"list_id": list.id, "prompt": "p", "agent": "gemini"}))
            .await
            .unwrap_err();
        assert!(matches!(disabled, ToolError::InvalidInput(_)));
        assert_eq!(std::fs::read_dir(results.path()).unwrap().count(), 0);
    }
}

use std::path::PathBuf;

use fanout_core::AgentKind;

/// Errors that stop a run before any process starts.
///
/// Per-item failures never show up here; they end up in the item's sinks.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to create run directory {path}: {source}")]
    RunDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent '{0}' is disabled")]
    AgentDisabled(AgentKind),
}

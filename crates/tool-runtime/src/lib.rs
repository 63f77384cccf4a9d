//! Tool layer between the MCP server and the fan-out engine.
//!
//! Every tool implements [`Tool`]; [`ToolRegistry::builtin`] wires the
//! built-in list and run tools to a shared [`fanout_core::ListStore`] and
//! [`fanout_engine::Engine`].

pub mod registry;
pub mod tool;
pub mod tools;

pub use registry::{RegistryError, ToolRegistry};
pub use tool::{Tool, ToolDefinition, ToolError, ToolResult};
pub use tools::{
    CreateListTool, DeleteListTool, GetListTool, ListListsTool, RunAgentTool, RunShellTool, UpdateListTool,
};

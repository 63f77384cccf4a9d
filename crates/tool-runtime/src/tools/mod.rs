//! Built-in tools exposed over MCP.
//!
//! Tools are divided into two categories:
//! - **List tools** (`create_list`, `get_list`, `update_list`, `delete_list`, `list_lists`):
//!   manage the in-memory item registry
//! - **Run tools** (`run_shell`, `run_agent`): fan a command or agent out over a list
//!
//! [`ToolRegistry::builtin`](crate::ToolRegistry::builtin) registers all of them.

pub mod lists;
pub mod run;

pub use lists::{CreateListTool, DeleteListTool, GetListTool, ListListsTool, UpdateListTool};
pub use run::{RunAgentTool, RunShellTool};

//! MCP (Model Context Protocol) front end for the fan-out engine.
//!
//! This crate implements the MCP protocol over JSON-RPC 2.0, exposing the
//! list and run tools to any MCP client over stdio.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: Pluggable transport layer (stdio, channels)
//! - **server**: MCP server wrapping a `ToolRegistry`
//! - **error**: Unified error types
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use fanout_core::{AgentConfig, EngineConfig, ListStore};
//! use fanout_engine::Engine;
//! use fanout_mcp::{McpServer, StdioTransport};
//! use fanout_tool_runtime::ToolRegistry;
//!
//! # async fn example() {
//! let engine = Engine::new(EngineConfig::default(), AgentConfig::all_enabled(), ".".into());
//! let registry = ToolRegistry::builtin(Arc::new(ListStore::new()), Arc::new(engine)).unwrap();
//! let server = McpServer::new(registry);
//! let mut transport = StdioTransport::new();
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```

pub mod error;
pub mod server;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use server::{McpServer, DEFAULT_SERVER_NAME};
pub use transport::{ChannelTransport, McpTransport, StdioTransport};
pub use types::*;

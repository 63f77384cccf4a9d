pub mod agent;
pub mod config;
pub mod error;
pub mod lists;
pub mod names;

pub use agent::AgentKind;
pub use config::{AgentConfig, Config, EngineConfig};
pub use error::*;
pub use lists::{ItemList, ListInfo, ListStore};

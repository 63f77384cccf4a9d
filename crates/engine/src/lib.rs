//! Batched parallel execution of one templated command per work item.
//!
//! # Architecture
//!
//! - **template**: substitutes an item into a shell command or prompt
//! - **sink**: per-item stdout/stderr file locations inside a run directory
//! - **runner**: spawns one process, streams its output, enforces the deadline
//! - **scheduler**: runs invocations in fixed-size groups, one group at a time
//! - **report**: the [`RunSummary`] handed back to the caller
//! - **engine**: ties the above together for `run_shell` / `run_agent`

pub mod engine;
pub mod error;
pub mod invocation;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod sink;
pub mod template;

pub use engine::Engine;
pub use error::EngineError;
pub use invocation::{Invocation, InvocationSpec, RunContext};
pub use report::{ItemSinks, RunSummary};
pub use runner::{Executor, InvocationOutcome, ProcessRunner};
pub use scheduler::{partition, BatchScheduler, ScheduleReport};
pub use sink::{sanitize_basename, SinkAllocator, SinkPair, SinkPaths};
pub use template::{expand, shell_quote, ExpansionMode};
